//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (time, randomness).
//! Production uses real clocks and OS entropy; the simulation harness
//! substitutes a virtual clock and a seeded RNG so every pairing flow is
//! reproducible.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards within one execution context
/// - `random_bytes()` uses cryptographically secure entropy in production
///   (credentials and challenge answers are drawn from it)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time as Unix seconds.
    ///
    /// Used only for persisted timestamps (known-device last-seen, peer
    /// connect times); protocol timeouts always use [`Environment::now`].
    fn wall_clock_secs(&self) -> u64;

    /// Sleeps for the specified duration.
    ///
    /// The only async method in the trait; driver code may use it between
    /// ticks, protocol logic never does.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Uniform-ish random index in `[0, bound)`.
    ///
    /// Modulo reduction over a full `u64`; the bias is negligible for the
    /// small bounds used here (emoji alphabet, option counts).
    fn random_index(&self, bound: usize) -> usize {
        debug_assert!(bound > 0);
        (self.random_u64() % bound as u64) as usize
    }
}

/// Production environment over the real clock and OS entropy.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a production environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock_secs(&self) -> u64 {
        // Pre-epoch system clocks degrade to 0 rather than panicking.
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        // OS entropy failure is unrecoverable for credential generation;
        // zeroed output would silently issue a guessable PSK.
        #[allow(clippy::expect_used)]
        getrandom::fill(buffer).expect("OS entropy source unavailable");
    }
}
