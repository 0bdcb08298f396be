//! Simulated environment: virtual clock plus seeded RNG.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use tether_host::Environment;

/// A point on the simulation's virtual timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimInstant(Duration);

impl std::ops::Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Deterministic environment for simulation.
///
/// Time advances only when [`SimEnv::advance`] is called (or a driver
/// sleeps); randomness comes from a seeded ChaCha stream, so a failing
/// test reproduces exactly from its seed.
#[derive(Debug, Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<Duration>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Create an environment seeded with `seed`, starting at time zero.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Duration::ZERO)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the virtual clock forward.
    #[allow(clippy::expect_used)]
    pub fn advance(&self, duration: Duration) {
        let mut clock = self.clock.lock().expect("clock mutex poisoned");
        *clock += duration;
    }

    /// Elapsed virtual time since the simulation started.
    #[allow(clippy::expect_used)]
    pub fn elapsed(&self) -> Duration {
        *self.clock.lock().expect("clock mutex poisoned")
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    #[allow(clippy::expect_used)]
    fn now(&self) -> SimInstant {
        SimInstant(*self.clock.lock().expect("clock mutex poisoned"))
    }

    fn wall_clock_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        // Sleeping in simulation just advances the clock.
        self.advance(duration);
        std::future::ready(())
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().expect("rng mutex poisoned").fill_bytes(buffer);
    }
}
