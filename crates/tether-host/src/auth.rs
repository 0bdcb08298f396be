//! Emoji-challenge pairing.
//!
//! First-time peers prove physical proximity by answering a visual
//! challenge: the host shows one emoji on its own display and sends the
//! peer a shuffled list of [`CHALLENGE_OPTIONS`] candidates containing it.
//! Only someone who can see the host screen can pick the right one.

use tether_proto::DeviceProfile;

/// Number of candidate emoji sent to the peer per challenge.
pub const CHALLENGE_OPTIONS: usize = 16;

/// Pool the challenge draws from. Must stay well above
/// [`CHALLENGE_OPTIONS`] so repeated challenges rarely share a full
/// option set.
const EMOJI_ALPHABET: [&str; 48] = [
    "🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯", "🦁", "🐮",
    "🐷", "🐸", "🐵", "🐔", "🐧", "🐦", "🦆", "🦉", "🐴", "🦄", "🐝", "🐢",
    "🍎", "🍊", "🍋", "🍉", "🍇", "🍓", "🍒", "🍑", "🥝", "🍍", "🥕", "🌽",
    "⚽", "🏀", "🎲", "🎸", "🎹", "🎺", "🚗", "🚲", "✈️", "🚀", "⛵", "🌈",
];

/// A challenge issued to a not-yet-authenticated peer.
///
/// Lives in the driver's pending map until the peer answers, the TTL
/// expires, or the peer disconnects. Generic over the instant type so
/// expiry works under virtual time.
#[derive(Debug, Clone)]
pub struct PendingAuthSession<I> {
    /// The emoji shown on the host display; the one correct answer.
    pub answer: String,
    /// When the challenge was issued, for TTL expiry.
    pub issued_at: I,
    /// Profile from the greeting that triggered the challenge. Applied to
    /// the registry only after a correct answer.
    pub candidate_profile: Option<DeviceProfile>,
}

impl<I> PendingAuthSession<I> {
    /// Whether `answer` matches the expected emoji exactly.
    pub fn matches(&self, answer: &str) -> bool {
        self.answer == answer
    }
}

/// Draw a fresh challenge: [`CHALLENGE_OPTIONS`] distinct emoji in random
/// order, plus the correct answer drawn from among them.
///
/// Uses a partial Fisher-Yates shuffle over the alphabet so options are
/// distinct by construction, then picks the answer uniformly from the
/// drawn options.
pub fn draw_challenge(mut pick: impl FnMut(usize) -> usize) -> (Vec<String>, String) {
    let mut pool: Vec<&str> = EMOJI_ALPHABET.to_vec();
    let mut options = Vec::with_capacity(CHALLENGE_OPTIONS);
    for drawn in 0..CHALLENGE_OPTIONS {
        let index = drawn + pick(pool.len() - drawn);
        pool.swap(drawn, index);
        options.push(pool[drawn].to_string());
    }
    let answer = options[pick(CHALLENGE_OPTIONS)].clone();
    (options, answer)
}
