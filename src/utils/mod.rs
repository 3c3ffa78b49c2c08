//! Small helpers shared by the rest of the crate
use rand::{distributions::Alphanumeric, Rng};

pub mod serde_utf8_bytes;
pub mod serde_vec_utf8_bytes;

/// Random alphanumeric string of the given length. Handy to generate keys and node ids
pub fn generate_random_ascii_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
