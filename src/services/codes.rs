//! Verification code generation

use rand::{rngs::OsRng, Rng};

/// Symbols a verification code is drawn from
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Codes are the only bearer token for marking attendance, so every symbol
/// comes from the operating system CSPRNG.
pub fn generate_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
