use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};

use crate::config::ByteLength;

/// Generates a random, URL-safe, lower-cased token from `byte_length` bytes of OS entropy.
///
/// The result has exactly [`encoded_len`] characters drawn from `a-z 0-9 - _`.
pub fn generate_token(byte_length: ByteLength) -> String {
    let mut buffer = vec![0u8; byte_length.get()];
    OsRng.fill_bytes(&mut buffer);
    let mut token = URL_SAFE_NO_PAD.encode(buffer);
    token.make_ascii_lowercase();
    token
}

/// Unpadded base64 length for `byte_length` bytes: `ceil(byte_length * 4 / 3)`.
pub fn encoded_len(byte_length: ByteLength) -> usize {
    (byte_length.get() * 4).div_ceil(3)
}

/// Source of candidate tokens consumed by the assigner.
pub trait TokenSource {
    fn next_token(&mut self, byte_length: ByteLength) -> String;
}

/// Default source backed by [`generate_token`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn next_token(&mut self, byte_length: ByteLength) -> String {
        generate_token(byte_length)
    }
}

impl<F> TokenSource for F
where
    F: FnMut(ByteLength) -> String,
{
    fn next_token(&mut self, byte_length: ByteLength) -> String {
        self(byte_length)
    }
}
