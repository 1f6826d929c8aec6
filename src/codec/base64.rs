//! Lenient base64 codec for atlas payloads.
//!
//! Decoding accepts what the generation engine actually produces rather
//! than strict RFC 4648 input:
//! - trailing `=` padding is optional
//! - characters outside the alphabet (whitespace, line breaks) are skipped
//!   without advancing the 4-symbol window
//! - only a symbol count that leaves a single dangling sextet is rejected
//!
//! Encoding is plain padded standard base64.

use ::base64::Engine as _;
use ::base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Base64 decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed base64 input: {len} symbols cannot encode whole bytes")]
    MalformedInput { len: usize },
}

/// Decode base64 text into bytes.
///
/// Returns `MalformedInput` when the unpadded length leaves a remainder of
/// one symbol. An empty string decodes to an empty vector.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    let unpadded = text.trim_end_matches('=');
    let len = unpadded.chars().count();
    if len % 4 == 1 {
        return Err(DecodeError::MalformedInput { len });
    }

    let mut out = Vec::with_capacity(len / 4 * 3 + 2);
    let mut acc: u32 = 0;
    let mut count: u32 = 0;

    for ch in unpadded.chars() {
        let Some(value) = sextet(ch) else {
            continue;
        };

        acc = if count % 4 == 0 { value } else { acc * 64 + value };
        let first_in_window = count % 4 == 0;
        count += 1;

        if !first_in_window {
            // 2nd, 3rd and 4th symbols each complete one byte
            let shift = (8 - 2 * (count % 4)) & 6;
            out.push((acc >> shift) as u8);
        }
    }

    Ok(out)
}

/// Encode bytes as padded standard base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Alphabet index of a symbol. A stray interior `=` counts as 64, as in
/// the engine's reference decoder.
#[inline]
fn sextet(ch: char) -> Option<u32> {
    let value = match ch {
        'A'..='Z' => ch as u32 - 'A' as u32,
        'a'..='z' => ch as u32 - 'a' as u32 + 26,
        '0'..='9' => ch as u32 - '0' as u32 + 52,
        '+' => 62,
        '/' => 63,
        '=' => 64,
        _ => return None,
    };
    Some(value)
}
