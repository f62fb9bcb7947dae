//! Fixed-width big-endian codec and strict hex parsing.
//!
//! All packing in the engine (gas words, paymaster blobs, timestamps, nonces) goes through these
//! helpers, so every width violation surfaces as the same `Overflow` error instead of a silent
//! truncation.

use alloy_primitives::U256;

use crate::errors::{malformed, overflow, EncodingError, Result};

/// Lowercase `0x`-prefixed hex rendering.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn strip_prefix<'a>(s: &'a str, field: &str) -> Result<&'a str> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| malformed(format!("{field}: missing 0x prefix")))
}

fn check_digits(digits: &str, field: &str) -> Result<()> {
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(malformed(format!("{field}: non-hex character {c:?}")));
    }
    Ok(())
}

/// Parse `0x`-prefixed, even-length hex data.
pub fn parse_hex_bytes(s: &str, field: &str) -> Result<Vec<u8>> {
    let digits = strip_prefix(s, field)?;
    check_digits(digits, field)?;
    if digits.len() % 2 != 0 {
        return Err(malformed(format!("{field}: odd-length hex")));
    }
    hex::decode(digits).map_err(|e| malformed(format!("{field}: {e}")))
}

/// Parse hex data that must be exactly `N` bytes long (addresses, hashes).
pub fn parse_fixed_hex<const N: usize>(s: &str, field: &str) -> Result<[u8; N]> {
    let bytes = parse_hex_bytes(s, field)?;
    if bytes.len() > N {
        return Err(overflow(field, N));
    }
    if bytes.len() < N {
        return Err(malformed(format!(
            "{field}: expected {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parse a 20-byte address. Mixed case is accepted; the bytes are case-free.
pub fn parse_address(s: &str, field: &str) -> Result<[u8; 20]> {
    parse_fixed_hex::<20>(s.trim(), field)
}

/// Lowercase canonical rendering of an address string.
pub fn normalize_address(s: &str, field: &str) -> Result<String> {
    parse_address(s, field).map(|a| to_hex(&a))
}

/// Parse a hex quantity (`0x30d40`, odd nibble counts allowed) into an `N`-byte big-endian word.
///
/// Leading zeros do not count against the width; significant digits beyond `N` bytes do.
pub fn quantity_to_be<const N: usize>(s: &str, field: &str) -> Result<[u8; N]> {
    let digits = strip_prefix(s.trim(), field)?;
    if digits.is_empty() {
        return Err(malformed(format!("{field}: empty quantity")));
    }
    check_digits(digits, field)?;
    let significant = digits.trim_start_matches('0');
    if significant.len() > N * 2 {
        return Err(overflow(field, N));
    }
    let padded = if significant.len() % 2 == 1 {
        format!("0{significant}")
    } else {
        significant.to_string()
    };
    let raw = hex::decode(padded).map_err(|e| malformed(format!("{field}: {e}")))?;
    left_pad::<N>(&raw, field)
}

/// Right-align `bytes` in an `N`-byte buffer.
pub fn left_pad<const N: usize>(bytes: &[u8], field: &str) -> Result<[u8; N]> {
    if bytes.len() > N {
        return Err(overflow(field, N));
    }
    let mut out = [0u8; N];
    out[N - bytes.len()..].copy_from_slice(bytes);
    Ok(out)
}

/// Big-endian encoding of `value` in exactly `width` bytes (e.g. 6 for uint48 timestamps).
pub fn u64_to_be_width(value: u64, width: usize, field: &str) -> Result<Vec<u8>> {
    if width == 0 || width > 8 {
        return Err(overflow(field, width));
    }
    if width < 8 && value >> (width * 8) != 0 {
        return Err(overflow(field, width));
    }
    Ok(value.to_be_bytes()[8 - width..].to_vec())
}

/// Parse an unsigned integer given in decimal or as a `0x` quantity.
pub fn parse_uint(s: &str, field: &str) -> Result<U256> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        return Ok(U256::from_be_bytes(quantity_to_be::<32>(s, field)?));
    }
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(format!("{field}: not a decimal integer")));
    }
    U256::from_str_radix(s, 10).map_err(|_| overflow(field, 32))
}

/// Read one 32-byte ABI word at `*i`, advancing the cursor.
pub fn read_word(bytes: &[u8], i: &mut usize) -> Result<[u8; 32]> {
    if bytes.len() < *i + 32 {
        return Err(EncodingError::Truncated.into());
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&bytes[*i..*i + 32]);
    *i += 32;
    Ok(buf)
}
