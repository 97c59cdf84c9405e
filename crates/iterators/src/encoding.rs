//! Value encodings for 64-bit integers.
//!
//! These are part of the client contract and must stay bit-exact:
//! - `STRING`: decimal ASCII text with an optional leading `-`
//! - `FIXEDLEN`: 8-byte big-endian two's complement
//! - `VARLEN`: variable-length long, one byte for -112..=127, otherwise a
//!   prefix byte carrying sign and length followed by big-endian magnitude bytes
//!
//! Radix helpers for the statistics combiner live here as well.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LongEncoding {
    #[default]
    VarLen,
    FixedLen,
    String,
}

impl LongEncoding {
    pub fn encode(&self, value: i64) -> Vec<u8> {
        match self {
            LongEncoding::String => value.to_string().into_bytes(),
            LongEncoding::FixedLen => value.to_be_bytes().to_vec(),
            LongEncoding::VarLen => encode_varlen(value),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<i64, String> {
        match self {
            LongEncoding::String => {
                let text = std::str::from_utf8(bytes).map_err(|_| "not UTF-8 text".to_string())?;
                if text.starts_with('+') {
                    return Err(format!("'{}' is not a decimal integer (leading '+')", text));
                }
                text.parse::<i64>()
                    .map_err(|e| format!("'{}' is not a decimal integer ({})", text, e))
            }
            LongEncoding::FixedLen => {
                let array: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| format!("expected 8 bytes, got {}", bytes.len()))?;
                Ok(i64::from_be_bytes(array))
            }
            LongEncoding::VarLen => decode_varlen(bytes),
        }
    }
}

impl fmt::Display for LongEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LongEncoding::VarLen => write!(f, "VARLEN"),
            LongEncoding::FixedLen => write!(f, "FIXEDLEN"),
            LongEncoding::String => write!(f, "STRING"),
        }
    }
}

impl FromStr for LongEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VARLEN" => Ok(LongEncoding::VarLen),
            "FIXEDLEN" => Ok(LongEncoding::FixedLen),
            "STRING" => Ok(LongEncoding::String),
            _ => Err(format!("unknown encoding '{}' (expected VARLEN, FIXEDLEN or STRING)", s)),
        }
    }
}

// ── VARLEN ──────────────────────────────────────────────────────────

fn encode_varlen(value: i64) -> Vec<u8> {
    if (-112..=127).contains(&value) {
        return vec![value as i8 as u8];
    }

    let mut magnitude = value;
    let mut prefix: i32 = -112;
    if magnitude < 0 {
        magnitude = !magnitude;
        prefix = -120;
    }

    let mut tmp = magnitude;
    while tmp != 0 {
        tmp >>= 8;
        prefix -= 1;
    }

    let len = (if prefix < -120 { -(prefix + 120) } else { -(prefix + 112) }) as usize;
    let mut out = Vec::with_capacity(len + 1);
    out.push(prefix as i8 as u8);
    for idx in (0..len).rev() {
        out.push((magnitude >> (idx * 8)) as u8);
    }
    out
}

fn decode_varlen(bytes: &[u8]) -> Result<i64, String> {
    let first = *bytes.first().ok_or_else(|| "empty value".to_string())? as i8;
    let size = if first >= -112 {
        1
    } else if first < -120 {
        (-119 - first as i32) as usize
    } else {
        (-111 - first as i32) as usize
    };

    if bytes.len() != size {
        return Err(format!("expected {} bytes, got {}", size, bytes.len()));
    }
    if size == 1 {
        return Ok(first as i64);
    }

    let magnitude = bytes[1..]
        .iter()
        .fold(0i64, |acc, b| (acc << 8) | *b as i64);
    let negative = first < -120 || (-112..0).contains(&first);
    Ok(if negative { !magnitude } else { magnitude })
}

// ── Radix text ──────────────────────────────────────────────────────

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const MIN_RADIX: u32 = 2;
pub const MAX_RADIX: u32 = 36;

/// Format `value` in `radix` with lowercase digits and a leading `-` for negatives.
pub fn format_radix(value: i64, radix: u32) -> String {
    debug_assert!((MIN_RADIX..=MAX_RADIX).contains(&radix));
    if value == 0 {
        return "0".to_string();
    }

    let radix = radix as u64;
    let mut n = value.unsigned_abs();
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(DIGITS[(n % radix) as usize]);
        n /= radix;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Parse digits of `radix` with an optional leading `-`. A `+` sign is rejected.
pub fn parse_radix(text: &str, radix: u32) -> Result<i64, String> {
    if text.starts_with('+') {
        return Err(format!("'{}' is not a base-{} integer (leading '+')", text, radix));
    }
    i64::from_str_radix(text, radix)
        .map_err(|e| format!("'{}' is not a base-{} integer ({})", text, radix, e))
}
