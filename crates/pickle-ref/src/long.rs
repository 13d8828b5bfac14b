//! Integer encoding for LONG1/LONG4.
//!
//! Python writes integers outside the 32-bit range as little-endian two's
//! complement using the fewest bytes that preserve the sign. Values beyond
//! `i64` arrive here as decimal literals, so the magnitude is converted to
//! base 256 by schoolbook multiplication.

use crate::PickleError;

/// A validated decimal integer literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalInt {
    pub negative: bool,
    /// Digits without sign or leading zeros; `"0"` for zero.
    pub digits: String,
}

impl DecimalInt {
    /// Parse an optionally signed run of ASCII digits.
    pub fn parse(literal: &str) -> Result<Self, PickleError> {
        let invalid = || PickleError::InvalidInteger(literal.to_owned());
        let (negative, body) = match literal.as_bytes().first() {
            Some(b'-') => (true, &literal[1..]),
            Some(b'+') => (false, &literal[1..]),
            _ => (false, literal),
        };
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let trimmed = body.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        Ok(Self {
            negative: negative && digits != "0",
            digits: digits.to_owned(),
        })
    }

    /// Magnitude as little-endian base-256 bytes, without trailing zeros.
    pub fn magnitude_le(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for digit in self.digits.bytes() {
            let mut carry = u32::from(digit - b'0');
            for byte in out.iter_mut() {
                let v = u32::from(*byte) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            while carry > 0 {
                out.push((carry & 0xff) as u8);
                carry >>= 8;
            }
        }
        out
    }

    /// The value as `i64`, if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        let magnitude: i128 = self.digits.parse().ok()?;
        let value = if self.negative { -magnitude } else { magnitude };
        i64::try_from(value).ok()
    }
}

/// Encode an `i64` the way `pickle.encode_long` does.
pub fn encode_i64(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let magnitude = value.unsigned_abs().to_le_bytes();
    let len = magnitude.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    encode_signed(value < 0, &magnitude[..len])
}

/// Encode an arbitrary integer given its sign and little-endian magnitude.
pub fn encode_signed(negative: bool, magnitude: &[u8]) -> Vec<u8> {
    let len = magnitude.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let magnitude = &magnitude[..len];
    if magnitude.is_empty() {
        return Vec::new();
    }

    let top = magnitude[len - 1];
    let bit_length = (len - 1) * 8 + (8 - top.leading_zeros() as usize);
    let nbytes = (bit_length >> 3) + 1;

    let mut out = magnitude.to_vec();
    out.resize(nbytes, 0);
    if negative {
        let mut carry = true;
        for byte in out.iter_mut() {
            let inverted = !*byte;
            let (sum, overflow) = inverted.overflowing_add(u8::from(carry));
            *byte = sum;
            carry = overflow;
        }
        if out.len() > 1 && out[out.len() - 1] == 0xff && out[out.len() - 2] & 0x80 != 0 {
            out.pop();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_matches_python() {
        assert_eq!(encode_i64(0), Vec::<u8>::new());
        assert_eq!(encode_i64(127), vec![0x7f]);
        assert_eq!(encode_i64(128), vec![0x80, 0x00]);
        assert_eq!(encode_i64(255), vec![0xff, 0x00]);
        assert_eq!(encode_i64(-1), vec![0xff]);
        assert_eq!(encode_i64(-128), vec![0x80]);
        assert_eq!(encode_i64(-129), vec![0x7f, 0xff]);
        assert_eq!(encode_i64(9_999_999_999), vec![0xff, 0xe3, 0x0b, 0x54, 0x02]);
        assert_eq!(encode_i64(i64::MIN), vec![0, 0, 0, 0, 0, 0, 0, 0x80]);
    }

    #[test]
    fn decimal_magnitude() {
        let big = DecimalInt::parse("9223372036854775808").unwrap();
        assert_eq!(big.magnitude_le(), vec![0, 0, 0, 0, 0, 0, 0, 0x80]);
        assert_eq!(
            encode_signed(big.negative, &big.magnitude_le()),
            vec![0, 0, 0, 0, 0, 0, 0, 0x80, 0]
        );
        assert_eq!(big.to_i64(), None);

        let small = DecimalInt::parse("-000042").unwrap();
        assert_eq!(small.digits, "42");
        assert_eq!(small.to_i64(), Some(-42));
        assert!(!DecimalInt::parse("-0").unwrap().negative);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "-", "12a", "1.5", " 1"] {
            assert!(DecimalInt::parse(bad).is_err(), "{bad:?}");
        }
    }
}
