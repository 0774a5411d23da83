// Mon Feb 02 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("odd number of hex digits ({0})")]
    OddLength(usize),
    #[error("invalid hex digit {0:?}")]
    InvalidDigit(char),
}

/// Lowercase, no separators.
pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Accepts an optional `0x` prefix, spaces and either case.
pub fn from_hex(s: &str) -> Result<Vec<u8>, HexError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let digits: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();

    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0].to_digit(16).ok_or(HexError::InvalidDigit(pair[0]))?;
            let lo = pair[1].to_digit(16).ok_or(HexError::InvalidDigit(pair[1]))?;
            Ok((hi * 16 + lo) as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0xde, 0xad, 0x00, 0x0f]), "dead000f");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(from_hex("DEAD000f").unwrap(), vec![0xde, 0xad, 0x00, 0x0f]);
        assert_eq!(from_hex("0x de ad").unwrap(), vec![0xde, 0xad]);
        assert_eq!(from_hex("").unwrap(), Vec::<u8>::new());
        assert_eq!(from_hex("abc"), Err(HexError::OddLength(3)));
        assert_eq!(from_hex("zz"), Err(HexError::InvalidDigit('z')));
    }
}
