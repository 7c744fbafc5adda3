use crate::defs::Result;
use crate::error::Error;

/// `from_str_radix` without its tolerance for a leading `+`
fn parse_digits(input: &str, digits: &str, radix: u32) -> Result<u64> {
    if digits.starts_with('+') {
        return Err(Error::Parse(input.to_owned()));
    }
    u64::from_str_radix(digits, radix).map_err(|_| Error::Parse(input.to_owned()))
}

/// Parses a hex address, with or without a leading 0x
pub fn parse_address(s: &str) -> Result<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    parse_digits(s, digits, 16)
}

/// Parses an integer literal, detecting the base the way C does: `0x` is hex,
/// a leading `0` is octal, anything else decimal. A leading `-` wraps.
pub fn parse_value(s: &str) -> Result<u64> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (digits, radix) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        (hex, 16)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };
    let magnitude = parse_digits(s, digits, radix)?;
    Ok(if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    })
}

/// Parses a decimal breakpoint index
pub fn parse_index(s: &str) -> Result<usize> {
    s.parse::<usize>().map_err(|_| Error::Parse(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_always_hex() {
        assert_eq!(parse_address("400080").unwrap(), 0x400080);
        assert_eq!(parse_address("0x400080").unwrap(), 0x400080);
        assert_eq!(parse_address("10").unwrap(), 0x10);
        assert_eq!(parse_address("DeadBeef").unwrap(), 0xdead_beef);
    }

    #[test]
    fn malformed_addresses_fail() {
        for bad in ["", "0x", "xyz", "40 00", "-1", "0x+1"] {
            assert!(
                matches!(parse_address(bad), Err(Error::Parse(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn values_detect_their_base() {
        assert_eq!(parse_value("42").unwrap(), 42);
        assert_eq!(parse_value("0x2a").unwrap(), 0x2a);
        assert_eq!(parse_value("0X2A").unwrap(), 0x2a);
        assert_eq!(parse_value("052").unwrap(), 42);
        assert_eq!(parse_value("0").unwrap(), 0);
        assert_eq!(parse_value("+7").unwrap(), 7);
        assert_eq!(parse_value("-1").unwrap(), u64::MAX);
        assert_eq!(parse_value("0xffffffffffffffff").unwrap(), u64::MAX);
    }

    #[test]
    fn malformed_values_fail() {
        for bad in ["", "-", "0x", "08", "12a", "0xg", "--1", "0x-1", "+-1"] {
            assert!(
                matches!(parse_value(bad), Err(Error::Parse(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn indexes_are_decimal() {
        assert_eq!(parse_index("0").unwrap(), 0);
        assert_eq!(parse_index("99").unwrap(), 99);
        assert!(parse_index("0x1").is_err());
        assert!(parse_index("-1").is_err());
    }
}
