//! Hex quantity encoding shared by the preparation core
//!
//! All cross-boundary numeric values are `0x`-prefixed hexadecimal strings
//! representing non-negative integers of up to 256 bits, with no padding
//! beyond the minimal representation (`0x0` for zero).

use crate::error::{PrepError, PrepResult};

use ethers::types::{Address, Bytes, U256, U512};

/// Parse a `0x`-prefixed hex quantity into a 256-bit integer.
///
/// Rejects missing prefixes, empty digit strings, non-hex characters and
/// values wider than 256 bits. Never coerces a malformed input to zero.
pub fn parse_quantity(field: &'static str, input: &str) -> PrepResult<U256> {
    let digits = strip_prefix(field, input)?;
    if digits.is_empty() {
        return Err(parse_error(field, input));
    }
    U256::from_str_radix(digits, 16).map_err(|_| parse_error(field, input))
}

/// Parse an optional hex quantity, treating an absent value as zero.
///
/// This is the one place a missing field is defaulted; every other absent
/// numeric field is the caller's error.
pub fn parse_optional_quantity(field: &'static str, input: Option<&str>) -> PrepResult<U256> {
    match input {
        Some(value) => parse_quantity(field, value),
        None => Ok(U256::zero()),
    }
}

/// Encode a 256-bit integer as a minimal `0x`-prefixed hex quantity.
pub fn format_quantity(value: U256) -> String {
    format!("{:#x}", value)
}

/// Parse a 20-byte hex address.
pub fn parse_address(field: &'static str, input: &str) -> PrepResult<Address> {
    let digits = strip_prefix(field, input)?;
    if digits.len() != 40 {
        return Err(parse_error(field, input));
    }
    input
        .parse::<Address>()
        .map_err(|_| parse_error(field, input))
}

/// Parse a `0x`-prefixed byte payload. `"0x"` is the valid empty payload.
pub fn parse_data(field: &'static str, input: &str) -> PrepResult<Bytes> {
    let digits = strip_prefix(field, input)?;
    let bytes = hex::decode(digits).map_err(|_| parse_error(field, input))?;
    Ok(Bytes::from(bytes))
}

/// Narrow a widened intermediate back to 256 bits, failing loudly instead
/// of wrapping.
pub fn narrow(value: U512, what: &'static str) -> PrepResult<U256> {
    if (value >> 256) != U512::zero() {
        return Err(PrepError::Overflow(what));
    }
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf);
    Ok(U256::from_big_endian(&buf[32..]))
}

fn strip_prefix<'a>(field: &'static str, input: &'a str) -> PrepResult<&'a str> {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| parse_error(field, input))
}

fn parse_error(field: &'static str, value: &str) -> PrepError {
    PrepError::Parse {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_and_padded_quantities() {
        assert_eq!(parse_quantity("gas", "0x1").unwrap(), U256::from(1u64));
        assert_eq!(
            parse_quantity("gas", "0x016e360").unwrap(),
            U256::from(1_500_000u64)
        );
        assert_eq!(parse_quantity("gas", "0X2A").unwrap(), U256::from(42u64));
    }

    #[test]
    fn rejects_malformed_quantities() {
        for bad in ["", "0x", "1f", "0xzz", "-0x1", "0x 1"] {
            assert!(parse_quantity("gas", bad).is_err(), "accepted {:?}", bad);
        }
        // 257 bits
        let wide = format!("0x1{}", "0".repeat(64));
        assert!(parse_quantity("gas", &wide).is_err());
    }

    #[test]
    fn absent_value_defaults_to_zero() {
        assert_eq!(parse_optional_quantity("value", None).unwrap(), U256::zero());
        assert!(parse_optional_quantity("value", Some("0x")).is_err());
    }

    #[test]
    fn formats_without_padding() {
        assert_eq!(format_quantity(U256::zero()), "0x0");
        assert_eq!(format_quantity(U256::from(1_500_000u64)), "0x16e360");
    }

    #[test]
    fn round_trips_modulo_leading_zeroes() {
        let parsed = parse_quantity("gas", "0x0f4240").unwrap();
        assert_eq!(format_quantity(parsed), "0xf4240");
        let parsed = parse_quantity("gas", "0x16e360").unwrap();
        assert_eq!(format_quantity(parsed), "0x16e360");
    }

    #[test]
    fn parses_addresses_strictly() {
        let addr = "0x70ad465e0bab6504002ad58c744ed89c7da38524";
        assert!(parse_address("to", addr).is_ok());
        assert!(parse_address("to", "0x70ad465e").is_err());
        assert!(parse_address("to", "70ad465e0bab6504002ad58c744ed89c7da38524").is_err());
    }

    #[test]
    fn parses_empty_and_odd_payloads() {
        assert_eq!(parse_data("data", "0x").unwrap().len(), 0);
        assert_eq!(parse_data("data", "0xdeadbeef").unwrap().len(), 4);
        assert!(parse_data("data", "0xabc").is_err());
    }

    #[test]
    fn narrow_rejects_wide_values() {
        let wide = U512::from(1u64) << 256;
        assert!(narrow(wide, "test").is_err());
        assert_eq!(
            narrow(U512::from(7u64), "test").unwrap(),
            U256::from(7u64)
        );
    }
}
