use alloy::primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Scales a smallest-unit integer down by `decimals`, e.g. wei to ether.
/// Trailing zeros are dropped, so `1500000000000000000` with 18 decimals is `"1.5"`.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;

    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Same as [`format_units`] but as a `Decimal`. Excess fractional digits are rounded and
/// whole amounts beyond `Decimal::MAX` saturate, so a positive balance stays positive.
pub fn to_decimal(raw: U256, decimals: u8) -> Decimal {
    Decimal::from_str(&format_units(raw, decimals))
        .map(|d| d.normalize())
        .unwrap_or(Decimal::MAX)
}

/// Parses a `0x` prefixed hex quantity. An empty quantity (`"0x"`) is zero.
pub fn parse_hex_quantity(hex_str: &str) -> Option<U256> {
    let cleaned = hex_str.strip_prefix("0x").unwrap_or(hex_str);

    if cleaned.is_empty() {
        return Some(U256::ZERO);
    }

    U256::from_str_radix(cleaned, 16).ok()
}
