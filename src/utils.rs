//! Exact unit conversion for explorer amounts
//!
//! Explorer APIs report values in the smallest unit (wei, lamports, raw token
//! units) as decimal digit strings that routinely exceed `u64`. Conversion is
//! done on the digit string itself so no precision is lost.

/// Convert a raw integer amount into a human-readable decimal string.
///
/// `raw` is a sequence of ASCII digits with an optional leading `-`.
/// `decimals` is a `u8` as in ERC-20, which bounds the padding allocated for
/// tiny amounts. Trailing fractional zeros are stripped and zero never
/// renders as `-0`.
///
/// ```
/// use wallet_watch::utils::format_units;
/// assert_eq!(format_units("1500000000000000000", 18), "1.5");
/// assert_eq!(format_units("5", 18), "0.000000000000000005");
/// ```
pub fn format_units(raw: &str, decimals: u8) -> String {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return "0".to_string();
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return "0".to_string();
    }

    if decimals == 0 {
        return with_sign(negative, digits.to_string());
    }

    let decimals = usize::from(decimals);
    let padded = if digits.len() <= decimals {
        format!("{:0>width$}", digits, width = decimals + 1)
    } else {
        digits.to_string()
    };

    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    let mut formatted = int_part.to_string();
    if !frac_part.is_empty() {
        formatted.push('.');
        formatted.push_str(frac_part);
    }

    with_sign(negative, formatted)
}

fn with_sign(negative: bool, value: String) -> String {
    if negative && value != "0" {
        format!("-{}", value)
    } else {
        value
    }
}

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
