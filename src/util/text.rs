use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;

const NUMBER_ESCAPE_CHAR: &[char] = &['元', '%', ',', ' ', '"', '\n'];

/// Converts a Big5 (ms950) encoded byte slice to a UTF-8 `String`.
///
/// Unmappable sequences are reported as an error instead of being silently
/// replaced, so a page served in an unexpected encoding is noticed.
pub fn big5_2_utf8(data: &[u8]) -> Result<String> {
    let (text, _, had_errors) = encoding_rs::BIG5.decode(data);

    if had_errors {
        return Err(anyhow!("Failed to BIG5.decode because of malformed sequences"));
    }

    Ok(text.into_owned())
}

/// Parses a decimal value from a given string.
///
/// Commas used as thousands separators and the other characters in
/// `NUMBER_ESCAPE_CHAR` are stripped before parsing. Scientific notation
/// such as `1e-7` is accepted as well.
///
/// # Example
///
/// ```
/// let s = "1,234.56";
/// let decimal_value = parse_decimal(s, None).unwrap();
/// ```
pub fn parse_decimal(s: &str, escape_chars: Option<Vec<char>>) -> Result<Decimal> {
    let cleaned = clean_escape_chars(s, escape_chars);
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|why| anyhow!("Failed to parse '{}' as Decimal because {:?}", cleaned, why))
}

/// Removes a set of escape characters from a given string.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}
