//! Phone numbers arrive written in many ways: with or without the country
//! code, with a trunk `0`, with a `+` or `00` international prefix, and with
//! spaces or dashes in between. These helpers turn a raw input into the set of
//! equivalent written forms used for lookups, and into the single normalized
//! form used as a delivery destination.

use itertools::Itertools;

pub const DEFAULT_COUNTRY_CODE: &str = "971";

const MIN_NATIONAL_LEN: usize = 7;
const MAX_E164_LEN: usize = 15;

#[derive(Debug, PartialEq)]
enum ParsedPhone {
    /// Number in the default country, without country code or trunk prefix
    National(String),
    /// Number with an explicit foreign country code, digits only
    Foreign(String),
}

fn parse(raw: &str, country_code: &str) -> Option<ParsedPhone> {
    let trimmed = raw.trim();
    let mut digits = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>();
    if digits.is_empty() {
        return None;
    }

    let mut international = trimmed.starts_with('+');
    if !international && digits.starts_with("00") {
        digits = digits[2..].to_string();
        international = true;
    }

    let has_country_code = digits.starts_with(country_code)
        && digits.len() >= country_code.len() + MIN_NATIONAL_LEN;

    let parsed = if has_country_code {
        ParsedPhone::National(digits[country_code.len()..].to_string())
    } else if international {
        ParsedPhone::Foreign(digits)
    } else {
        ParsedPhone::National(digits.trim_start_matches('0').to_string())
    };

    match &parsed {
        ParsedPhone::National(n) if n.is_empty() => None,
        _ => Some(parsed),
    }
}

/// All written forms equivalent to `raw`: the input itself, its digits, the
/// bare national number, the local form with a leading zero and the
/// international forms with and without `+`.
pub fn phone_candidates(raw: &str, country_code: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let mut candidates = vec![trimmed.to_string()];

    match parse(raw, country_code) {
        Some(ParsedPhone::National(national)) => {
            candidates.push(national.clone());
            candidates.push(format!("0{}", national));
            candidates.push(format!("{}{}", country_code, national));
            candidates.push(format!("+{}{}", country_code, national));
            candidates.push(format!("00{}{}", country_code, national));
        }
        Some(ParsedPhone::Foreign(digits)) => {
            candidates.push(digits.clone());
            candidates.push(format!("+{}", digits));
            candidates.push(format!("00{}", digits));
        }
        None => (),
    }

    candidates
        .into_iter()
        .filter(|c| !c.is_empty())
        .unique()
        .collect()
}

/// Normalized `+<country code><number>` destination for `raw`, or `None` when
/// the input can not be a reachable phone number.
pub fn normalize_recipient(raw: &str, country_code: &str) -> Option<String> {
    let normalized = match parse(raw, country_code)? {
        ParsedPhone::National(national) => format!("{}{}", country_code, national),
        ParsedPhone::Foreign(digits) => digits,
    };
    let len = normalized.len();
    if len < country_code.len() + MIN_NATIONAL_LEN || len > MAX_E164_LEN {
        return None;
    }
    Some(format!("+{}", normalized))
}
