//! Text and number normalization applied before comparison.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d+(?:[,.]\d{3})*(?:[,.]\d+)?%?").expect("Number token regex pattern is valid and should compile")
});
static WHOLE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(?:[,.]\d+)*$").expect("Whole number regex pattern is valid and should compile"));
static CURRENCY_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(ILS|NIS|USD|EUR|GBP|JPY|INR)\b|ש"ח|ש״ח"#)
        .expect("Currency code regex pattern is valid and should compile")
});

const CURRENCY_SYMBOLS: [(char, &str); 6] = [
    ('₪', "ILS"),
    ('$', "USD"),
    ('€', "EUR"),
    ('£', "GBP"),
    ('¥', "JPY"),
    ('₹', "INR"),
];

const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y"];

/// NFKC, lowercase, whitespace collapsed to single spaces.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// NFKC, lowercase, alphanumeric characters only.
///
/// Drops formatting, punctuation and whitespace so that layout differences
/// between providers do not count as content differences.
#[must_use]
pub fn comparison_key(text: &str) -> String {
    text.nfkc()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Currency code implied by a symbol or code in `text`.
#[must_use]
pub fn detect_currency(text: &str) -> Option<&'static str> {
    for (symbol, code) in CURRENCY_SYMBOLS {
        if text.contains(symbol) {
            return Some(code);
        }
    }
    let found = CURRENCY_CODE.find(text)?;
    let code = match found.as_str().to_ascii_uppercase().as_str() {
        "USD" => "USD",
        "EUR" => "EUR",
        "GBP" => "GBP",
        "JPY" => "JPY",
        "INR" => "INR",
        _ => "ILS",
    };
    Some(code)
}

/// Parses `text` when it holds exactly one number.
///
/// Accepts currency symbols and codes, a trailing `%`, accounting-style
/// parentheses for negatives, and US or European separators. Values outside
/// the `f64` range are rejected.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let without_currency = CURRENCY_CODE.replace_all(text, "");
    let mut cleaned: String = without_currency
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.iter().any(|(s, _)| s == c))
        .collect();

    let mut negative = false;
    if cleaned.starts_with('(') && cleaned.ends_with(')') && cleaned.len() > 2 {
        negative = true;
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned);

    if !WHOLE_NUMBER.is_match(cleaned) {
        return None;
    }
    let value = canonical_number(cleaned)?.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -value } else { value })
}

/// All numbers appearing in `text`, in order.
#[must_use]
pub fn extract_numbers(text: &str) -> Vec<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.iter().any(|(s, _)| s == c))
        .collect();

    NUMBER_TOKEN
        .find_iter(&cleaned)
        .filter_map(|m| {
            let token = m.as_str().trim_end_matches('%');
            canonical_number(token)?.parse::<f64>().ok().filter(|v| v.is_finite())
        })
        .collect()
}

/// Rewrites a separator-laden token into a plain decimal string.
fn canonical_number(token: &str) -> Option<String> {
    let periods = token.matches('.').count();
    let commas = token.matches(',').count();

    let canonical = if periods > 0 && commas > 0 {
        let last_period = token.rfind('.')?;
        let last_comma = token.rfind(',')?;
        if last_comma > last_period {
            token.replace('.', "").replace(',', ".")
        } else {
            token.replace(',', "")
        }
    } else if commas > 0 {
        let after = &token[token.rfind(',')? + 1..];
        if commas == 1 && after.len() <= 2 {
            token.replace(',', ".")
        } else {
            token.replace(',', "")
        }
    } else if periods > 1 {
        let (head, tail) = token.rsplit_once('.')?;
        if tail.len() <= 2 {
            format!("{}.{tail}", head.replace('.', ""))
        } else {
            token.replace('.', "")
        }
    } else {
        token.to_string()
    };

    Some(canonical)
}

/// Parses `DD/MM/YYYY`, `YYYY-MM-DD` or `DD.MM.YYYY`.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
