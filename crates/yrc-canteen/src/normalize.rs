//! Turns scraped, locale-formatted amounts into canonical display strings.
//!
//! The portal renders values like `฿1,234.50` or `1,234.50 บาท`. Currency
//! glyphs and words, grouping commas, and whitespace are stripped, then the
//! leading number is read and anything after it ignored. A value with no
//! leading number is handed back untouched so a mis-scraped label stays
//! visible to the user instead of turning into a silent zero.

/// Characters removed before numeric parsing.
const STRIP_CHARS: &[char] = &['฿', '$', '€', '£', '¥', ',', '\u{a0}', '\u{202f}'];

/// Currency words removed before numeric parsing.
const STRIP_WORDS: &[&str] = &["บาท", "THB"];

/// Parse a raw scraped amount. `None` when it does not start with a number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| !STRIP_CHARS.contains(c) && !c.is_whitespace())
        .collect();
    for word in STRIP_WORDS {
        cleaned = cleaned.replace(word, "");
    }
    let number = numeric_prefix(&cleaned)?;
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Longest leading `[+-]digits[.digits][e[+-]digits]`, with at least one digit.
fn numeric_prefix(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    Some(&s[..end])
}

/// Canonical two-decimal string, or `raw` unchanged when unparsable.
///
/// `"฿1,234.5"` becomes `"1234.50"`; `"N/A"` stays `"N/A"`.
pub fn normalize(raw: &str) -> String {
    match parse_amount(raw) {
        Some(value) => format!("{value:.2}"),
        None => raw.to_string(),
    }
}

/// The value a caller should display for a scraped field.
///
/// Only a strictly positive amount replaces the raw text. A zero (or
/// negative, or unparsable) amount propagates the raw string, so a true zero
/// balance and a failed scrape that defaulted to `"0"` look the same. That
/// ambiguity is a known limitation and is kept on purpose.
pub fn display_value(raw: &str) -> String {
    match parse_amount(raw) {
        Some(value) if value > 0.0 => format!("{value:.2}"),
        _ => raw.to_string(),
    }
}
