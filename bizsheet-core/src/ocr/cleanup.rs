//! Clean-up of recognized text

use regex::Regex;
use std::sync::OnceLock;

fn biz_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{3}-?\d{2}-?\d{5})").unwrap())
}

/// Extract a `XXX-XX-XXXXX` business number, repairing common OCR confusions
/// (`O` for `0`, `I` for `1`, dash variants). Empty when nothing matches.
pub fn clean_biz_number(text: &str) -> String {
    let text = text
        .replace(' ', "")
        .replace(['—', '–'], "-")
        .to_uppercase()
        .replace('O', "0")
        .replace('I', "1");
    biz_number_pattern()
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Digits only; `"0"` when none are left
pub fn clean_number(text: &str) -> String {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        "0".to_string()
    } else {
        digits
    }
}

/// Digits and the decimal point only
pub fn clean_ratio(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}
