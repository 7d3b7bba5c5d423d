//! Credit rating cell text: `"{grade}\n({start}~{end})"` with `yy.MM.dd` dates

use chrono::{Days, Months, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{BizsheetError, Result};

const DATE_FORMAT: &str = "%y.%m.%d";

fn expiry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"~(\d{2,4}\.\d{2}\.\d{2})").unwrap())
}

/// Validity ends the day before the start date one year later
pub fn default_end(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_months(Months::new(12))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .unwrap_or(start)
}

/// Compose the rating cell text
pub fn compose(grade: &str, start: NaiveDate, end: NaiveDate) -> Result<String> {
    let grade = grade.trim();
    if grade.is_empty() {
        return Err(BizsheetError::Config("rating grade is empty".to_string()));
    }
    if end < start {
        return Err(BizsheetError::Config(format!(
            "rating period ends before it starts ({} > {})",
            start, end
        )));
    }
    Ok(format!(
        "{}\n({}~{})",
        grade,
        start.format(DATE_FORMAT),
        end.format(DATE_FORMAT)
    ))
}

/// Expiry date of a rating text, from its first `~YY.MM.DD` token.
///
/// Four-digit years match the token but do not parse and yield `None`.
pub fn parse_expiry(text: &str) -> Option<NaiveDate> {
    let token = expiry_pattern().captures(text)?.get(1)?.as_str();
    if token.split('.').next().map(str::len) != Some(2) {
        return None;
    }
    NaiveDate::parse_from_str(token, DATE_FORMAT).ok()
}

/// Accept `2024-03-01`, `2024.03.01` or `24.03.01`
pub fn parse_date_input(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    // `%Y` also takes two digits, so pick the formats by the year's width
    let formats: &[&str] = match input.chars().take_while(char::is_ascii_digit).count() {
        4 => &["%Y-%m-%d", "%Y.%m.%d"],
        2 => &[DATE_FORMAT],
        _ => &[],
    };
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_end() {
        assert_eq!(default_end(date(2024, 3, 1)), date(2025, 2, 28));
        assert_eq!(default_end(date(2023, 1, 1)), date(2023, 12, 31));
        assert_eq!(default_end(date(2024, 2, 29)), date(2025, 2, 27));
    }

    #[test]
    fn test_compose() {
        let text = compose(" A+ ", date(2024, 3, 1), date(2025, 2, 28)).unwrap();
        assert_eq!(text, "A+\n(24.03.01~25.02.28)");
        assert!(compose("", date(2024, 3, 1), date(2025, 2, 28)).is_err());
        assert!(compose("A", date(2024, 3, 1), date(2024, 2, 1)).is_err());
    }

    #[test]
    fn test_parse_expiry() {
        assert_eq!(parse_expiry("A~23.06.30"), Some(date(2023, 6, 30)));
        assert_eq!(
            parse_expiry("BB+\n(24.03.01~25.02.28)"),
            Some(date(2025, 2, 28))
        );
        assert_eq!(parse_expiry("A~2023.06.30"), None);
        assert_eq!(parse_expiry("A~23.13.40"), None);
        assert_eq!(parse_expiry("no date"), None);
    }

    #[test]
    fn test_parse_date_input() {
        assert_eq!(parse_date_input("2024-03-01"), Some(date(2024, 3, 1)));
        assert_eq!(parse_date_input("2024.03.01"), Some(date(2024, 3, 1)));
        assert_eq!(parse_date_input(" 24.03.01 "), Some(date(2024, 3, 1)));
        assert_eq!(
            parse_date_input("24.03.01").map(default_end),
            Some(date(2025, 2, 28))
        );
        assert_eq!(parse_date_input("124.03.01"), None);
        assert_eq!(parse_date_input("24-03-01"), None);
        assert_eq!(parse_date_input("March"), None);
    }
}
