use crate::error::{ReportError, Result};
use crate::table::Value;
use chrono::{Datelike, NaiveDate};

pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        ReportError::InvalidInput(format!(
            "No calendar date for year {} month {}",
            year, month
        ))
    })
}

/// Number of calendar months since year 0, used to compare first-of-month
/// dates without caring about the day.
pub fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    month_index(end) - month_index(start)
}

/// Formats a count the way the quarterly tables display it: rounded to a
/// whole number with `,` as thousands separator.
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    group_digits(&format!("{}", rounded.abs() as u64), rounded < 0.0)
}

/// Like [`format_thousands`], but integers are printed exactly instead of
/// going through `f64`.
pub fn format_count(value: &Value) -> String {
    match value {
        Value::Int(v) => group_digits(&v.unsigned_abs().to_string(), *v < 0),
        Value::Float(v) => format_thousands(*v),
        Value::Null => String::new(),
        Value::Text(s) => s.clone(),
        Value::Date(d) => d.to_string(),
    }
}

fn group_digits(digits: &str, negative: bool) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Replaces characters that are awkward in file names, e.g.
/// "PROVINCIE WEST-VLAANDEREN" becomes "PROVINCIE_WEST-VLAANDEREN".
pub fn sanitize_file_stem(name: &str) -> String {
    name.replace([' ', '/'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_of_month() {
        assert_eq!(
            first_of_month(2023, 3).unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()
        );
        assert!(first_of_month(2023, 13).is_err());
    }

    #[test]
    fn test_months_between() {
        let jan = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let dec = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        let next_feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        assert_eq!(months_between(jan, dec), 11);
        assert_eq!(months_between(jan, next_feb), 13);
        assert_eq!(months_between(next_feb, jan), -13);
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_thousands(-12345.0), "-12,345");
        assert_eq!(format_thousands(1499.6), "1,500");
        assert_eq!(format_thousands(-0.4), "0");
    }

    #[test]
    fn test_format_count_is_exact_for_integers() {
        assert_eq!(
            format_count(&Value::Int(9_007_199_254_740_993)),
            "9,007,199,254,740,993"
        );
        assert_eq!(format_count(&Value::Int(-1234)), "-1,234");
        assert_eq!(format_count(&Value::Int(i64::MIN)), "-9,223,372,036,854,775,808");
        assert_eq!(format_count(&Value::Float(1234.5)), "1,235");
        assert_eq!(format_count(&Value::Null), "");
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(
            sanitize_file_stem("BRUSSELS HOOFDSTEDELIJK GEWEST"),
            "BRUSSELS_HOOFDSTEDELIJK_GEWEST"
        );
        assert_eq!(sanitize_file_stem("A/B C"), "A_B_C");
    }
}
