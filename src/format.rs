// Display formatting: VND amounts and dates.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Format an amount in Vietnamese đồng: dot-grouped thousands with the
/// currency sign, e.g. `28.000 ₫`. Amounts are whole đồng in practice;
/// fractional parts are rounded away.
pub fn format_vnd(amount: f64) -> String {
    let negative = amount < 0.0;
    let rounded = amount.abs().round() as u64;

    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{grouped} ₫")
    } else {
        format!("{grouped} ₫")
    }
}

/// Render a stored UTC timestamp in local time, minute precision.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

/// Render a calendar day, e.g. `23/08/2026`.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_with_dots() {
        assert_eq!(format_vnd(0.0), "0 ₫");
        assert_eq!(format_vnd(500.0), "500 ₫");
        assert_eq!(format_vnd(15000.0), "15.000 ₫");
        assert_eq!(format_vnd(28000.0), "28.000 ₫");
        assert_eq!(format_vnd(1234567.0), "1.234.567 ₫");
    }

    #[test]
    fn negative_amounts_keep_the_sign() {
        assert_eq!(format_vnd(-5000.0), "-5.000 ₫");
    }

    #[test]
    fn fractional_shares_round_to_whole_dong() {
        // 28000 / 3
        assert_eq!(format_vnd(9333.333333333334), "9.333 ₫");
    }

    #[test]
    fn day_format_is_dd_mm_yyyy() {
        let day = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        assert_eq!(format_day(day), "23/08/2026");
    }
}
