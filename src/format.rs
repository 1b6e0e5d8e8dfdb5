use chrono::{DateTime, Utc};

use crate::engine::Facet;

pub const CURRENCY: &str = "৳";
pub const NOT_DISCLOSED: &str = "not disclosed";

/// Formats a monthly amount as `৳45,000`.
pub fn money(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{CURRENCY}{grouped}")
}

pub fn monthly(amount: Option<u64>) -> String {
    amount.map(money).unwrap_or_else(|| NOT_DISCLOSED.to_string())
}

/// "0 year", "1 year", "5 years".
pub fn experience_label(years: &str) -> String {
    match years {
        "0" | "1" => format!("{years} year"),
        _ => format!("{years} years"),
    }
}

/// Display text for a facet option.
pub fn option_label(facet: Facet, value: &str) -> String {
    match facet {
        Facet::Experience => experience_label(value),
        _ => value.to_string(),
    }
}

pub fn date(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Shortens `s` to at most `max` characters, marking the cut with "...".
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_money_groups_thousands() {
        assert_eq!(money(0), "৳0");
        assert_eq!(money(950), "৳950");
        assert_eq!(money(45000), "৳45,000");
        assert_eq!(money(1234567), "৳1,234,567");
    }

    #[test]
    fn test_monthly_handles_undisclosed() {
        assert_eq!(monthly(None), "not disclosed");
        assert_eq!(monthly(Some(60000)), "৳60,000");
    }

    #[test]
    fn test_experience_label_pluralizes() {
        assert_eq!(experience_label("0"), "0 year");
        assert_eq!(experience_label("1"), "1 year");
        assert_eq!(experience_label("2"), "2 years");
        assert_eq!(option_label(Facet::Experience, "15"), "15 years");
        assert_eq!(option_label(Facet::Location, "Dhaka"), "Dhaka");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Software Engineer", 10), "Softwar...");
        assert_eq!(truncate("৳৳৳৳৳৳", 5), "৳৳...");
    }

    #[test]
    fn test_date_formats_day() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).single();
        assert_eq!(date(ts), "2025-02-03");
        assert_eq!(date(None), "-");
    }
}
