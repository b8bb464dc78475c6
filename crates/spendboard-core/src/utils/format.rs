use chrono::{DateTime, Utc};

/// Format an amount as Indonesian Rupiah: `Rp 1.234.567,50`
pub fn format_idr(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    // Group thousands with '.'
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}Rp {},{:02}", sign, grouped, fraction)
}

/// Format a timestamp for table display: `Mon, Jan 6, 2025`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %b %-d, %Y").to_string()
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_idr() {
        assert_eq!(format_idr(0.0), "Rp 0,00");
        assert_eq!(format_idr(999.0), "Rp 999,00");
        assert_eq!(format_idr(1000.0), "Rp 1.000,00");
        assert_eq!(format_idr(1234567.5), "Rp 1.234.567,50");
        assert_eq!(format_idr(-45000.0), "-Rp 45.000,00");
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap();
        assert_eq!(format_date(&date), "Mon, Jan 6, 2025");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Kopi susu gula aren", 6), "Kop...");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some("Cash"), "-"), "Cash");
        assert_eq!(format_optional(None, "-"), "-");
    }
}
