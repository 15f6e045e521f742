//! Wall-clock helpers.

use chrono::{DateTime, Local};

/// Current local time, formatted the way file headers and log lines show it.
pub fn get_formatted_time() -> String {
    format_time(&Local::now())
}

pub fn format_time(time: &DateTime<Local>) -> String {
    time.format("%a %b %d %H:%M:%S %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_time() {
        let time = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_time(&time), "Sat Mar 09 07:05:01 2024");
    }
}
