//! 时间工具函数 — UTC 日期窗口换算
//!
//! 日期→时间戳转换统一在这里完成，repository 层只接收 `i64` Unix millis。

use chrono::NaiveDate;

use super::{AppError, AppResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 日期 → `[当日 00:00, 次日 00:00)` 的 Unix millis 边界 (UTC)
pub fn day_bounds_millis(date: NaiveDate) -> (i64, i64) {
    let start = date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis();
    let next = date.succ_opt().unwrap_or(date);
    let end = next.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis();
    (start, end)
}

/// 日期开始 (00:00:00 UTC) → Unix millis
pub fn day_start_millis(date: NaiveDate) -> i64 {
    day_bounds_millis(date).0
}

/// 日期结束 (含当天) → 次日 00:00 前 1ms
pub fn day_end_millis(date: NaiveDate) -> i64 {
    day_bounds_millis(date).1 - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_date() {
        let d = parse_date("2025-03-01").unwrap();
        assert_eq!(d.format("%Y-%m-%d").to_string(), "2025-03-01");
    }

    #[test]
    fn parse_invalid_date_is_error() {
        assert!(parse_date("03/01/2025").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }

    #[test]
    fn day_bounds_are_24h_apart() {
        let d = parse_date("2025-03-01").unwrap();
        let (start, end) = day_bounds_millis(d);
        assert_eq!(end - start, 24 * 3600 * 1000);
        assert_eq!(day_end_millis(d), end - 1);
    }
}
