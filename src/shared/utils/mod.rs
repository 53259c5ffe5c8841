//! 共有ユーティリティ（時刻・シート値の寛容な解析）

use chrono::{NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Asia::Tokyo;

/// 日付の保存形式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 記録タイムスタンプの保存形式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 入力として受け付ける金額・予算の上限（1兆円）
pub const MAX_AMOUNT: u64 = 1_000_000_000_000;

/// 入力金額を検証して符号なしにする（0以上かつ上限以下）
pub fn checked_amount(value: i64) -> Option<u64> {
    u64::try_from(value).ok().filter(|v| *v <= MAX_AMOUNT)
}

/// JSTの現在時刻
pub fn now_jst() -> NaiveDateTime {
    Utc::now().with_timezone(&Tokyo).naive_local()
}

/// JSTの今日の日付
pub fn today_jst() -> NaiveDate {
    now_jst().date()
}

/// 日付を保存形式の文字列にする
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// タイムスタンプを保存形式の文字列にする
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// セル値を日付として解析する（前後の空白と時刻部分は無視）
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().split(' ').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

/// セル値を金額として解析する
///
/// 桁区切りのカンマ・小数表記（"3000.0"）・空セルを許容する。
/// 空セルは0、解析できない値はNone。
pub fn parse_amount(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Some(0);
    }
    if let Ok(value) = cleaned.parse::<u64>() {
        return Some(value);
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value.trunc() as u64),
        _ => None,
    }
}

/// セル値を真偽値として解析する（"TRUE" のみ真）
pub fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("TRUE")
}

/// 真偽値をシートの表記にする
pub fn format_flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}
