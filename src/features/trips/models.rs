use crate::features::records::{trip_col, Collection, Record, SheetRecord};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{checked_amount, format_date, parse_amount, parse_date, MAX_AMOUNT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 旅行のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStatus {
    Planning,
    Active,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub const ALL: [TripStatus; 4] = [
        TripStatus::Planning,
        TripStatus::Active,
        TripStatus::Completed,
        TripStatus::Cancelled,
    ];

    /// シートに保存する表記
    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Planning => "Planning",
            TripStatus::Active => "Active",
            TripStatus::Completed => "Completed",
            TripStatus::Cancelled => "Cancelled",
        }
    }

    /// 支出を記録できる状態か（Planning / Active）
    pub fn is_open(self) -> bool {
        matches!(self, TripStatus::Planning | TripStatus::Active)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TripStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::validation(format!("不明なステータスです: {s}")))
    }
}

/// 旅行データモデル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub trip_name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: TripStatus,
    /// 予算（円）。0は未設定
    pub total_budget: u64,
    pub detail: String,
}

impl SheetRecord for Trip {
    const COLLECTION: Collection = Collection::Trips;

    fn to_row(&self) -> Vec<String> {
        vec![
            self.trip_id.clone(),
            self.trip_name.clone(),
            self.start_date.map(format_date).unwrap_or_default(),
            self.end_date.map(format_date).unwrap_or_default(),
            self.status.as_str().to_string(),
            self.total_budget.to_string(),
            self.detail.clone(),
        ]
    }

    fn from_record(record: &Record) -> AppResult<Self> {
        let trip_id = record.get_or_default("trip_id").trim().to_string();
        if trip_id.is_empty() {
            return Err(AppError::validation("trip_id が空です"));
        }

        let raw_status = record.get_or_default("status");
        let status = raw_status.parse().unwrap_or_else(|_| {
            log::warn!("旅行 {trip_id} のステータスが不明です（{raw_status}）。Planning として扱います");
            TripStatus::Planning
        });

        let raw_budget = record.get_or_default("total_budget");
        let total_budget = parse_amount(raw_budget).unwrap_or_else(|| {
            log::warn!("旅行 {trip_id} の予算が不正です（{raw_budget}）。0 として扱います");
            0
        });

        Ok(Self {
            trip_name: record.get_or_default("trip_name").to_string(),
            start_date: parse_date(record.get_or_default("start_date")),
            end_date: parse_date(record.get_or_default("end_date")),
            status,
            total_budget,
            detail: record.get_or_default("detail").to_string(),
            trip_id,
        })
    }
}

/// 旅行作成用DTO
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTripDto {
    pub trip_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_budget: i64,
    pub detail: String,
}

/// 旅行更新用DTO（旅行ID以外の全項目を上書きする）
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTripDto {
    pub trip_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TripStatus,
    pub total_budget: i64,
    pub detail: String,
}

impl UpdateTripDto {
    /// 更新対象のセル（trip_name から detail まで）
    pub(crate) fn cells(&self, total_budget: u64) -> Vec<(usize, String)> {
        vec![
            (trip_col::TRIP_NAME, self.trip_name.clone()),
            (trip_col::START_DATE, format_date(self.start_date)),
            (trip_col::END_DATE, format_date(self.end_date)),
            (trip_col::STATUS, self.status.as_str().to_string()),
            (trip_col::TOTAL_BUDGET, total_budget.to_string()),
            (trip_col::DETAIL, self.detail.clone()),
        ]
    }
}

/// 旅行名と予算を検証する
pub fn validate_trip_fields(trip_name: &str, total_budget: i64) -> AppResult<u64> {
    if trip_name.trim().is_empty() {
        return Err(AppError::validation("旅行名を入力してください"));
    }
    checked_amount(total_budget).ok_or_else(|| {
        AppError::validation(format!(
            "予算は0以上{MAX_AMOUNT}以下で入力してください: {total_budget}"
        ))
    })
}
