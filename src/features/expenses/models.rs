use crate::features::records::{expense_col, Collection, Record, SheetRecord};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{
    checked_amount, format_date, format_flag, parse_amount, parse_date, parse_flag, MAX_AMOUNT,
    TIMESTAMP_FORMAT,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 支出カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Food,
    Lodging,
    Transport,
    Entertainment,
    Misc,
}

impl ExpenseCategory {
    /// 集計・表示の並び順
    pub const ALL: [ExpenseCategory; 5] = [
        ExpenseCategory::Food,
        ExpenseCategory::Lodging,
        ExpenseCategory::Transport,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Misc,
    ];

    /// シートに保存するラベル
    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::Food => "食事",
            ExpenseCategory::Lodging => "宿泊",
            ExpenseCategory::Transport => "交通",
            ExpenseCategory::Entertainment => "娯楽/体験",
            ExpenseCategory::Misc => "雑費",
        }
    }

    fn english(self) -> &'static str {
        match self {
            ExpenseCategory::Food => "food",
            ExpenseCategory::Lodging => "lodging",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Entertainment => "entertainment",
            ExpenseCategory::Misc => "misc",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExpenseCategory {
    type Err = AppError;

    /// 日本語ラベル・英語名・旧ラベル（雑費/その他）を受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "雑費/その他" {
            return Ok(ExpenseCategory::Misc);
        }
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.label() == s || c.english().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::validation(format!("不明なカテゴリです: {s}")))
    }
}

/// 満足度（0〜10、0は未評価）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Satisfaction(u8);

impl Satisfaction {
    pub const MAX: u8 = 10;
    pub const PENDING: Satisfaction = Satisfaction(0);

    pub fn new(value: u8) -> AppResult<Self> {
        if value > Self::MAX {
            return Err(AppError::validation(format!(
                "満足度は0〜{}で入力してください: {value}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// 未評価（事後評価待ち）
    pub fn is_pending(self) -> bool {
        self.0 == 0
    }

    /// 低満足度（1〜3）
    pub fn is_low(self) -> bool {
        (1..=3).contains(&self.0)
    }
}

/// 支出データモデル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub entry_id: String,
    pub trip_id: String,
    /// 記録時刻（保存された文字列のまま保持する）
    pub timestamp: String,
    pub category: ExpenseCategory,
    pub item_name: String,
    pub amount: u64,
    pub satisfaction: Satisfaction,
    pub detail: String,
    /// 支払日。旧データで空の場合は記録時刻の日付で補う
    pub expense_date: Option<NaiveDate>,
    pub is_waste: bool,
}

impl Expense {
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.timestamp.trim(), TIMESTAMP_FORMAT).ok()
    }
}

impl SheetRecord for Expense {
    const COLLECTION: Collection = Collection::Expenses;

    fn to_row(&self) -> Vec<String> {
        vec![
            self.entry_id.clone(),
            self.trip_id.clone(),
            self.timestamp.clone(),
            self.category.label().to_string(),
            self.item_name.clone(),
            self.amount.to_string(),
            self.satisfaction.value().to_string(),
            self.detail.clone(),
            self.expense_date.map(format_date).unwrap_or_default(),
            format_flag(self.is_waste).to_string(),
        ]
    }

    fn from_record(record: &Record) -> AppResult<Self> {
        let entry_id = record.get_or_default("entry_id").trim().to_string();
        if entry_id.is_empty() {
            return Err(AppError::validation("entry_id が空です"));
        }

        let raw_category = record.get_or_default("category");
        let category = raw_category.parse().unwrap_or_else(|_| {
            log::warn!("支出 {entry_id} のカテゴリが不明です（{raw_category}）。雑費として扱います");
            ExpenseCategory::Misc
        });

        let raw_amount = record.get_or_default("amount");
        let amount = parse_amount(raw_amount).unwrap_or_else(|| {
            log::warn!("支出 {entry_id} の金額が不正です（{raw_amount}）。0 として扱います");
            0
        });

        let raw_satisfaction = record.get_or_default("satisfaction");
        let satisfaction = parse_amount(raw_satisfaction)
            .and_then(|v| u8::try_from(v).ok())
            .and_then(|v| Satisfaction::new(v).ok())
            .unwrap_or_else(|| {
                log::warn!("支出 {entry_id} の満足度が不正です（{raw_satisfaction}）。未評価として扱います");
                Satisfaction::PENDING
            });

        let timestamp = record.get_or_default("timestamp").to_string();
        let expense_date =
            parse_date(record.get_or_default("expense_date")).or_else(|| parse_date(&timestamp));

        Ok(Self {
            trip_id: record.get_or_default("trip_id").trim().to_string(),
            timestamp,
            category,
            item_name: record.get_or_default("item_name").to_string(),
            amount,
            satisfaction,
            detail: record.get_or_default("detail").to_string(),
            expense_date,
            is_waste: parse_flag(record.get_or_default("is_waste")),
            entry_id,
        })
    }
}

/// 支出作成用DTO
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExpenseDto {
    pub trip_id: String,
    pub category: ExpenseCategory,
    pub item_name: String,
    pub amount: i64,
    pub satisfaction: u8,
    pub detail: String,
    /// 省略時は今日（JST）
    pub expense_date: Option<NaiveDate>,
    pub is_waste: bool,
}

/// 支出更新用DTO（category から is_waste までを上書きする）
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateExpenseDto {
    pub category: ExpenseCategory,
    pub item_name: String,
    pub amount: i64,
    pub satisfaction: u8,
    pub detail: String,
    pub expense_date: NaiveDate,
    pub is_waste: bool,
}

impl UpdateExpenseDto {
    pub(crate) fn cells(&self, amount: u64, satisfaction: Satisfaction) -> Vec<(usize, String)> {
        vec![
            (expense_col::CATEGORY, self.category.label().to_string()),
            (expense_col::ITEM_NAME, self.item_name.clone()),
            (expense_col::AMOUNT, amount.to_string()),
            (expense_col::SATISFACTION, satisfaction.value().to_string()),
            (expense_col::DETAIL, self.detail.clone()),
            (expense_col::EXPENSE_DATE, format_date(self.expense_date)),
            (expense_col::IS_WASTE, format_flag(self.is_waste).to_string()),
        ]
    }
}

/// 品目・金額・満足度を検証する
pub fn validate_expense_fields(
    item_name: &str,
    amount: i64,
    satisfaction: u8,
) -> AppResult<(u64, Satisfaction)> {
    if item_name.trim().is_empty() {
        return Err(AppError::validation("品目を入力してください"));
    }
    let amount = checked_amount(amount).ok_or_else(|| {
        AppError::validation(format!("金額は0以上{MAX_AMOUNT}以下で入力してください: {amount}"))
    })?;
    Ok((amount, Satisfaction::new(satisfaction)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::records::{RecordTable, EXPENSE_COLUMNS};

    fn record_with(header: &[&str], cells: &[&str]) -> Record {
        let table = RecordTable::from_values(vec![
            header.iter().map(|c| c.to_string()).collect(),
            cells.iter().map(|c| c.to_string()).collect(),
        ]);
        table.records()[0].clone()
    }

    #[test]
    fn test_category_labels() {
        assert_eq!("食事".parse::<ExpenseCategory>().unwrap(), ExpenseCategory::Food);
        assert_eq!("food".parse::<ExpenseCategory>().unwrap(), ExpenseCategory::Food);
        assert_eq!(
            "雑費/その他".parse::<ExpenseCategory>().unwrap(),
            ExpenseCategory::Misc
        );
        assert_eq!(ExpenseCategory::Entertainment.to_string(), "娯楽/体験");
        assert!("お土産".parse::<ExpenseCategory>().is_err());
    }

    #[test]
    fn test_satisfaction_bounds() {
        assert!(Satisfaction::new(10).is_ok());
        assert!(Satisfaction::new(11).is_err());
        assert!(Satisfaction::PENDING.is_pending());
        assert!(Satisfaction::new(3).unwrap().is_low());
        assert!(!Satisfaction::new(0).unwrap().is_low());
        assert!(!Satisfaction::new(4).unwrap().is_low());
    }

    #[test]
    fn test_expense_row_layout() {
        let expense = Expense {
            entry_id: "e1".to_string(),
            trip_id: "t1".to_string(),
            timestamp: "2024-12-01 12:00:00".to_string(),
            category: ExpenseCategory::Food,
            item_name: "ラーメン".to_string(),
            amount: 3000,
            satisfaction: Satisfaction::new(7).unwrap(),
            detail: String::new(),
            expense_date: NaiveDate::from_ymd_opt(2024, 12, 1),
            is_waste: false,
        };
        let row = expense.to_row();
        assert_eq!(row.len(), EXPENSE_COLUMNS.len());
        assert_eq!(row[3], "食事");
        assert_eq!(row[9], "FALSE");

        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        let restored = Expense::from_record(&record_with(&EXPENSE_COLUMNS, &cells)).unwrap();
        assert_eq!(restored, expense);
    }

    #[test]
    fn test_legacy_row_derives_expense_date_from_timestamp() {
        let legacy_header = &EXPENSE_COLUMNS[..8];
        let record = record_with(
            legacy_header,
            &["e1", "t1", "2024-01-05 09:30:00", "雑費/その他", "傘", "1,200", "2.0", ""],
        );
        let expense = Expense::from_record(&record).unwrap();

        assert_eq!(expense.expense_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(expense.category, ExpenseCategory::Misc);
        assert_eq!(expense.amount, 1200);
        assert_eq!(expense.satisfaction.value(), 2);
        assert!(!expense.is_waste);
        assert!(expense.recorded_at().is_some());
    }

    #[test]
    fn test_validate_expense_fields() {
        let (amount, satisfaction) = validate_expense_fields("ラーメン", 3000, 7).unwrap();
        assert_eq!(amount, 3000);
        assert_eq!(satisfaction.value(), 7);

        assert!(validate_expense_fields("", 3000, 7).is_err());
        assert!(validate_expense_fields("ラーメン", -1, 7).is_err());
        assert!(validate_expense_fields("ラーメン", 3000, 11).is_err());
        assert!(validate_expense_fields("ラーメン", MAX_AMOUNT as i64, 7).is_ok());
        assert!(validate_expense_fields("ラーメン", MAX_AMOUNT as i64 + 1, 7).is_err());
        assert!(validate_expense_fields("ラーメン", i64::MAX, 7).is_err());
    }
}
