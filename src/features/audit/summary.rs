use crate::features::expenses::{Expense, ExpenseCategory};
use crate::features::trips::Trip;
use serde::Serialize;
use std::cmp::Reverse;

/// 旅行単位の予算消化サマリー
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripSummary {
    pub trip_id: String,
    pub total_spent: u64,
    pub budget: u64,
    /// 予算残（超過時は負）
    pub remaining: i64,
    /// 浪費フラグ付き支出の合計
    pub total_waste: u64,
    /// 予算消化率（%、切り捨て）。予算未設定時は予算1円として計算する
    pub consumption_percent: u64,
    pub over_budget: bool,
    /// 満足度が未評価の支出件数
    pub pending_count: usize,
}

impl TripSummary {
    /// 旅行に属する支出から集計する（他の旅行の支出は無視）
    pub fn compute(trip: &Trip, expenses: &[Expense]) -> Self {
        let own: Vec<&Expense> = expenses
            .iter()
            .filter(|e| e.trip_id == trip.trip_id)
            .collect();

        let total_spent = total_amount(own.iter().copied());
        let total_waste = total_amount(own.iter().copied().filter(|e| e.is_waste));
        let pending_count = own.iter().filter(|e| e.satisfaction.is_pending()).count();

        let ratio_base = trip.total_budget.max(1);
        let consumption_percent = total_spent.saturating_mul(100) / ratio_base;

        Self {
            trip_id: trip.trip_id.clone(),
            total_spent,
            budget: trip.total_budget,
            remaining: to_signed(trip.total_budget).saturating_sub(to_signed(total_spent)),
            total_waste,
            consumption_percent,
            over_budget: total_spent > ratio_base,
            pending_count,
        }
    }
}

/// 金額の合計（上限で飽和する）
pub fn total_amount<'a, I>(expenses: I) -> u64
where
    I: IntoIterator<Item = &'a Expense>,
{
    expenses
        .into_iter()
        .fold(0u64, |total, e| total.saturating_add(e.amount))
}

fn to_signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// カテゴリ別の支出割合
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: ExpenseCategory,
    pub amount: u64,
    pub percent: f64,
}

impl CategoryShare {
    /// グラフ凡例用のラベル（例: "食事 (60.0%)"）
    pub fn label(&self) -> String {
        format!("{} ({:.1}%)", self.category.label(), self.percent)
    }
}

/// カテゴリ別内訳を固定の並び順で返す
///
/// 支出のないカテゴリは含めない。合計が0の場合は空。
pub fn category_breakdown(expenses: &[Expense]) -> Vec<CategoryShare> {
    let total = total_amount(expenses);
    if total == 0 {
        return Vec::new();
    }

    ExpenseCategory::ALL
        .into_iter()
        .filter(|category| expenses.iter().any(|e| e.category == *category))
        .map(|category| {
            let amount = category_total(expenses, category);
            CategoryShare {
                category,
                amount,
                percent: amount as f64 / total as f64 * 100.0,
            }
        })
        .collect()
}

/// カテゴリの支出合計
pub fn category_total(expenses: &[Expense], category: ExpenseCategory) -> u64 {
    total_amount(expenses.iter().filter(|e| e.category == category))
}

/// 監査台帳での行の区分（優先度順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditFlag {
    /// 浪費
    Waste,
    /// 満足度未評価
    Pending,
    /// 低満足度（3以下）
    LowSatisfaction,
    Normal,
}

impl AuditFlag {
    pub fn classify(expense: &Expense) -> Self {
        if expense.is_waste {
            AuditFlag::Waste
        } else if expense.satisfaction.is_pending() {
            AuditFlag::Pending
        } else if expense.satisfaction.is_low() {
            AuditFlag::LowSatisfaction
        } else {
            AuditFlag::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AuditFlag::Waste => "浪費",
            AuditFlag::Pending => "未評価",
            AuditFlag::LowSatisfaction => "低満足",
            AuditFlag::Normal => "",
        }
    }
}

/// 台帳表示順（支払日の新しい順、日付不明は末尾）に並べる
pub fn sort_for_ledger(expenses: &mut [Expense]) {
    expenses.sort_by_key(|e| (e.expense_date.is_none(), Reverse(e.expense_date)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::expenses::Satisfaction;
    use crate::features::trips::TripStatus;
    use chrono::NaiveDate;

    fn trip(budget: u64) -> Trip {
        Trip {
            trip_id: "t1".to_string(),
            trip_name: "Kyoto".to_string(),
            start_date: None,
            end_date: None,
            status: TripStatus::Active,
            total_budget: budget,
            detail: String::new(),
        }
    }

    fn expense(
        id: &str,
        category: ExpenseCategory,
        amount: u64,
        satisfaction: u8,
        is_waste: bool,
        day: Option<u32>,
    ) -> Expense {
        Expense {
            entry_id: id.to_string(),
            trip_id: "t1".to_string(),
            timestamp: String::new(),
            category,
            item_name: id.to_string(),
            amount,
            satisfaction: Satisfaction::new(satisfaction).unwrap(),
            detail: String::new(),
            expense_date: day.and_then(|d| NaiveDate::from_ymd_opt(2024, 12, d)),
            is_waste,
        }
    }

    #[test]
    fn test_summary_totals() {
        let mut other = expense("x", ExpenseCategory::Food, 99999, 5, false, Some(1));
        other.trip_id = "t2".to_string();
        let expenses = vec![
            expense("a", ExpenseCategory::Food, 3000, 7, false, Some(1)),
            expense("b", ExpenseCategory::Lodging, 12000, 0, false, Some(1)),
            expense("c", ExpenseCategory::Misc, 500, 2, true, Some(2)),
            other,
        ];

        let summary = TripSummary::compute(&trip(50000), &expenses);
        assert_eq!(summary.total_spent, 15500);
        assert_eq!(summary.remaining, 34500);
        assert_eq!(summary.total_waste, 500);
        assert_eq!(summary.consumption_percent, 31);
        assert!(!summary.over_budget);
        assert_eq!(summary.pending_count, 1);
    }

    #[test]
    fn test_summary_over_budget_and_missing_budget() {
        let expenses = vec![expense("a", ExpenseCategory::Food, 3000, 7, false, None)];

        let over = TripSummary::compute(&trip(2000), &expenses);
        assert!(over.over_budget);
        assert_eq!(over.remaining, -1000);
        assert_eq!(over.consumption_percent, 150);

        let unset = TripSummary::compute(&trip(0), &expenses);
        assert_eq!(unset.consumption_percent, 300000);
        assert!(unset.over_budget);
    }

    #[test]
    fn test_summary_saturates_on_huge_amounts() {
        let huge = expense("a", ExpenseCategory::Food, i64::MAX as u64, 5, true, None);
        let expenses = vec![huge.clone(), huge.clone(), huge];

        let summary = TripSummary::compute(&trip(1000), &expenses);
        assert_eq!(summary.total_spent, u64::MAX);
        assert_eq!(summary.total_waste, u64::MAX);
        assert_eq!(summary.remaining, 1000 - i64::MAX);
        assert!(summary.over_budget);

        assert_eq!(category_total(&expenses, ExpenseCategory::Food), u64::MAX);
        assert_eq!(category_breakdown(&expenses)[0].percent, 100.0);
    }

    #[test]
    fn test_category_breakdown_fixed_order() {
        let expenses = vec![
            expense("a", ExpenseCategory::Misc, 1000, 5, false, None),
            expense("b", ExpenseCategory::Food, 3000, 5, false, None),
            expense("c", ExpenseCategory::Food, 1000, 5, false, None),
        ];

        let shares = category_breakdown(&expenses);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].category, ExpenseCategory::Food);
        assert_eq!(shares[0].amount, 4000);
        assert_eq!(shares[0].label(), "食事 (80.0%)");
        assert_eq!(shares[1].category, ExpenseCategory::Misc);
        assert_eq!(shares[1].label(), "雑費 (20.0%)");

        assert_eq!(category_total(&expenses, ExpenseCategory::Food), 4000);
        assert_eq!(category_total(&expenses, ExpenseCategory::Transport), 0);
        assert!(category_breakdown(&[]).is_empty());
    }

    #[test]
    fn test_audit_flag_priority() {
        let waste_pending = expense("a", ExpenseCategory::Food, 1, 0, true, None);
        assert_eq!(AuditFlag::classify(&waste_pending), AuditFlag::Waste);
        let pending = expense("b", ExpenseCategory::Food, 1, 0, false, None);
        assert_eq!(AuditFlag::classify(&pending), AuditFlag::Pending);
        let low = expense("c", ExpenseCategory::Food, 1, 3, false, None);
        assert_eq!(AuditFlag::classify(&low), AuditFlag::LowSatisfaction);
        let normal = expense("d", ExpenseCategory::Food, 1, 4, false, None);
        assert_eq!(AuditFlag::classify(&normal), AuditFlag::Normal);
    }

    #[test]
    fn test_ledger_order() {
        let mut expenses = vec![
            expense("old", ExpenseCategory::Food, 1, 5, false, Some(1)),
            expense("unknown", ExpenseCategory::Food, 1, 5, false, None),
            expense("new", ExpenseCategory::Food, 1, 5, false, Some(3)),
        ];
        sort_for_ledger(&mut expenses);
        let order: Vec<&str> = expenses.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(order, vec!["new", "old", "unknown"]);
    }
}
