/// trips ワークシートの列（この順で保存する）
pub const TRIP_COLUMNS: [&str; 7] = [
    "trip_id",
    "trip_name",
    "start_date",
    "end_date",
    "status",
    "total_budget",
    "detail",
];

/// expenses ワークシートの列（この順で保存する）
pub const EXPENSE_COLUMNS: [&str; 10] = [
    "entry_id",
    "trip_id",
    "timestamp",
    "category",
    "item_name",
    "amount",
    "satisfaction",
    "detail",
    "expense_date",
    "is_waste",
];

/// trips の列番号（1始まり）
pub mod trip_col {
    pub const TRIP_ID: usize = 1;
    pub const TRIP_NAME: usize = 2;
    pub const START_DATE: usize = 3;
    pub const END_DATE: usize = 4;
    pub const STATUS: usize = 5;
    pub const TOTAL_BUDGET: usize = 6;
    pub const DETAIL: usize = 7;
}

/// expenses の列番号（1始まり）
pub mod expense_col {
    pub const ENTRY_ID: usize = 1;
    pub const TRIP_ID: usize = 2;
    pub const TIMESTAMP: usize = 3;
    pub const CATEGORY: usize = 4;
    pub const ITEM_NAME: usize = 5;
    pub const AMOUNT: usize = 6;
    pub const SATISFACTION: usize = 7;
    pub const DETAIL: usize = 8;
    pub const EXPENSE_DATE: usize = 9;
    pub const IS_WASTE: usize = 10;
}

/// 名前付きの行コレクション（ワークシート）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Trips,
    Expenses,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Trips, Collection::Expenses];

    /// ワークシート名
    pub fn sheet_name(self) -> &'static str {
        match self {
            Collection::Trips => "trips",
            Collection::Expenses => "expenses",
        }
    }

    /// 正規のヘッダー行
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Collection::Trips => &TRIP_COLUMNS,
            Collection::Expenses => &EXPENSE_COLUMNS,
        }
    }

    /// キー列（どちらも1列目）
    pub fn key_column(self) -> usize {
        1
    }

    pub fn width(self) -> usize {
        self.header().len()
    }

    /// 列名から列番号（1始まり）を引く
    pub fn column_index(self, name: &str) -> Option<usize> {
        self.header()
            .iter()
            .position(|column| *column == name)
            .map(|index| index + 1)
    }

    pub fn column_name(self, column: usize) -> Option<&'static str> {
        column
            .checked_sub(1)
            .and_then(|index| self.header().get(index).copied())
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sheet_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_constants_match_header() {
        assert_eq!(
            Collection::Trips.column_index("total_budget"),
            Some(trip_col::TOTAL_BUDGET)
        );
        assert_eq!(
            Collection::Expenses.column_index("is_waste"),
            Some(expense_col::IS_WASTE)
        );
        assert_eq!(
            Collection::Expenses.column_name(expense_col::EXPENSE_DATE),
            Some("expense_date")
        );
        assert_eq!(Collection::Trips.column_name(0), None);
        assert_eq!(Collection::Trips.column_name(8), None);
    }

    #[test]
    fn test_key_column_is_identifier() {
        for collection in Collection::ALL {
            let key = collection.column_name(collection.key_column()).unwrap();
            assert!(key.ends_with("_id"));
        }
        assert_eq!(Collection::Trips.width(), 7);
        assert_eq!(Collection::Expenses.width(), 10);
    }
}
