use super::schema::Collection;
use crate::shared::errors::AppResult;
use std::collections::HashMap;

/// ヘッダー名で参照できる1行分のレコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// ワークシート上の行番号（ヘッダーが1行目）
    pub row_number: usize,
    values: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// 列が無い・空の場合は空文字
    pub fn get_or_default(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }
}

/// ワークシート全体のスナップショット
///
/// 1行目をヘッダーとして列名を推定する。データ行の長さはヘッダーと一致しなくてもよい
/// （不足セルは空、余分なセルは無視）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordTable {
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut rows = values.into_iter();
        let columns: Vec<String> = match rows.next() {
            Some(header) => header.into_iter().map(|h| h.trim().to_string()).collect(),
            None => return Self::default(),
        };

        let records = rows
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|(index, row)| {
                let values = columns
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| !name.is_empty())
                    .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect();
                Record {
                    row_number: index + 2,
                    values,
                }
            })
            .collect();

        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// 指定列が一致する最初のレコード
    pub fn find(&self, column: &str, value: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.get(column) == Some(value))
    }

    /// レコードを正規の列順の行に並べ直す（欠けている列は空文字）
    pub fn project<'a, I>(records: I, header: &[&str]) -> Vec<Vec<String>>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        records
            .into_iter()
            .map(|record| {
                header
                    .iter()
                    .map(|column| record.get_or_default(column).to_string())
                    .collect()
            })
            .collect()
    }
}

/// ワークシートの1行として保存できる型
pub trait SheetRecord: Sized {
    /// 保存先のコレクション
    const COLLECTION: Collection;

    /// 正規の列順に並べたセル値
    fn to_row(&self) -> Vec<String>;

    /// レコードから復元する（欠けた列・古い列構成は既定値で補う）
    fn from_record(record: &Record) -> AppResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_from_values_infers_columns() {
        let table = RecordTable::from_values(vec![
            row(&["entry_id", "amount", " detail "]),
            row(&["e1", "3000", "ラーメン"]),
            row(&["e2", "500"]),
        ]);

        assert_eq!(table.columns(), &["entry_id", "amount", "detail"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].get("detail"), Some("ラーメン"));
        // 不足セルは空文字
        assert_eq!(table.records()[1].get("detail"), Some(""));
        assert_eq!(table.records()[1].row_number, 3);
    }

    #[test]
    fn test_empty_and_header_only() {
        assert!(RecordTable::from_values(vec![]).is_empty());
        assert!(RecordTable::from_values(vec![]).columns().is_empty());

        let header_only = RecordTable::from_values(vec![row(&["trip_id", "trip_name"])]);
        assert!(header_only.is_empty());
        assert!(header_only.has_column("trip_name"));
    }

    #[test]
    fn test_blank_rows_are_skipped_but_keep_numbering() {
        let table = RecordTable::from_values(vec![
            row(&["trip_id"]),
            row(&[""]),
            row(&["t2"]),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.find("trip_id", "t2").unwrap().row_number, 3);
    }

    #[test]
    fn test_project_fills_missing_columns() {
        // 旧レイアウト（expense_date / is_waste 列なし）
        let table = RecordTable::from_values(vec![
            row(&["entry_id", "trip_id", "amount"]),
            row(&["e1", "t1", "1200"]),
        ]);
        let rows = RecordTable::project(table.records(), &["entry_id", "amount", "is_waste"]);
        assert_eq!(rows, vec![row(&["e1", "1200", ""])]);
    }
}
