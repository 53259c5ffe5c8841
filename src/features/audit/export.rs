use crate::features::expenses::Expense;
use crate::features::records::{SheetRecord, EXPENSE_COLUMNS};
use crate::shared::errors::AppResult;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

/// 先頭に付与するBOM
const UTF8_BOM: &str = "\u{feff}";

/// エクスポートファイル名（travel_audit_YYYYMMDD.csv）
pub fn export_filename(date: NaiveDate) -> String {
    format!("travel_audit_{}.csv", date.format("%Y%m%d"))
}

/// 支出をCSV（BOM付きUTF-8）に変換する
pub fn expenses_to_csv(expenses: &[Expense]) -> String {
    let mut out = String::from(UTF8_BOM);
    push_line(&mut out, EXPENSE_COLUMNS.iter().copied());
    for expense in expenses {
        let row = expense.to_row();
        push_line(&mut out, row.iter().map(String::as_str));
    }
    out
}

/// CSVをファイルに書き出す
///
/// # 戻り値
/// 書き出した行数（ヘッダーを除く）
pub fn write_csv(path: &Path, expenses: &[Expense]) -> AppResult<usize> {
    fs::write(path, expenses_to_csv(expenses))?;
    log::info!("CSVを書き出しました: {path:?} ({}件)", expenses.len());
    Ok(expenses.len())
}

fn push_line<'a, I>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = &'a str>,
{
    let line: Vec<String> = fields.into_iter().map(quote_field).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// 区切り文字・引用符・改行を含むフィールドを引用符で囲む
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::expenses::{ExpenseCategory, Satisfaction};
    use tempfile::TempDir;

    fn expense(detail: &str) -> Expense {
        Expense {
            entry_id: "e1".to_string(),
            trip_id: "t1".to_string(),
            timestamp: "2024-12-01 12:00:00".to_string(),
            category: ExpenseCategory::Food,
            item_name: "ラーメン".to_string(),
            amount: 3000,
            satisfaction: Satisfaction::new(7).unwrap(),
            detail: detail.to_string(),
            expense_date: NaiveDate::from_ymd_opt(2024, 12, 1),
            is_waste: false,
        }
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(export_filename(date), "travel_audit_20241201.csv");
    }

    #[test]
    fn test_csv_has_bom_and_header() {
        let csv = expenses_to_csv(&[expense("")]);
        assert!(csv.starts_with('\u{feff}'));

        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines[0], EXPENSE_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "e1,t1,2024-12-01 12:00:00,食事,ラーメン,3000,7,,2024-12-01,FALSE"
        );
    }

    #[test]
    fn test_quote_field() {
        assert_eq!(quote_field("plain"), "plain");
        assert_eq!(quote_field("a,b"), "\"a,b\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_field("line1\nline2"), "\"line1\nline2\"");
    }

    #[test]
    fn test_write_csv() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("travel_audit_20241201.csv");

        let written = write_csv(&path, &[expense("美味しい, また来たい")]).unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"美味しい, また来たい\""));
    }
}
