/// 行ストア（スプレッドシート）機能モジュール
///
/// 名前と位置でアドレス指定する行指向ストアを抽象化する：
/// - ワークシート名で対象を選び、行・列は1始まり（1行目はヘッダー）
/// - キー列の値で行を検索し、セル単位または行単位で書き込む
/// - バックエンドは Google スプレッドシートとローカル SQLite ワークブック
pub mod google;
pub mod sqlite;
pub mod workbook;

#[cfg(test)]
pub mod testing;

use crate::features::records::RecordTable;
use crate::shared::errors::AppResult;

pub use google::GoogleSheetsClient;
pub use sqlite::SqliteWorkbook;
pub use workbook::Workbook;

/// 1セル分の書き込み指示（列は1始まり）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub column: usize,
    pub value: String,
}

impl FieldUpdate {
    pub fn new<S: Into<String>>(column: usize, value: S) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// 行ストアのバックエンド
///
/// 実行はリクエスト/レスポンス型で、同一プロセス内の並行ミューテーションは想定しない。
#[allow(async_fn_in_trait)]
pub trait SheetBackend {
    /// ワークシートの存在を確認する（無ければ `MissingWorksheet`）
    async fn ensure_worksheet(&self, sheet: &str) -> AppResult<()>;

    /// ヘッダー行を含む全セル値を取得する
    async fn get_all_values(&self, sheet: &str) -> AppResult<Vec<Vec<String>>>;

    /// 1行を末尾に追加する
    async fn append_row(&self, sheet: &str, row: &[String]) -> AppResult<()>;

    /// 複数行を末尾に一括追加する
    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()>;

    /// 1セルを書き換える
    async fn update_cell(&self, sheet: &str, row: usize, column: usize, value: &str)
        -> AppResult<()>;

    /// 同じ行の複数セルを書き換える
    ///
    /// 既定実装はセルごとの独立した書き込みで、途中で失敗すると行は新旧混在の状態で残る。
    /// 1リクエストで行を書けるバックエンドはこれを上書きする。
    async fn update_cells(&self, sheet: &str, row: usize, updates: &[FieldUpdate]) -> AppResult<()> {
        for update in updates {
            self.update_cell(sheet, row, update.column, &update.value)
                .await?;
        }
        Ok(())
    }

    /// 指定列の値が一致する最初のデータ行の行番号を返す（ヘッダー行は検索対象外）
    async fn find_row(&self, sheet: &str, column: usize, value: &str) -> AppResult<Option<usize>>;

    /// 行を削除する（以降の行は1つ繰り上がる）
    async fn delete_row(&self, sheet: &str, row: usize) -> AppResult<()>;

    /// ヘッダーを含む全行を消去する
    async fn clear(&self, sheet: &str) -> AppResult<()>;

    /// 全行をヘッダー名付きのレコードとして取得する
    async fn get_all_records(&self, sheet: &str) -> AppResult<RecordTable> {
        let values = self.get_all_values(sheet).await?;
        Ok(RecordTable::from_values(values))
    }
}

/// 検索用: データ行（2行目以降）から一致する最初の行番号を返す
pub(crate) fn find_in_values(values: &[Vec<String>], column: usize, value: &str) -> Option<usize> {
    if column == 0 {
        return None;
    }
    values
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| row.get(column - 1).map(String::as_str) == Some(value))
        .map(|(index, _)| index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> Vec<Vec<String>> {
        vec![
            vec!["trip_id".to_string(), "trip_name".to_string()],
            vec!["a1".to_string(), "京都".to_string()],
            vec!["b2".to_string()],
            vec!["a1".to_string(), "重複".to_string()],
        ]
    }

    #[test]
    fn test_find_in_values_returns_first_data_row() {
        assert_eq!(find_in_values(&values(), 1, "a1"), Some(2));
        assert_eq!(find_in_values(&values(), 1, "b2"), Some(3));
        assert_eq!(find_in_values(&values(), 1, "zz"), None);
    }

    #[test]
    fn test_find_in_values_skips_header_and_short_rows() {
        // ヘッダーと同じ値でもヒットしない
        assert_eq!(find_in_values(&values(), 1, "trip_id"), None);
        // 列が欠けた行は不一致扱い
        assert_eq!(find_in_values(&values(), 2, "京都"), Some(2));
        assert_eq!(find_in_values(&values(), 0, "a1"), None);
    }
}
