use super::{FieldUpdate, GoogleSheetsClient, SheetBackend, SqliteWorkbook};
use crate::shared::errors::AppResult;

/// 起動時の設定で選ばれた行ストア
pub enum Workbook {
    Google(GoogleSheetsClient),
    Sqlite(SqliteWorkbook),
}

impl Workbook {
    /// バックエンド名（ログ表示用）
    pub fn kind_name(&self) -> &'static str {
        match self {
            Workbook::Google(_) => "google",
            Workbook::Sqlite(_) => "sqlite",
        }
    }
}

impl SheetBackend for Workbook {
    async fn ensure_worksheet(&self, sheet: &str) -> AppResult<()> {
        match self {
            Workbook::Google(b) => b.ensure_worksheet(sheet).await,
            Workbook::Sqlite(b) => b.ensure_worksheet(sheet).await,
        }
    }

    async fn get_all_values(&self, sheet: &str) -> AppResult<Vec<Vec<String>>> {
        match self {
            Workbook::Google(b) => b.get_all_values(sheet).await,
            Workbook::Sqlite(b) => b.get_all_values(sheet).await,
        }
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> AppResult<()> {
        match self {
            Workbook::Google(b) => b.append_row(sheet, row).await,
            Workbook::Sqlite(b) => b.append_row(sheet, row).await,
        }
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()> {
        match self {
            Workbook::Google(b) => b.append_rows(sheet, rows).await,
            Workbook::Sqlite(b) => b.append_rows(sheet, rows).await,
        }
    }

    async fn update_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> AppResult<()> {
        match self {
            Workbook::Google(b) => b.update_cell(sheet, row, column, value).await,
            Workbook::Sqlite(b) => b.update_cell(sheet, row, column, value).await,
        }
    }

    async fn update_cells(&self, sheet: &str, row: usize, updates: &[FieldUpdate]) -> AppResult<()> {
        match self {
            Workbook::Google(b) => b.update_cells(sheet, row, updates).await,
            Workbook::Sqlite(b) => b.update_cells(sheet, row, updates).await,
        }
    }

    async fn find_row(&self, sheet: &str, column: usize, value: &str) -> AppResult<Option<usize>> {
        match self {
            Workbook::Google(b) => b.find_row(sheet, column, value).await,
            Workbook::Sqlite(b) => b.find_row(sheet, column, value).await,
        }
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> AppResult<()> {
        match self {
            Workbook::Google(b) => b.delete_row(sheet, row).await,
            Workbook::Sqlite(b) => b.delete_row(sheet, row).await,
        }
    }

    async fn clear(&self, sheet: &str) -> AppResult<()> {
        match self {
            Workbook::Google(b) => b.clear(sheet).await,
            Workbook::Sqlite(b) => b.clear(sheet).await,
        }
    }
}
