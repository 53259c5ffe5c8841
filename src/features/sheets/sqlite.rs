use super::{find_in_values, FieldUpdate, SheetBackend};
use crate::features::records::Collection;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{format_timestamp, now_jst};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// ローカル SQLite ファイルに保存するワークブック
///
/// 各行はワークシート内の位置とセル値（JSON配列）で保持し、
/// Google スプレッドシートと同じく位置でアドレス指定する。
pub struct SqliteWorkbook {
    conn: Mutex<Connection>,
}

impl SqliteWorkbook {
    /// ワークブックファイルを開く（存在しなければ作成）
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::debug!("ワークブックを開きました: {:?}", path.as_ref());
        Self::from_connection(conn)
    }

    /// インメモリのワークブックを作成する
    pub fn open_in_memory() -> AppResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS worksheets (
                 name TEXT PRIMARY KEY,
                 created_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS sheet_rows (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 sheet TEXT NOT NULL REFERENCES worksheets(name) ON DELETE CASCADE,
                 position INTEGER NOT NULL,
                 cells TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_sheet_rows_position ON sheet_rows(sheet, position);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// ワークシートを作成し、空ならヘッダー行を書き込む
    pub fn create_worksheet(&self, name: &str, header: &[&str]) -> AppResult<()> {
        let conn = self.lock()?;
        let created = conn.execute(
            "INSERT OR IGNORE INTO worksheets (name, created_at) VALUES (?1, ?2)",
            params![name, format_timestamp(now_jst())],
        )?;
        if created > 0 {
            log::info!("ワークシートを作成しました: {name}");
        }

        let rows: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sheet_rows WHERE sheet = ?1",
            params![name],
            |row| row.get(0),
        )?;
        if rows == 0 && !header.is_empty() {
            let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
            insert_rows(&conn, name, std::slice::from_ref(&header))?;
        }
        Ok(())
    }

    /// trips / expenses ワークシートを用意する
    pub fn initialize_worksheets(&self) -> AppResult<()> {
        for collection in Collection::ALL {
            self.create_worksheet(collection.sheet_name(), collection.header())?;
        }
        Ok(())
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::Database(format!("ワークブックのロック取得に失敗: {e}")))
    }

    fn checked(&self, sheet: &str) -> AppResult<MutexGuard<'_, Connection>> {
        let conn = self.lock()?;
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM worksheets WHERE name = ?1",
                params![sheet],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(AppError::MissingWorksheet(sheet.to_string()));
        }
        Ok(conn)
    }
}

/// 行番号（1始まり）に対応する内部IDとセル値を取得する
fn row_at(conn: &Connection, sheet: &str, row: usize) -> AppResult<(i64, Vec<String>)> {
    if row == 0 {
        return Err(AppError::sheets("行番号は1以上です"));
    }
    let found = conn
        .query_row(
            "SELECT id, cells FROM sheet_rows WHERE sheet = ?1
             ORDER BY position LIMIT 1 OFFSET ?2",
            params![sheet, (row - 1) as i64],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)),
        )
        .optional()?;
    match found {
        Some((id, cells)) => Ok((id, serde_json::from_str(&cells)?)),
        None => Err(AppError::sheets(format!("{sheet} の {row} 行目は範囲外です"))),
    }
}

fn insert_rows(conn: &Connection, sheet: &str, rows: &[Vec<String>]) -> AppResult<()> {
    let mut position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), 0) FROM sheet_rows WHERE sheet = ?1",
        params![sheet],
        |row| row.get(0),
    )?;
    let mut stmt =
        conn.prepare("INSERT INTO sheet_rows (sheet, position, cells) VALUES (?1, ?2, ?3)")?;
    for row in rows {
        position += 1;
        stmt.execute(params![sheet, position, serde_json::to_string(row)?])?;
    }
    Ok(())
}

fn write_cells(conn: &Connection, sheet: &str, row: usize, updates: &[FieldUpdate]) -> AppResult<()> {
    let (id, mut cells) = row_at(conn, sheet, row)?;
    for update in updates {
        if update.column == 0 {
            return Err(AppError::sheets("列番号は1以上です"));
        }
        if cells.len() < update.column {
            cells.resize(update.column, String::new());
        }
        cells[update.column - 1] = update.value.clone();
    }
    conn.execute(
        "UPDATE sheet_rows SET cells = ?1 WHERE id = ?2",
        params![serde_json::to_string(&cells)?, id],
    )?;
    Ok(())
}

impl SheetBackend for SqliteWorkbook {
    async fn ensure_worksheet(&self, sheet: &str) -> AppResult<()> {
        self.checked(sheet).map(|_| ())
    }

    async fn get_all_values(&self, sheet: &str) -> AppResult<Vec<Vec<String>>> {
        let conn = self.checked(sheet)?;
        let mut stmt =
            conn.prepare("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY position")?;
        let raw = stmt
            .query_map(params![sheet], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let values = raw
            .iter()
            .map(|cells| serde_json::from_str(cells))
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Ok(values)
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> AppResult<()> {
        let conn = self.checked(sheet)?;
        insert_rows(&conn, sheet, &[row.to_vec()])
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()> {
        let mut conn = self.checked(sheet)?;
        let tx = conn.transaction()?;
        insert_rows(&tx, sheet, rows)?;
        tx.commit()?;
        Ok(())
    }

    async fn update_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> AppResult<()> {
        let conn = self.checked(sheet)?;
        write_cells(&conn, sheet, row, &[FieldUpdate::new(column, value)])
    }

    /// 1トランザクションで行内の全セルを書き換える
    async fn update_cells(&self, sheet: &str, row: usize, updates: &[FieldUpdate]) -> AppResult<()> {
        let mut conn = self.checked(sheet)?;
        let tx = conn.transaction()?;
        write_cells(&tx, sheet, row, updates)?;
        tx.commit()?;
        Ok(())
    }

    async fn find_row(&self, sheet: &str, column: usize, value: &str) -> AppResult<Option<usize>> {
        let values = self.get_all_values(sheet).await?;
        Ok(find_in_values(&values, column, value))
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> AppResult<()> {
        let conn = self.checked(sheet)?;
        let (id, _) = row_at(&conn, sheet, row)?;
        conn.execute("DELETE FROM sheet_rows WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn clear(&self, sheet: &str) -> AppResult<()> {
        let conn = self.checked(sheet)?;
        let removed = conn.execute("DELETE FROM sheet_rows WHERE sheet = ?1", params![sheet])?;
        log::debug!("{sheet} を消去しました: {removed}行");
        Ok(())
    }
}
