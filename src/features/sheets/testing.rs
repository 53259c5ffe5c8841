//! テスト用の行ストア
//!
//! インメモリのワークブックに委譲しつつ、操作ごとの呼び出し回数を数え、
//! 指定した操作に失敗を注入できる。

use super::{SheetBackend, SqliteWorkbook};
use crate::features::records::{Collection, RecordStore};
use crate::shared::config::StoreConfig;
use crate::shared::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// 注入する失敗の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 一時的エラー（リトライ対象）
    Transient,
    /// 致命的エラー（即時中断）
    Fatal,
}

impl FailureKind {
    fn to_error(self, op: &str) -> AppError {
        match self {
            FailureKind::Transient => AppError::transient(format!("{op}: HTTP 503 (注入)")),
            FailureKind::Fatal => AppError::sheets(format!("{op}: HTTP 400 (注入)")),
        }
    }
}

struct FailureRule {
    op: &'static str,
    skip: usize,
    times: usize,
    kind: FailureKind,
}

pub struct ScriptedBackend {
    inner: SqliteWorkbook,
    calls: Mutex<HashMap<&'static str, usize>>,
    rules: Mutex<Vec<FailureRule>>,
}

impl ScriptedBackend {
    /// trips / expenses ワークシートを持つ空のワークブック
    pub fn new() -> Self {
        let inner = SqliteWorkbook::open_in_memory().unwrap();
        inner.initialize_worksheets().unwrap();
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
            rules: Mutex::new(Vec::new()),
        }
    }

    pub fn workbook(&self) -> &SqliteWorkbook {
        &self.inner
    }

    /// 次の `times` 回の `op` を失敗させる
    pub fn fail_next(&self, op: &'static str, times: usize, kind: FailureKind) {
        self.fail_after(op, 0, times, kind);
    }

    /// `skip` 回成功させた後、`times` 回の `op` を失敗させる
    pub fn fail_after(&self, op: &'static str, skip: usize, times: usize, kind: FailureKind) {
        self.rules.lock().unwrap().push(FailureRule {
            op,
            skip,
            times,
            kind,
        });
    }

    /// `op` の呼び出し回数（失敗した呼び出しも含む）
    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn check(&self, op: &'static str) -> AppResult<()> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        let mut rules = self.rules.lock().unwrap();
        if let Some(rule) = rules.iter_mut().find(|r| r.op == op && (r.skip > 0 || r.times > 0)) {
            if rule.skip > 0 {
                rule.skip -= 1;
                return Ok(());
            }
            rule.times -= 1;
            return Err(rule.kind.to_error(op));
        }
        Ok(())
    }
}

impl SheetBackend for ScriptedBackend {
    async fn ensure_worksheet(&self, sheet: &str) -> AppResult<()> {
        self.check("ensure_worksheet")?;
        self.inner.ensure_worksheet(sheet).await
    }

    async fn get_all_values(&self, sheet: &str) -> AppResult<Vec<Vec<String>>> {
        self.check("get_all_values")?;
        self.inner.get_all_values(sheet).await
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> AppResult<()> {
        self.check("append_row")?;
        self.inner.append_row(sheet, row).await
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()> {
        self.check("append_rows")?;
        self.inner.append_rows(sheet, rows).await
    }

    async fn update_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> AppResult<()> {
        self.check("update_cell")?;
        self.inner.update_cell(sheet, row, column, value).await
    }

    // update_cells は既定実装（セルごとの書き込み）を使う

    async fn find_row(&self, sheet: &str, column: usize, value: &str) -> AppResult<Option<usize>> {
        self.check("find_row")?;
        self.inner.find_row(sheet, column, value).await
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> AppResult<()> {
        self.check("delete_row")?;
        self.inner.delete_row(sheet, row).await
    }

    async fn clear(&self, sheet: &str) -> AppResult<()> {
        self.check("clear")?;
        self.inner.clear(sheet).await
    }
}

/// 待機時間なしのテスト用設定
pub fn fast_config() -> StoreConfig {
    StoreConfig {
        cache_ttl: Duration::from_secs(300),
        write_max_attempts: 3,
        write_backoff: Duration::ZERO,
        read_max_attempts: 2,
        read_backoff: Duration::ZERO,
    }
}

/// スクリプト化バックエンドを持つレコードストア
pub fn scripted_store() -> RecordStore<ScriptedBackend> {
    RecordStore::new(ScriptedBackend::new(), &fast_config())
}

/// ワークシートへ行を直接書き込む（キャッシュを経由しない）
pub async fn seed_rows(store: &RecordStore<ScriptedBackend>, collection: Collection, rows: &[Vec<String>]) {
    store
        .backend()
        .workbook()
        .append_rows(collection.sheet_name(), rows)
        .await
        .unwrap();
}

/// 文字列スライスから行を作る
pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}
