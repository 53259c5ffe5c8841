use super::cache::SnapshotCache;
use super::events::{CascadeReport, MutationEvent, MutationKind};
use super::retry::{with_retry, RetryPolicy};
use super::schema::{expense_col, Collection};
use super::table::{Record, RecordTable, SheetRecord};
use crate::features::sheets::{FieldUpdate, SheetBackend};
use crate::shared::config::StoreConfig;
use crate::shared::errors::{AppError, AppResult};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 行ストアの上に載るレコードストア
///
/// 読み込みはコレクション単位のスナップショットキャッシュを通し、
/// 書き込みはリトライ付きで実行した後にキャッシュを無効化する。
/// 書き込みが失敗した場合も部分的に反映されている可能性があるため無効化する。
pub struct RecordStore<B: SheetBackend> {
    backend: B,
    cache: Mutex<SnapshotCache>,
    read_policy: RetryPolicy,
    write_policy: RetryPolicy,
}

impl<B: SheetBackend> RecordStore<B> {
    pub fn new(backend: B, config: &StoreConfig) -> Self {
        Self {
            backend,
            cache: Mutex::new(SnapshotCache::new(config.cache_ttl)),
            read_policy: RetryPolicy::fixed(config.read_max_attempts, config.read_backoff),
            write_policy: RetryPolicy::linear(config.write_max_attempts, config.write_backoff),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn cache(&self) -> MutexGuard<'_, SnapshotCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// コレクションの全レコードを取得する（有効期間内はキャッシュを返す）
    pub async fn fetch(&self, collection: Collection) -> AppResult<Arc<RecordTable>> {
        let cached = self.cache().get(collection);
        if let Some(table) = cached {
            debug!("キャッシュヒット: {collection}");
            return Ok(table);
        }
        self.fetch_fresh(collection).await
    }

    /// キャッシュを使わずに取得し、結果でキャッシュを更新する
    pub async fn fetch_fresh(&self, collection: Collection) -> AppResult<Arc<RecordTable>> {
        let sheet = collection.sheet_name();
        let backend = &self.backend;
        let table = with_retry(&self.read_policy, "get_all_records", move || async move {
            backend.ensure_worksheet(sheet).await?;
            backend.get_all_records(sheet).await
        })
        .await?;
        debug!("{sheet} を読み込みました: {}件", table.len());
        Ok(self.cache().insert(collection, table))
    }

    /// 型付きで全レコードを取得する
    ///
    /// 復元できない行（キーが空など）は警告を出して読み飛ばす。
    pub async fn fetch_all<R: SheetRecord>(&self) -> AppResult<Vec<R>> {
        let table = self.fetch(R::COLLECTION).await?;
        Ok(table
            .records()
            .iter()
            .filter_map(|record| match R::from_record(record) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(
                        "{} の {} 行目を読み飛ばしました: {e}",
                        R::COLLECTION,
                        record.row_number
                    );
                    None
                }
            })
            .collect())
    }

    /// レコードを1行追加する
    pub async fn append<R: SheetRecord>(&self, record: &R) -> AppResult<MutationEvent> {
        let row = record.to_row();
        self.append_row(R::COLLECTION, &row).await
    }

    /// 正規の列順に並んだ行を追加する
    pub async fn append_row(&self, collection: Collection, row: &[String]) -> AppResult<MutationEvent> {
        if row.len() != collection.width() {
            return Err(AppError::validation(format!(
                "{collection} の行は{}列です（{}列を受け取りました）",
                collection.width(),
                row.len()
            )));
        }
        let key = row
            .get(collection.key_column() - 1)
            .map(|k| k.trim())
            .unwrap_or_default();
        if key.is_empty() {
            return Err(AppError::validation("キー列が空です"));
        }

        let sheet = collection.sheet_name();
        let backend = &self.backend;
        let result = with_retry(&self.write_policy, "append_row", move || async move {
            backend.append_row(sheet, row).await
        })
        .await;
        let event = self.finish(MutationEvent::new(MutationKind::Appended, collection, key));
        result?;

        info!("{sheet} に追加しました: key={key}");
        Ok(event)
    }

    /// キー列の値で行を探し、指定セルを書き換える
    ///
    /// キー列自身の書き換えとヘッダー外の列は拒否する。
    pub async fn update_by_key(
        &self,
        collection: Collection,
        key_column: usize,
        key_value: &str,
        updates: &[FieldUpdate],
    ) -> AppResult<MutationEvent> {
        validate_updates(collection, key_column, updates)?;
        let row = self.locate(collection, key_column, key_value).await?;

        let sheet = collection.sheet_name();
        let backend = &self.backend;
        let result = with_retry(&self.write_policy, "update_cells", move || async move {
            backend.update_cells(sheet, row, updates).await
        })
        .await;
        let event = self.finish(MutationEvent::new(MutationKind::Updated, collection, key_value));
        if let Err(e) = result {
            warn!("{sheet} の {row} 行目の更新に失敗しました（一部のセルは書き込み済みの可能性があります）: {e}");
            return Err(e);
        }

        info!("{sheet} を更新しました: key={key_value}, row={row}, cells={}", updates.len());
        Ok(event)
    }

    /// キー列の値で行を探して削除する
    pub async fn delete_by_key(
        &self,
        collection: Collection,
        key_column: usize,
        key_value: &str,
    ) -> AppResult<MutationEvent> {
        check_column(collection, key_column)?;
        let row = self.locate(collection, key_column, key_value).await?;

        let sheet = collection.sheet_name();
        let backend = &self.backend;
        let result = with_retry(&self.write_policy, "delete_row", move || async move {
            backend.delete_row(sheet, row).await
        })
        .await;
        let event = self.finish(MutationEvent::new(MutationKind::Deleted, collection, key_value));
        result?;

        info!("{sheet} から削除しました: key={key_value}, row={row}");
        Ok(event)
    }

    /// 旅行と、その旅行に属する全支出を削除する
    ///
    /// # 処理内容
    /// 1. 旅行の存在確認（無ければ何も変更せず `NotFound`）
    /// 2. 支出を全件読み込み、残す行と消す行に分ける
    /// 3. 支出ワークシートを消去し、ヘッダーと残す行を書き戻す
    /// 4. 旅行行を削除する
    ///
    /// 3 の消去後に書き戻しが失敗すると、残すはずだった行は
    /// `CascadeInterrupted` の `staged_rows` にのみ残る。
    pub async fn cascade_delete_trip(&self, trip_id: &str) -> AppResult<MutationEvent> {
        let trips = Collection::Trips;
        let expenses = Collection::Expenses;
        if trip_id.trim().is_empty() {
            return Err(AppError::validation("旅行IDが空です"));
        }

        self.locate(trips, trips.key_column(), trip_id).await?;
        info!("旅行の完全削除を開始: trip_id={trip_id}");

        let snapshot = self.fetch_fresh(expenses).await?;
        let trip_id_column = expenses
            .column_name(expense_col::TRIP_ID)
            .unwrap_or("trip_id");
        let (removed, kept): (Vec<&Record>, Vec<&Record>) = snapshot
            .records()
            .iter()
            .partition(|record| record.get_or_default(trip_id_column) == trip_id);
        let report = CascadeReport {
            removed_expenses: removed.len(),
            kept_expenses: kept.len(),
        };

        if removed.is_empty() {
            debug!("削除対象の支出はありません: trip_id={trip_id}");
        } else {
            let staged = RecordTable::project(kept, expenses.header());
            self.rewrite_without(trip_id, staged).await?;
        }

        let trip_row = self.locate(trips, trips.key_column(), trip_id).await;
        let result = match trip_row {
            Ok(row) => {
                let sheet = trips.sheet_name();
                let backend = &self.backend;
                with_retry(&self.write_policy, "delete_row", move || async move {
                    backend.delete_row(sheet, row).await
                })
                .await
            }
            Err(e) => Err(e),
        };
        let mut event = self.finish(MutationEvent::new(
            MutationKind::CascadeDeleted,
            trips,
            trip_id,
        ));
        result?;

        info!(
            "旅行を完全削除しました: trip_id={trip_id}, 削除した支出={}件, 残した支出={}件",
            report.removed_expenses, report.kept_expenses
        );
        event.rows_affected = 1 + report.removed_expenses;
        event.cascade = Some(report);
        Ok(event)
    }

    /// 支出ワークシートを消去して残す行だけを書き戻す
    async fn rewrite_without(&self, trip_id: &str, staged: Vec<Vec<String>>) -> AppResult<()> {
        let expenses = Collection::Expenses;
        let sheet = expenses.sheet_name();
        let backend = &self.backend;

        let cleared = with_retry(&self.write_policy, "clear", move || async move {
            backend.clear(sheet).await
        })
        .await;
        if let Err(e) = cleared {
            self.invalidate_all();
            return Err(e);
        }

        let header: Vec<String> = expenses.header().iter().map(|h| h.to_string()).collect();
        let header = &header;
        let rows = &staged;
        let written = async {
            with_retry(&self.write_policy, "append_row", move || async move {
                backend.append_row(sheet, header).await
            })
            .await?;
            if !rows.is_empty() {
                with_retry(&self.write_policy, "append_rows", move || async move {
                    backend.append_rows(sheet, rows).await
                })
                .await?;
            }
            Ok::<(), AppError>(())
        }
        .await;

        if let Err(e) = written {
            self.invalidate_all();
            error!(
                "支出の書き戻しに失敗しました: trip_id={trip_id}, 未書き戻し={}行, error={e}",
                staged.len()
            );
            return Err(AppError::CascadeInterrupted {
                trip_id: trip_id.to_string(),
                staged_rows: staged,
                cause: e.to_string(),
            });
        }
        Ok(())
    }

    /// キー列の値に一致する行番号を探す
    async fn locate(
        &self,
        collection: Collection,
        key_column: usize,
        key_value: &str,
    ) -> AppResult<usize> {
        let sheet = collection.sheet_name();
        let backend = &self.backend;
        let found = with_retry(&self.write_policy, "find_row", move || async move {
            backend.find_row(sheet, key_column, key_value).await
        })
        .await?;
        found.ok_or_else(|| {
            let column = collection.column_name(key_column).unwrap_or("?");
            AppError::NotFound(format!("{sheet} に {column}={key_value} の行が見つかりません"))
        })
    }

    /// イベントに記録されたコレクションのキャッシュを無効化する
    fn finish(&self, event: MutationEvent) -> MutationEvent {
        let mut cache = self.cache();
        for collection in &event.invalidated {
            cache.invalidate(*collection);
        }
        event
    }

    /// コレクションのキャッシュを無効化する
    pub fn invalidate(&self, collection: Collection) {
        if self.cache().invalidate(collection) {
            debug!("キャッシュを無効化しました: {collection}");
        }
    }

    /// 全キャッシュを無効化する
    pub fn invalidate_all(&self) {
        let cleared = self.cache().invalidate_all();
        if !cleared.is_empty() {
            debug!("キャッシュを無効化しました: {cleared:?}");
        }
    }

    pub fn is_cached(&self, collection: Collection) -> bool {
        self.cache().is_cached(collection)
    }
}

fn check_column(collection: Collection, column: usize) -> AppResult<()> {
    if column == 0 || column > collection.width() {
        return Err(AppError::validation(format!(
            "{collection} に {column} 列目はありません"
        )));
    }
    Ok(())
}

fn validate_updates(
    collection: Collection,
    key_column: usize,
    updates: &[FieldUpdate],
) -> AppResult<()> {
    check_column(collection, key_column)?;
    if updates.is_empty() {
        return Err(AppError::validation("更新する列がありません"));
    }
    for update in updates {
        check_column(collection, update.column)?;
        if update.column == key_column {
            return Err(AppError::validation("キー列は更新できません"));
        }
    }
    Ok(())
}
