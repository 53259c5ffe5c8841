// スナップショットキャッシュ

use super::schema::Collection;
use super::table::RecordTable;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct CachedSnapshot {
    table: Arc<RecordTable>,
    fetched_at: Instant,
}

/// コレクションごとの全行スナップショットを有効期間つきで保持する
///
/// 期限切れのエントリは `get` で見えなくなるだけで、次の `insert` で置き換わる。
pub struct SnapshotCache {
    ttl: Duration,
    entries: HashMap<Collection, CachedSnapshot>,
}

impl SnapshotCache {
    /// キャッシュを作成する
    ///
    /// # 引数
    /// * `ttl` - スナップショットの有効期間
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// 有効期間内のスナップショットを取得する
    pub fn get(&self, collection: Collection) -> Option<Arc<RecordTable>> {
        self.entries
            .get(&collection)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.table))
    }

    /// スナップショットを保存する
    pub fn insert(&mut self, collection: Collection, table: RecordTable) -> Arc<RecordTable> {
        let table = Arc::new(table);
        self.entries.insert(
            collection,
            CachedSnapshot {
                table: Arc::clone(&table),
                fetched_at: Instant::now(),
            },
        );
        table
    }

    /// コレクションのスナップショットを破棄する
    ///
    /// # 戻り値
    /// 破棄したエントリがあった場合はtrue
    pub fn invalidate(&mut self, collection: Collection) -> bool {
        self.entries.remove(&collection).is_some()
    }

    /// 全コレクションのスナップショットを破棄する
    pub fn invalidate_all(&mut self) -> Vec<Collection> {
        Collection::ALL
            .into_iter()
            .filter(|collection| self.invalidate(*collection))
            .collect()
    }

    pub fn is_cached(&self, collection: Collection) -> bool {
        self.get(collection).is_some()
    }
}
