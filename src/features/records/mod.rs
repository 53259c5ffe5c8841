/// レコードストア機能モジュール
///
/// 行ストアの上で以下を提供する：
/// - ヘッダー行から列名を推定したレコード読み込み
/// - コレクション単位のスナップショットキャッシュ
/// - 一時的エラーに対するリトライ
/// - キー指定の更新・削除と、旅行の連鎖削除
pub mod cache;
pub mod events;
pub mod retry;
pub mod schema;
pub mod store;
pub mod table;

pub use cache::SnapshotCache;
pub use events::{CascadeReport, MutationEvent, MutationKind};
pub use retry::{with_retry, Backoff, RetryPolicy};
pub use schema::{expense_col, trip_col, Collection, EXPENSE_COLUMNS, TRIP_COLUMNS};
pub use store::RecordStore;
pub use table::{Record, RecordTable, SheetRecord};
