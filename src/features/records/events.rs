use super::schema::Collection;
use serde::Serialize;

/// ミューテーションの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MutationKind {
    Appended,
    Updated,
    Deleted,
    CascadeDeleted,
}

/// 連鎖削除の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// 削除した支出行の数
    pub removed_expenses: usize,
    /// 書き戻した支出行の数
    pub kept_expenses: usize,
}

/// 成功したミューテーションの記録
///
/// 呼び出し側はこれを受け取った時点でキャッシュが無効化済みであることを前提にできる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationEvent {
    pub kind: MutationKind,
    pub collection: Collection,
    /// 対象行のキー値
    pub key: String,
    pub rows_affected: usize,
    /// 無効化したコレクション
    pub invalidated: Vec<Collection>,
    pub cascade: Option<CascadeReport>,
}

impl MutationEvent {
    pub(crate) fn new(kind: MutationKind, collection: Collection, key: &str) -> Self {
        Self {
            kind,
            collection,
            key: key.to_string(),
            rows_affected: 1,
            invalidated: Collection::ALL.to_vec(),
            cascade: None,
        }
    }
}
