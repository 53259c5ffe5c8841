/// 監査機能モジュール
///
/// 予算消化・カテゴリ内訳・浪費の集計と、台帳のCSVエクスポートを提供する。
pub mod export;
pub mod summary;

pub use export::{export_filename, expenses_to_csv, write_csv};
pub use summary::{
    category_breakdown, category_total, sort_for_ledger, total_amount, AuditFlag, CategoryShare,
    TripSummary,
};
