/// 支出機能モジュール
///
/// このモジュールは、旅行中の支出記録に関連する機能を提供します：
/// - 支出の記録（記録時刻の付与、未来日の満足度保留）
/// - 旅行別・全件の一覧取得（旧レイアウトの行も読み込み可能）
/// - 支出の更新・削除
pub mod models;
pub mod repository;

pub use models::{
    CreateExpenseDto, Expense, ExpenseCategory, Satisfaction, UpdateExpenseDto,
};
pub use repository::{create, delete, find_all, find_by_id, find_by_trip, update};
