/// 旅行機能モジュール
///
/// 旅行の作成・一覧・更新と、確認付きの完全削除（関連支出を含む）を提供する。
pub mod models;
pub mod repository;

pub use models::{CreateTripDto, Trip, TripStatus, UpdateTripDto};
pub use repository::{create, delete_confirmed, find_all, find_by_id, find_open, update};
