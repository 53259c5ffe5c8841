use super::models::{
    validate_expense_fields, CreateExpenseDto, Expense, Satisfaction, UpdateExpenseDto,
};
use crate::features::records::{expense_col, Collection, MutationEvent, RecordStore};
use crate::features::sheets::{FieldUpdate, SheetBackend};
use crate::features::trips;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{format_timestamp, now_jst};
use uuid::Uuid;

/// 支出を記録する
///
/// # 処理内容
/// 1. 品目・金額・満足度の検証
/// 2. 旅行の存在確認（Active / Planning 以外の旅行には記録できない）
/// 3. 記録時刻（JST）の付与。支払日の省略時は今日
/// 4. 未来日の支出は満足度を0（事後評価待ち）にする
///
/// # 戻り値
/// 作成された支出とミューテーションイベント
pub async fn create<B: SheetBackend>(
    store: &RecordStore<B>,
    dto: CreateExpenseDto,
) -> AppResult<(Expense, MutationEvent)> {
    let (amount, satisfaction) =
        validate_expense_fields(&dto.item_name, dto.amount, dto.satisfaction)?;
    let trip = trips::find_by_id(store, &dto.trip_id).await?;
    if !trip.status.is_open() {
        return Err(AppError::validation(format!(
            "{}（{}）には支出を記録できません",
            trip.trip_name, trip.status
        )));
    }

    let now = now_jst();
    let today = now.date();
    let expense_date = dto.expense_date.unwrap_or(today);
    let satisfaction = if expense_date > today {
        log::info!("未来日の支出のため満足度を未評価にします: expense_date={expense_date}");
        Satisfaction::PENDING
    } else {
        satisfaction
    };

    let expense = Expense {
        entry_id: Uuid::new_v4().to_string(),
        trip_id: dto.trip_id,
        timestamp: format_timestamp(now),
        category: dto.category,
        item_name: dto.item_name,
        amount,
        satisfaction,
        detail: dto.detail,
        expense_date: Some(expense_date),
        is_waste: dto.is_waste,
    };
    let event = store.append(&expense).await?;
    Ok((expense, event))
}

/// 全支出を取得する
pub async fn find_all<B: SheetBackend>(store: &RecordStore<B>) -> AppResult<Vec<Expense>> {
    store.fetch_all::<Expense>().await
}

/// 旅行に属する支出を取得する
pub async fn find_by_trip<B: SheetBackend>(
    store: &RecordStore<B>,
    trip_id: &str,
) -> AppResult<Vec<Expense>> {
    let expenses = find_all(store).await?;
    Ok(expenses.into_iter().filter(|e| e.trip_id == trip_id).collect())
}

/// IDで支出を取得する
pub async fn find_by_id<B: SheetBackend>(
    store: &RecordStore<B>,
    entry_id: &str,
) -> AppResult<Expense> {
    find_all(store)
        .await?
        .into_iter()
        .find(|e| e.entry_id == entry_id)
        .ok_or_else(|| AppError::not_found(format!("支出「{entry_id}」")))
}

/// 支出を上書き更新する（旅行IDと記録時刻は変更しない）
pub async fn update<B: SheetBackend>(
    store: &RecordStore<B>,
    entry_id: &str,
    dto: UpdateExpenseDto,
) -> AppResult<MutationEvent> {
    let (amount, satisfaction) =
        validate_expense_fields(&dto.item_name, dto.amount, dto.satisfaction)?;
    let updates: Vec<FieldUpdate> = dto
        .cells(amount, satisfaction)
        .into_iter()
        .map(|(column, value)| FieldUpdate::new(column, value))
        .collect();

    store
        .update_by_key(Collection::Expenses, expense_col::ENTRY_ID, entry_id, &updates)
        .await
}

/// 支出を削除する
pub async fn delete<B: SheetBackend>(
    store: &RecordStore<B>,
    entry_id: &str,
) -> AppResult<MutationEvent> {
    store
        .delete_by_key(Collection::Expenses, expense_col::ENTRY_ID, entry_id)
        .await
}
