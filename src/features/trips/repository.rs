use super::models::{validate_trip_fields, CreateTripDto, Trip, TripStatus, UpdateTripDto};
use crate::features::records::{trip_col, Collection, MutationEvent, RecordStore};
use crate::features::sheets::{FieldUpdate, SheetBackend};
use crate::shared::errors::{AppError, AppResult};
use uuid::Uuid;

/// 旅行IDの長さ（UUIDの先頭8文字）
const TRIP_ID_LEN: usize = 8;

fn new_trip_id() -> String {
    Uuid::new_v4().simple().to_string()[..TRIP_ID_LEN].to_string()
}

/// 旅行を作成する（ステータスは Planning）
///
/// # 引数
/// * `store` - レコードストア
/// * `dto` - 旅行作成用DTO
///
/// # 戻り値
/// 作成された旅行とミューテーションイベント
pub async fn create<B: SheetBackend>(
    store: &RecordStore<B>,
    dto: CreateTripDto,
) -> AppResult<(Trip, MutationEvent)> {
    let total_budget = validate_trip_fields(&dto.trip_name, dto.total_budget)?;

    let trip = Trip {
        trip_id: new_trip_id(),
        trip_name: dto.trip_name,
        start_date: Some(dto.start_date),
        end_date: Some(dto.end_date),
        status: TripStatus::Planning,
        total_budget,
        detail: dto.detail,
    };
    let event = store.append(&trip).await?;
    Ok((trip, event))
}

/// 全旅行を取得する
pub async fn find_all<B: SheetBackend>(store: &RecordStore<B>) -> AppResult<Vec<Trip>> {
    store.fetch_all::<Trip>().await
}

/// 支出を記録できる旅行（Active / Planning）を取得する
pub async fn find_open<B: SheetBackend>(store: &RecordStore<B>) -> AppResult<Vec<Trip>> {
    let trips = find_all(store).await?;
    Ok(trips.into_iter().filter(|t| t.status.is_open()).collect())
}

/// IDで旅行を取得する
pub async fn find_by_id<B: SheetBackend>(store: &RecordStore<B>, trip_id: &str) -> AppResult<Trip> {
    find_all(store)
        .await?
        .into_iter()
        .find(|t| t.trip_id == trip_id)
        .ok_or_else(|| AppError::not_found(format!("旅行「{trip_id}」")))
}

/// 旅行情報を上書き更新する
pub async fn update<B: SheetBackend>(
    store: &RecordStore<B>,
    trip_id: &str,
    dto: UpdateTripDto,
) -> AppResult<MutationEvent> {
    let total_budget = validate_trip_fields(&dto.trip_name, dto.total_budget)?;
    let updates: Vec<FieldUpdate> = dto
        .cells(total_budget)
        .into_iter()
        .map(|(column, value)| FieldUpdate::new(column, value))
        .collect();

    store
        .update_by_key(Collection::Trips, trip_col::TRIP_ID, trip_id, &updates)
        .await
}

/// 確認用の旅行名が一致した場合のみ、旅行と関連支出を完全削除する
///
/// # 引数
/// * `confirmation` - ユーザーが入力した旅行名
pub async fn delete_confirmed<B: SheetBackend>(
    store: &RecordStore<B>,
    trip_id: &str,
    confirmation: &str,
) -> AppResult<MutationEvent> {
    let trip = find_by_id(store, trip_id).await?;
    if confirmation != trip.trip_name {
        return Err(AppError::validation("名前が一致しません"));
    }
    store.cascade_delete_trip(trip_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::records::MutationKind;
    use crate::features::sheets::testing::scripted_store;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, day).unwrap()
    }

    fn kyoto() -> CreateTripDto {
        CreateTripDto {
            trip_name: "Kyoto".to_string(),
            start_date: date(1),
            end_date: date(3),
            total_budget: 50000,
            detail: String::new(),
        }
    }

    #[test]
    fn test_new_trip_id_is_short_hex() {
        let id = new_trip_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let store = scripted_store();
        let (trip, event) = create(&store, kyoto()).await.unwrap();

        assert_eq!(trip.status, TripStatus::Planning);
        assert_eq!(event.kind, MutationKind::Appended);
        assert_eq!(event.key, trip.trip_id);

        let trips = find_all(&store).await.unwrap();
        assert_eq!(trips, vec![trip]);
    }

    #[tokio::test]
    async fn test_names_are_stored_as_given() {
        let store = scripted_store();
        let mut dto = kyoto();
        dto.trip_name = "  Kyoto  ".to_string();
        let (trip, _) = create(&store, dto).await.unwrap();

        let stored = find_by_id(&store, &trip.trip_id).await.unwrap();
        assert_eq!(stored.trip_name, "  Kyoto  ");
        assert_eq!(stored, trip);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_without_store_call() {
        let store = scripted_store();
        let mut dto = kyoto();
        dto.total_budget = -100;

        assert!(matches!(
            create(&store, dto).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(store.backend().calls("append_row"), 0);
    }

    #[tokio::test]
    async fn test_open_trips_exclude_closed() {
        let store = scripted_store();
        let (planning, _) = create(&store, kyoto()).await.unwrap();
        let (done, _) = create(&store, kyoto()).await.unwrap();
        update(
            &store,
            &done.trip_id,
            UpdateTripDto {
                trip_name: "Kyoto".to_string(),
                start_date: date(1),
                end_date: date(3),
                status: TripStatus::Completed,
                total_budget: 50000,
                detail: String::new(),
            },
        )
        .await
        .unwrap();

        let open = find_open(&store).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].trip_id, planning.trip_id);
    }

    #[tokio::test]
    async fn test_update_overwrites_fields() {
        let store = scripted_store();
        let (trip, _) = create(&store, kyoto()).await.unwrap();

        update(
            &store,
            &trip.trip_id,
            UpdateTripDto {
                trip_name: "Kyoto & Nara".to_string(),
                start_date: date(2),
                end_date: date(5),
                status: TripStatus::Active,
                total_budget: 80000,
                detail: "延長".to_string(),
            },
        )
        .await
        .unwrap();

        let updated = find_by_id(&store, &trip.trip_id).await.unwrap();
        assert_eq!(updated.trip_name, "Kyoto & Nara");
        assert_eq!(updated.end_date, Some(date(5)));
        assert_eq!(updated.status, TripStatus::Active);
        assert_eq!(updated.total_budget, 80000);
    }

    #[tokio::test]
    async fn test_delete_requires_matching_name() {
        let store = scripted_store();
        let (trip, _) = create(&store, kyoto()).await.unwrap();

        let mismatch = delete_confirmed(&store, &trip.trip_id, "kyoto").await;
        assert!(matches!(mismatch, Err(AppError::Validation(_))));
        assert_eq!(find_all(&store).await.unwrap().len(), 1);

        let event = delete_confirmed(&store, &trip.trip_id, "Kyoto").await.unwrap();
        assert_eq!(event.kind, MutationKind::CascadeDeleted);
        assert!(find_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_unknown_trip() {
        let store = scripted_store();
        assert!(matches!(
            find_by_id(&store, "nope").await,
            Err(AppError::NotFound(_))
        ));
    }
}
