pub mod features;
pub mod shared;

use features::records::RecordStore;
use features::sheets::{GoogleSheetsClient, SqliteWorkbook, Workbook};
use log::{error, info};
use shared::config::{
    initialize_application, initialize_logging_system, load_environment_variables,
    log_initialization_complete, BackendKind, GoogleSheetsConfig, InitializationResult,
    StoreConfig,
};
use shared::errors::{AppError, AppResult};

/// アプリケーション状態（プロセス全体で1つのレコードストアを保持）
pub struct AppContext {
    pub store: RecordStore<Workbook>,
    pub init: InitializationResult,
}

/// アプリケーションを起動する
///
/// # 処理内容
/// 1. ログシステムと環境変数の読み込み
/// 2. データディレクトリとバックエンドの決定
/// 3. 行ストアへの接続（ローカルの場合はワークシートを用意）
/// 4. レコードストアの構築
pub async fn bootstrap() -> AppResult<AppContext> {
    initialize_logging_system();
    load_environment_variables();

    info!("アプリケーション初期化を開始します...");
    let init = initialize_application()?;

    let workbook = match init.backend {
        BackendKind::Google => {
            let config = GoogleSheetsConfig::from_env()
                .ok_or_else(|| AppError::configuration("Google認証情報が設定されていません"))?;
            config.validate().map_err(AppError::configuration)?;
            Workbook::Google(GoogleSheetsClient::connect(config).await.map_err(|e| {
                error!("スプレッドシートへの接続に失敗しました: {e}");
                e
            })?)
        }
        BackendKind::Sqlite => {
            let workbook = SqliteWorkbook::open(&init.workbook_path)?;
            workbook.initialize_worksheets()?;
            Workbook::Sqlite(workbook)
        }
    };

    let store_config = StoreConfig::from_env();
    info!(
        "レコードストアを初期化しました: backend={}, cache_ttl={:?}",
        workbook.kind_name(),
        store_config.cache_ttl
    );
    log_initialization_complete(&init);

    Ok(AppContext {
        store: RecordStore::new(workbook, &store_config),
        init,
    })
}
