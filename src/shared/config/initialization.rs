use super::environment::{get_environment, get_workbook_filename, BackendKind, Environment};
use crate::shared::errors::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// アプリケーションデータディレクトリ名
const APP_DIR_NAME: &str = "travel-audit";

/// アプリケーション初期化の結果を表す構造体
#[derive(Debug)]
pub struct InitializationResult {
    /// 初回起動かどうか（ローカルワークブックの有無で判定）
    pub is_first_run: bool,
    /// アプリケーションデータディレクトリのパス
    pub app_data_dir: PathBuf,
    /// ローカルワークブックのパス
    pub workbook_path: PathBuf,
    /// 実行環境
    pub environment: Environment,
    /// 使用するバックエンド
    pub backend: BackendKind,
}

/// アプリケーションの初期化を実行する
///
/// # 処理内容
/// 1. 実行環境とバックエンドの決定
/// 2. アプリケーションデータディレクトリの作成
/// 3. ローカルワークブックのパス決定（WORKBOOK_PATH で上書き可能）
pub fn initialize_application() -> AppResult<InitializationResult> {
    let environment = get_environment();
    let backend = BackendKind::from_env(&environment);

    let base_dir = dirs::data_dir()
        .ok_or_else(|| AppError::configuration("データディレクトリを取得できません"))?;
    let app_data_dir = ensure_app_data_directory(&base_dir)?;

    let workbook_path = match std::env::var("WORKBOOK_PATH") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => app_data_dir.join(get_workbook_filename(environment.clone())),
    };

    let is_first_run = backend == BackendKind::Sqlite && !workbook_path.exists();
    if is_first_run {
        log_first_run_initialization(&environment, &app_data_dir, &workbook_path);
    }

    Ok(InitializationResult {
        is_first_run,
        app_data_dir,
        workbook_path,
        environment,
        backend,
    })
}

/// アプリケーションデータディレクトリを確実に作成する
fn ensure_app_data_directory(base_dir: &Path) -> AppResult<PathBuf> {
    let app_data_dir = base_dir.join(APP_DIR_NAME);

    if !app_data_dir.exists() {
        fs::create_dir_all(&app_data_dir).map_err(|e| {
            AppError::configuration(format!("アプリデータディレクトリの作成に失敗しました: {e}"))
        })?;
        log::info!("アプリケーションデータディレクトリを作成しました: {app_data_dir:?}");
    }

    Ok(app_data_dir)
}

fn log_first_run_initialization(environment: &Environment, app_data_dir: &Path, workbook: &Path) {
    log::info!("=== アプリケーション初回起動 ===");
    log::info!("実行環境: {environment:?}");
    log::info!("アプリデータディレクトリ: {app_data_dir:?}");
    log::info!("ローカルワークブック: {workbook:?}");
}

/// 初期化完了ログを出力する
pub fn log_initialization_complete(result: &InitializationResult) {
    if result.is_first_run {
        log::info!("初回起動の初期化が正常に完了しました");
    }
    log::info!(
        "環境: {:?}, バックエンド: {:?}",
        result.environment,
        result.backend
    );
    if result.backend == BackendKind::Sqlite {
        log::info!("ワークブック: {:?}", result.workbook_path);
    }
}
