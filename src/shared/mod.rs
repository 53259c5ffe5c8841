/// 共有エラー型とエラーハンドリング
pub mod errors;

/// 共有設定管理
pub mod config;

/// 共有ユーティリティ関数
pub mod utils;

// 便利な再エクスポート
pub use config::{
    get_environment, initialize_application, initialize_logging_system,
    load_environment_variables, log_initialization_complete, BackendKind, Environment,
    EnvironmentConfig, GoogleSheetsConfig, InitializationResult, StoreConfig,
};
pub use errors::{report_error, AppError, AppResult, ErrorSeverity};
