/// 環境設定関連のモジュール
pub mod environment;

/// アプリケーション初期化
pub mod initialization;

// 便利な再エクスポート
pub use environment::{
    get_environment, get_workbook_filename, initialize_logging_system,
    load_environment_variables, BackendKind, Environment, EnvironmentConfig, GoogleCredentials,
    GoogleSheetsConfig, StoreConfig,
};
pub use initialization::{initialize_application, log_initialization_complete, InitializationResult};
