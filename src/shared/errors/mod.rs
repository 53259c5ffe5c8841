use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// バリデーション関連のエラー（ストア呼び出し前に拒否）
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// キー検索で行が見つからない場合のエラー
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 一時的な接続エラー・レート制限（リトライ対象）
    #[error("一時的な通信エラー: {0}")]
    Transient(String),

    /// リトライ上限に達した致命的エラー
    #[error("リトライ上限到達: 操作={operation}, 試行回数={attempts}, 最終エラー={last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    /// スプレッドシートAPIが拒否したリクエスト（リトライ不可）
    #[error("スプレッドシートAPIエラー: {0}")]
    Sheets(String),

    /// ワークシートが存在しない
    #[error("ワークシート '{0}' が見つかりません")]
    MissingWorksheet(String),

    /// 連鎖削除の書き戻し途中で失敗した
    #[error("連鎖削除が中断されました: trip_id={trip_id}, 未書き戻し行数={}, 原因={cause}", staged_rows.len())]
    CascadeInterrupted {
        trip_id: String,
        staged_rows: Vec<Vec<String>>,
        cause: String,
    },

    /// ローカルワークブック（SQLite）関連のエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// I/O関連のエラー
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（外部サービス一時的エラーなど）
    Medium,
    /// 高重要度（データベースエラーなど）
    High,
    /// 最重要（データ消失の可能性）
    Critical,
}

impl AppError {
    /// ユーザーに表示するためのフレンドリーなメッセージを取得
    ///
    /// # 戻り値
    /// ユーザーに表示可能なエラーメッセージ
    pub fn user_message(&self) -> &str {
        match self {
            AppError::Validation(msg) => msg,
            AppError::NotFound(msg) => msg,
            AppError::Transient(_) => {
                "スプレッドシートとの通信が一時的に失敗しました。しばらく時間をおいて再試行してください"
            }
            AppError::RetryExhausted { .. } => {
                "Google APIエラー（再試行に失敗しました）。処理を中断します"
            }
            AppError::Sheets(_) => "スプレッドシートAPIがリクエストを拒否しました",
            AppError::MissingWorksheet(_) => "ワークシートが見つかりません。スプレッドシートの構成を確認してください",
            AppError::CascadeInterrupted { .. } => {
                "完全削除中にエラーが発生しました。支出データの書き戻しが完了していません"
            }
            AppError::Database(_) => "データベース操作でエラーが発生しました",
            AppError::Configuration(_) => "設定エラーが発生しました",
            AppError::Io(_) => "ファイル操作でエラーが発生しました",
            AppError::Json(_) => "データ形式の解析でエラーが発生しました",
        }
    }

    /// エラーの詳細情報を取得
    ///
    /// # 戻り値
    /// エラーの詳細情報（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::NotFound(_) => ErrorSeverity::Low,
            AppError::Transient(_) => ErrorSeverity::Medium,
            AppError::RetryExhausted { .. } => ErrorSeverity::High,
            AppError::Sheets(_) => ErrorSeverity::High,
            AppError::MissingWorksheet(_) => ErrorSeverity::High,
            AppError::CascadeInterrupted { .. } => ErrorSeverity::Critical,
            AppError::Database(_) => ErrorSeverity::High,
            AppError::Configuration(_) => ErrorSeverity::High,
            AppError::Io(_) => ErrorSeverity::Medium,
            AppError::Json(_) => ErrorSeverity::Medium,
        }
    }

    /// リトライで回復し得るエラーかどうか
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }

    /// バリデーションエラーを作成するヘルパー関数
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// リソース未発見エラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `resource` - 見つからなかったリソース名
    ///
    /// # 戻り値
    /// リソース未発見エラー
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        AppError::NotFound(format!("{}が見つかりません", resource.into()))
    }

    /// 一時的エラーを作成するヘルパー関数
    pub fn transient<S: Into<String>>(message: S) -> Self {
        AppError::Transient(message.into())
    }

    /// スプレッドシートAPIエラーを作成するヘルパー関数
    pub fn sheets<S: Into<String>>(message: S) -> Self {
        AppError::Sheets(message.into())
    }

    /// 設定エラーを作成するヘルパー関数
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }
}

/// AppErrorからStringへの変換（コマンド層での表示のため）
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.user_message().to_string()
    }
}

/// rusqlite::ErrorからAppErrorへの変換
impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Database(error.to_string())
    }
}

/// reqwest::ErrorからAppErrorへの変換
///
/// 接続失敗・タイムアウトは一時的エラーとして扱う。
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            return AppError::Transient(error.to_string());
        }
        match error.status() {
            Some(status) if status.as_u16() == 429 || status.is_server_error() => {
                AppError::Transient(error.to_string())
            }
            _ => AppError::Sheets(error.to_string()),
        }
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;

/// エラーを重要度に応じたレベルでログに記録し、ユーザー向けメッセージを返す
pub fn report_error(error: &AppError) -> String {
    match error.severity() {
        ErrorSeverity::Critical => log::error!("重大なエラー: {}", error.details()),
        ErrorSeverity::High => log::error!("高レベルエラー: {}", error.details()),
        ErrorSeverity::Medium => log::warn!("中レベルエラー: {}", error.details()),
        ErrorSeverity::Low => log::info!("低レベルエラー: {}", error.details()),
    }
    error.user_message().to_string()
}
