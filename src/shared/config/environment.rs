use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// ログレベル
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        let environment = get_environment();
        let debug_mode = environment == Environment::Development;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            log_level,
        }
    }
}

/// 現在の実行環境を判定する
///
/// # 判定ロジック
/// 1. コンパイル時埋め込み環境変数を最優先
/// 2. 実行時環境変数 ENVIRONMENT を確認
/// 3. デバッグビルドの場合は Development
/// 4. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    if let Some(embedded_env) = option_env!("EMBEDDED_ENVIRONMENT") {
        let env = match embedded_env {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: コンパイル時埋め込み値を使用 -> {embedded_env} -> {env:?}");
        return env;
    }

    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたローカルワークブックのファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_travel_audit.db"
/// - プロダクション環境: "travel_audit.db"
pub fn get_workbook_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_travel_audit.db",
        Environment::Production => "travel_audit.db",
    }
}

/// 環境に応じた.envファイルを読み込む
///
/// 読み込み対象は実行環境で決まる（本番は .env.production、それ以外は .env）。
pub fn load_environment_variables() {
    let environment = get_environment();

    let env_file = match environment {
        Environment::Production => ".env.production",
        Environment::Development => ".env",
    };

    log::info!("環境: {environment:?}, 読み込み対象: {env_file}");

    match dotenv::from_filename(env_file) {
        Ok(_) => {
            log::info!("{env_file}ファイルを読み込みました");
        }
        Err(_) => {
            if env_file != ".env" && dotenv::dotenv().is_ok() {
                log::warn!("{env_file}が見つからないため、デフォルトの.envファイルを読み込みました");
            } else {
                log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// 二重初期化は無視する（テストやCLIの再入で呼ばれても失敗しない）。
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .is_ok();

    if initialized {
        log::info!(
            "ログシステムを初期化しました: level={}, environment={}",
            env_config.log_level,
            env_config.environment
        );
    }
}

/// 使用する行ストアのバックエンド種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Google スプレッドシート（リモート）
    Google,
    /// ローカルの SQLite ワークブック
    Sqlite,
}

impl BackendKind {
    /// SHEETS_BACKEND 環境変数から判定する（未設定時は環境に応じた既定値）
    pub fn from_env(env: &Environment) -> Self {
        match std::env::var("SHEETS_BACKEND").ok().as_deref() {
            Some("google") => BackendKind::Google,
            Some("sqlite") => BackendKind::Sqlite,
            Some(other) => {
                log::warn!("不明なSHEETS_BACKEND: {other}。環境の既定値を使用します");
                Self::default_for(env)
            }
            None => Self::default_for(env),
        }
    }

    fn default_for(env: &Environment) -> Self {
        match env {
            Environment::Production => BackendKind::Google,
            Environment::Development => BackendKind::Sqlite,
        }
    }
}

/// レコードストアのキャッシュ・リトライ設定
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// スナップショットキャッシュの有効期間
    pub cache_ttl: Duration,
    /// 書き込みの最大試行回数
    pub write_max_attempts: u32,
    /// 書き込みリトライの基本待機時間（試行ごとに線形に増加）
    pub write_backoff: Duration,
    /// 読み込みの最大試行回数
    pub read_max_attempts: u32,
    /// 読み込みリトライの待機時間
    pub read_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            write_max_attempts: 3,
            write_backoff: Duration::from_millis(1000),
            read_max_attempts: 2,
            read_backoff: Duration::from_millis(2000),
        }
    }
}

impl StoreConfig {
    /// 環境変数から設定を読み込む（未設定・不正値は既定値）
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            cache_ttl: Duration::from_secs(env_u64("CACHE_TTL_SECS", defaults.cache_ttl.as_secs())),
            write_max_attempts: env_value("WRITE_MAX_ATTEMPTS", defaults.write_max_attempts).max(1),
            write_backoff: Duration::from_millis(env_u64(
                "WRITE_BACKOFF_MS",
                defaults.write_backoff.as_millis() as u64,
            )),
            read_max_attempts: env_value("READ_MAX_ATTEMPTS", defaults.read_max_attempts).max(1),
            read_backoff: Duration::from_millis(env_u64(
                "READ_BACKOFF_MS",
                defaults.read_backoff.as_millis() as u64,
            )),
        };
        log::debug!("StoreConfig::from_env() - {config:?}");
        config
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env_value(name, default)
}

fn env_value<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    parse_or_default(name, std::env::var(name).ok().as_deref(), default)
}

/// 設定値を解析する（未設定・型の範囲外・不正値は既定値）
fn parse_or_default<T>(name: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("{name} の値が不正です（{raw}）。既定値 {default} を使用します");
            default
        }),
        None => default,
    }
}

/// Google スプレッドシート接続の認証方式
#[derive(Debug, Clone)]
pub enum GoogleCredentials {
    /// 発行済みアクセストークンをそのまま使用
    AccessToken(String),
    /// OAuth2 リフレッシュトークンからアクセストークンを取得
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

/// Google スプレッドシートの設定を管理する構造体
#[derive(Debug, Clone)]
pub struct GoogleSheetsConfig {
    /// スプレッドシート名（IDが未指定の場合に名前で検索する）
    pub spreadsheet_name: String,
    /// スプレッドシートID
    pub spreadsheet_id: Option<String>,
    /// 認証情報
    pub credentials: GoogleCredentials,
}

impl GoogleSheetsConfig {
    /// 環境変数からスプレッドシート設定を読み込む
    ///
    /// # 戻り値
    /// 設定、または認証情報が不完全な場合はNone
    pub fn from_env() -> Option<Self> {
        log::debug!("GoogleSheetsConfig::from_env() - 環境変数の読み込みを開始");

        let spreadsheet_name =
            std::env::var("SPREADSHEET_NAME").unwrap_or_else(|_| "TravelAuditDB".to_string());
        let spreadsheet_id = std::env::var("SPREADSHEET_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());

        let credentials = if let Ok(token) = std::env::var("GOOGLE_SHEETS_ACCESS_TOKEN") {
            log::debug!("GOOGLE_SHEETS_ACCESS_TOKEN を使用: {}", mask(&token));
            GoogleCredentials::AccessToken(token)
        } else {
            let client_id = std::env::var("GOOGLE_CLIENT_ID").ok();
            let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok();
            let refresh_token = std::env::var("GOOGLE_REFRESH_TOKEN").ok();
            match (client_id, client_secret, refresh_token) {
                (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                    log::debug!("OAuth2 リフレッシュトークンを使用: client_id={}", mask(&client_id));
                    GoogleCredentials::RefreshToken {
                        client_id,
                        client_secret,
                        refresh_token,
                    }
                }
                _ => {
                    log::error!(
                        "Google認証情報が見つかりません（GOOGLE_SHEETS_ACCESS_TOKEN または GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET/GOOGLE_REFRESH_TOKEN）"
                    );
                    return None;
                }
            }
        };

        Some(Self {
            spreadsheet_name,
            spreadsheet_id,
            credentials,
        })
    }

    /// 設定を検証する
    pub fn validate(&self) -> Result<(), String> {
        if self.spreadsheet_name.trim().is_empty() && self.spreadsheet_id.is_none() {
            return Err("スプレッドシート名またはIDが必要です".to_string());
        }
        let credentials_ok = match &self.credentials {
            GoogleCredentials::AccessToken(token) => !token.is_empty(),
            GoogleCredentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => !client_id.is_empty() && !client_secret.is_empty() && !refresh_token.is_empty(),
        };
        if !credentials_ok {
            return Err("Google認証情報が不完全です".to_string());
        }
        Ok(())
    }

    /// デバッグ情報を取得（認証情報はマスク）
    pub fn get_debug_info(&self) -> std::collections::HashMap<String, String> {
        let mut info = std::collections::HashMap::new();
        info.insert("spreadsheet_name".to_string(), self.spreadsheet_name.clone());
        info.insert(
            "spreadsheet_id".to_string(),
            self.spreadsheet_id.clone().unwrap_or_else(|| "(名前で検索)".to_string()),
        );
        let auth = match &self.credentials {
            GoogleCredentials::AccessToken(token) => format!("access_token {}", mask(token)),
            GoogleCredentials::RefreshToken { client_id, .. } => {
                format!("refresh_token client_id={}", mask(client_id))
            }
        };
        info.insert("credentials".to_string(), auth);
        info
    }
}

/// 秘密情報を先頭4文字だけ残してマスクする
fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}
