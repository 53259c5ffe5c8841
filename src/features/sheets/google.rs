use super::{find_in_values, FieldUpdate, SheetBackend};
use crate::shared::config::{GoogleCredentials, GoogleSheetsConfig};
use crate::shared::errors::{AppError, AppResult};
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, ClientId, ClientSecret,
    RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// アクセストークン期限の手前で更新するための余裕
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// 書き込みは受け取った文字列をそのまま保存する
const VALUE_INPUT_OPTION: &str = "RAW";

struct CachedToken {
    secret: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_usable(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + TOKEN_REFRESH_MARGIN < expires_at,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// Google Sheets API v4 クライアント
///
/// 起動時に一度だけ [`GoogleSheetsClient::connect`] で構築し、以降は使い回す。
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    credentials: GoogleCredentials,
    oauth_client: Option<BasicClient>,
    token: Mutex<Option<CachedToken>>,
    spreadsheet_id: String,
    sheet_ids: HashMap<String, i64>,
}

impl GoogleSheetsClient {
    /// スプレッドシートに接続する
    ///
    /// IDが設定されていない場合は Drive API で名前から検索する。
    /// ワークシートのID一覧もここで取得する。
    pub async fn connect(config: GoogleSheetsConfig) -> AppResult<Self> {
        log::info!("Googleスプレッドシートへ接続します: {:?}", config.get_debug_info());

        let oauth_client = match &config.credentials {
            GoogleCredentials::AccessToken(_) => None,
            GoogleCredentials::RefreshToken {
                client_id,
                client_secret,
                ..
            } => {
                let auth_url = AuthUrl::new(AUTH_URL.to_string())
                    .map_err(|e| AppError::configuration(format!("認証URL設定エラー: {e}")))?;
                let token_url = TokenUrl::new(TOKEN_URL.to_string())
                    .map_err(|e| AppError::configuration(format!("トークンURL設定エラー: {e}")))?;
                Some(BasicClient::new(
                    ClientId::new(client_id.clone()),
                    Some(ClientSecret::new(client_secret.clone())),
                    auth_url,
                    Some(token_url),
                ))
            }
        };

        let mut client = Self {
            http: reqwest::Client::new(),
            credentials: config.credentials.clone(),
            oauth_client,
            token: Mutex::new(None),
            spreadsheet_id: String::new(),
            sheet_ids: HashMap::new(),
        };

        client.spreadsheet_id = match config.spreadsheet_id {
            Some(id) => id,
            None => client.find_spreadsheet_id(&config.spreadsheet_name).await?,
        };
        client.sheet_ids = client.load_sheet_ids().await?;

        log::info!(
            "スプレッドシートに接続しました: id={}, ワークシート数={}",
            client.spreadsheet_id,
            client.sheet_ids.len()
        );
        Ok(client)
    }

    /// 有効なアクセストークンを取得する（必要に応じて更新）
    async fn access_token(&self) -> AppResult<String> {
        let (client, refresh_token) = match (&self.credentials, &self.oauth_client) {
            (GoogleCredentials::AccessToken(token), _) => return Ok(token.clone()),
            (GoogleCredentials::RefreshToken { refresh_token, .. }, Some(client)) => {
                (client, refresh_token)
            }
            (GoogleCredentials::RefreshToken { .. }, None) => {
                return Err(AppError::configuration("OAuth2クライアントが未設定です"))
            }
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_usable()) {
            return Ok(token.secret.clone());
        }

        log::debug!("アクセストークンを更新します");
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(async_http_client)
            .await
            .map_err(|e| match e {
                RequestTokenError::Request(err) => {
                    AppError::transient(format!("アクセストークン取得に失敗: {err}"))
                }
                other => AppError::configuration(format!("アクセストークン取得に失敗: {other}")),
            })?;

        let secret = response.access_token().secret().clone();
        *cached = Some(CachedToken {
            secret: secret.clone(),
            expires_at: response.expires_in().map(|ttl| Instant::now() + ttl),
        });
        Ok(secret)
    }

    /// 認証付きでリクエストを送信し、失敗ステータスをエラーに変換する
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> AppResult<reqwest::Response> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, operation, &body))
    }

    async fn find_spreadsheet_id(&self, name: &str) -> AppResult<String> {
        let query = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
            name.replace('\'', "\\'")
        );
        let request = self
            .http
            .get(DRIVE_FILES_API)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);
        let list: DriveFileList = self.send(request, "files.list").await?.json().await?;

        match list.files.into_iter().next() {
            Some(file) => {
                log::debug!("スプレッドシートを名前で解決しました: {} -> {}", file.name, file.id);
                Ok(file.id)
            }
            None => Err(AppError::configuration(format!(
                "スプレッドシート '{name}' が見つかりません"
            ))),
        }
    }

    async fn load_sheet_ids(&self) -> AppResult<HashMap<String, i64>> {
        let url = self.spreadsheet_url(&[])?;
        let request = self
            .http
            .get(url)
            .query(&[("fields", "sheets.properties(sheetId,title)")]);
        let meta: SpreadsheetMeta = self.send(request, "spreadsheets.get").await?.json().await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|sheet| (sheet.properties.title, sheet.properties.sheet_id))
            .collect())
    }

    /// `spreadsheets/{id}` 配下のURLを組み立てる
    ///
    /// `segments` の先頭要素が `:` で始まる場合はID直後に連結する（`{id}:batchUpdate`）。
    fn spreadsheet_url(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = Url::parse(SHEETS_API)
            .map_err(|e| AppError::configuration(format!("APIのURLが不正です: {e}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AppError::configuration("APIのURLにパスを追加できません"))?;
            match segments.split_first() {
                Some((first, rest)) if first.starts_with(':') => {
                    path.push(&format!("{}{first}", self.spreadsheet_id));
                    path.extend(rest);
                }
                _ => {
                    path.push(&self.spreadsheet_id);
                    path.extend(segments);
                }
            }
        }
        Ok(url)
    }

    fn sheet_id(&self, sheet: &str) -> AppResult<i64> {
        self.sheet_ids
            .get(sheet)
            .copied()
            .ok_or_else(|| AppError::MissingWorksheet(sheet.to_string()))
    }
}

impl SheetBackend for GoogleSheetsClient {
    async fn ensure_worksheet(&self, sheet: &str) -> AppResult<()> {
        self.sheet_id(sheet).map(|_| ())
    }

    async fn get_all_values(&self, sheet: &str) -> AppResult<Vec<Vec<String>>> {
        self.ensure_worksheet(sheet).await?;
        let url = self.spreadsheet_url(&["values", &sheet_range(sheet)])?;
        let request = self.http.get(url).query(&[
            ("valueRenderOption", "UNFORMATTED_VALUE"),
            ("dateTimeRenderOption", "FORMATTED_STRING"),
        ]);
        let range: ValueRange = self.send(request, "values.get").await?.json().await?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> AppResult<()> {
        self.append_rows(sheet, &[row.to_vec()]).await
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()> {
        self.ensure_worksheet(sheet).await?;
        let range = format!("{}:append", cell_range(sheet, 1, 1));
        let url = self.spreadsheet_url(&["values", &range])?;
        let request = self
            .http
            .post(url)
            .query(&[
                ("valueInputOption", VALUE_INPUT_OPTION),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": rows }));
        self.send(request, "values.append").await?;
        log::debug!("{sheet} に {}行追加しました", rows.len());
        Ok(())
    }

    async fn update_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> AppResult<()> {
        self.ensure_worksheet(sheet).await?;
        let range = cell_range(sheet, row, column);
        let url = self.spreadsheet_url(&["values", &range])?;
        let request = self
            .http
            .put(url)
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .json(&json!({ "range": range, "values": [[value]] }));
        self.send(request, "values.update").await?;
        Ok(())
    }

    /// values:batchUpdate で行内の全セルを1リクエストで書き換える
    async fn update_cells(&self, sheet: &str, row: usize, updates: &[FieldUpdate]) -> AppResult<()> {
        self.ensure_worksheet(sheet).await?;
        let data: Vec<Value> = updates
            .iter()
            .map(|update| {
                json!({
                    "range": cell_range(sheet, row, update.column),
                    "values": [[update.value]],
                })
            })
            .collect();
        let url = self.spreadsheet_url(&["values:batchUpdate"])?;
        let request = self.http.post(url).json(&json!({
            "valueInputOption": VALUE_INPUT_OPTION,
            "data": data,
        }));
        self.send(request, "values.batchUpdate").await?;
        Ok(())
    }

    async fn find_row(&self, sheet: &str, column: usize, value: &str) -> AppResult<Option<usize>> {
        let values = self.get_all_values(sheet).await?;
        Ok(find_in_values(&values, column, value))
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> AppResult<()> {
        if row == 0 {
            return Err(AppError::sheets("行番号は1以上です"));
        }
        let sheet_id = self.sheet_id(sheet)?;
        let url = self.spreadsheet_url(&[":batchUpdate"])?;
        let request = self.http.post(url).json(&json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row - 1,
                        "endIndex": row,
                    }
                }
            }]
        }));
        self.send(request, "batchUpdate.deleteDimension").await?;
        Ok(())
    }

    async fn clear(&self, sheet: &str) -> AppResult<()> {
        self.ensure_worksheet(sheet).await?;
        let range = format!("{}:clear", sheet_range(sheet));
        let url = self.spreadsheet_url(&["values", &range])?;
        let request = self.http.post(url).json(&json!({}));
        self.send(request, "values.clear").await?;
        Ok(())
    }
}

/// HTTPステータスをエラー種別に振り分ける（429と5xxは一時的エラー）
fn classify_status(status: StatusCode, operation: &str, body: &str) -> AppError {
    let message = format!("{operation}: HTTP {status}: {}", body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AppError::transient(message)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        AppError::configuration(message)
    } else {
        AppError::sheets(message)
    }
}

/// 列番号（1始まり）をA1表記の列名にする
pub fn column_letter(column: usize) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// ワークシート全体のA1範囲（シート名はクォートする）
fn sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// 1セルのA1範囲
fn cell_range(sheet: &str, row: usize, column: usize) -> String {
    format!("{}!{}{}", sheet_range(sheet), column_letter(column), row)
}

/// 未整形の値をシートの文字列表現に揃える
fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(10), "J");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_ranges_quote_sheet_names() {
        assert_eq!(sheet_range("expenses"), "'expenses'");
        assert_eq!(cell_range("expenses", 5, 4), "'expenses'!D5");
        assert_eq!(sheet_range("Bob's"), "'Bob''s'");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&json!(null)), "");
        assert_eq!(cell_to_string(&json!(true)), "TRUE");
        assert_eq!(cell_to_string(&json!(3000)), "3000");
        assert_eq!(cell_to_string(&json!(3000.0)), "3000");
        assert_eq!(cell_to_string(&json!(12.5)), "12.5");
        assert_eq!(cell_to_string(&json!("食事")), "食事");
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "values.get", "").is_retryable());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "values.get", "").is_retryable());
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "values.update", "Unable to parse range"),
            AppError::Sheets(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "values.get", ""),
            AppError::Configuration(_)
        ));
    }

    #[test]
    fn test_cached_token_margin() {
        let fresh = CachedToken {
            secret: "t".to_string(),
            expires_at: Some(Instant::now() + Duration::from_secs(3600)),
        };
        let expiring = CachedToken {
            secret: "t".to_string(),
            expires_at: Some(Instant::now() + Duration::from_secs(10)),
        };
        assert!(fresh.is_usable());
        assert!(!expiring.is_usable());
    }
}
