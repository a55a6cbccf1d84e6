//! Google Sheets v4 gateway authenticated as a service account.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::{ServiceAccountCredentials, SyncSettings};
use crate::error::{Result, SyncError};
use crate::gateway::SpreadsheetStore;
use crate::locator::SpreadsheetId;
use crate::schema::Row;
use crate::util::{compact_text, is_http_url, sanitize};

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3_600;
/// Refresh cached tokens this long before Google expires them.
const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

/// How the client obtains bearer tokens.
pub enum SheetsAuth {
    ServiceAccount(Box<ServiceAccountAuth>),
    /// Pre-minted bearer token from `GOOGLE_ACCESS_TOKEN`
    Static(String),
    /// Credentials were missing or malformed at startup
    Unavailable(SyncError),
}

impl SheetsAuth {
    /// Build auth from settings, keeping any credential problem for later calls.
    ///
    /// A configured access token is used as-is; otherwise the service account
    /// signs its own assertions.
    pub fn from_settings(settings: &SyncSettings) -> Self {
        if let Some(token) = &settings.google_access_token {
            return Self::Static(token.clone());
        }

        let auth = settings
            .google
            .as_ref()
            .map_err(Clone::clone)
            .and_then(ServiceAccountAuth::new);
        match auth {
            Ok(auth) => Self::ServiceAccount(Box::new(auth)),
            Err(error) => {
                tracing::warn!("Google Sheets credentials unavailable: {}", error);
                Self::Unavailable(error)
            }
        }
    }

    async fn bearer(&self, client: &Client) -> Result<String> {
        match self {
            Self::ServiceAccount(auth) => auth.access_token(client).await,
            Self::Static(token) => Ok(token.clone()),
            Self::Unavailable(error) => Err(error.clone()),
        }
    }
}

impl fmt::Debug for SheetsAuth {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceAccount(auth) => formatter
                .debug_tuple("ServiceAccount")
                .field(&auth.client_email)
                .finish(),
            Self::Static(_) => formatter.debug_tuple("Static").field(&"[REDACTED]").finish(),
            Self::Unavailable(error) => formatter.debug_tuple("Unavailable").field(error).finish(),
        }
    }
}

/// Signs JWT assertions and exchanges them for OAuth access tokens.
pub struct ServiceAccountAuth {
    client_email: String,
    private_key_id: Option<String>,
    token_uri: String,
    key: EncodingKey,
    cache: RwLock<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at > now + TOKEN_EXPIRY_SKEW_SECS
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

impl ServiceAccountAuth {
    pub fn new(credentials: &ServiceAccountCredentials) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes()).map_err(|error| {
            SyncError::authentication(format!("invalid GOOGLE_PRIVATE_KEY: {}", sanitize(&error)))
        })?;

        Ok(Self {
            client_email: credentials.client_email.clone(),
            private_key_id: credentials.private_key_id.clone(),
            token_uri: credentials.token_uri.clone(),
            key,
            cache: RwLock::new(None),
        })
    }

    async fn access_token(&self, client: &Client) -> Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(token) = cache.as_ref() {
                if token.is_fresh(Utc::now().timestamp()) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(token) = cache.as_ref() {
            if token.is_fresh(Utc::now().timestamp()) {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.exchange_assertion(client).await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    fn sign_assertion(&self, now: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.private_key_id);
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        encode(&header, &claims, &self.key).map_err(|error| {
            SyncError::authentication(format!("could not sign JWT assertion: {}", sanitize(&error)))
        })
    }

    async fn exchange_assertion(&self, client: &Client) -> Result<CachedToken> {
        let now = Utc::now().timestamp();
        let assertion = self.sign_assertion(now)?;

        let response = client
            .post(&self.token_uri)
            .header("Accept", "application/json")
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await
            .map_err(|error| {
                SyncError::authentication(format!("token request failed: {}", sanitize(&error)))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::authentication(parse_oauth_error(status, &body)));
        }

        let payload = response.json::<TokenResponse>().await.map_err(|error| {
            SyncError::authentication(format!("token response parse failed: {}", sanitize(&error)))
        })?;
        if payload.access_token.trim().is_empty() {
            return Err(SyncError::authentication(
                "token endpoint returned an empty access token",
            ));
        }

        tracing::debug!(client_email = %self.client_email, "Minted Google Sheets access token");
        Ok(CachedToken {
            access_token: payload.access_token,
            expires_at: now + payload.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Row],
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: Option<String>,
    status: Option<String>,
}

#[derive(Clone, Debug)]
pub struct GoogleSheetsClient {
    api_url: String,
    client: Client,
    auth: Arc<SheetsAuth>,
}

impl GoogleSheetsClient {
    pub fn new(api_url: &str, auth: SheetsAuth) -> Result<Self> {
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !is_http_url(&api_url) {
            return Err(SyncError::backend(
                "Google Sheets API URL must include http:// or https://",
            ));
        }

        Ok(Self {
            api_url,
            client: Client::builder()
                .build()
                .map_err(|error| SyncError::backend(sanitize(&error)))?,
            auth: Arc::new(auth),
        })
    }

    pub fn from_settings(settings: &SyncSettings) -> Result<Self> {
        Self::new(&settings.sheets_api_url, SheetsAuth::from_settings(settings))
    }

    fn spreadsheet_url(&self, spreadsheet: &SpreadsheetId) -> String {
        format!(
            "{}/v4/spreadsheets/{}",
            self.api_url,
            urlencoding::encode(spreadsheet.as_str())
        )
    }

    fn values_url(&self, spreadsheet: &SpreadsheetId, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(spreadsheet),
            urlencoding::encode(range)
        )
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        let token = self.auth.bearer(&self.client).await?;
        let response = request
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| {
                SyncError::backend(format!("Google Sheets {operation} failed: {}", sanitize(&error)))
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = format!(
            "Google Sheets {operation} failed: {}",
            parse_google_error(status, &body)
        );
        if status == StatusCode::UNAUTHORIZED {
            Err(SyncError::authentication(message))
        } else {
            Err(SyncError::backend(message))
        }
    }
}

impl SpreadsheetStore for GoogleSheetsClient {
    async fn values_get(&self, spreadsheet: &SpreadsheetId, range: &str) -> Result<Vec<Row>> {
        let request = self.client.get(self.values_url(spreadsheet, range));
        let response = self.send(request, "read").await?;
        let payload = response.json::<ValueRangeResponse>().await.map_err(|error| {
            SyncError::backend(format!(
                "Google Sheets read returned invalid JSON: {}",
                sanitize(&error)
            ))
        })?;
        Ok(payload.values)
    }

    async fn values_update(
        &self,
        spreadsheet: &SpreadsheetId,
        range: &str,
        rows: &[Row],
    ) -> Result<()> {
        let body = ValueRangeBody {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let request = self
            .client
            .put(self.values_url(spreadsheet, range))
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        self.send(request, "write").await?;
        Ok(())
    }

    async fn values_clear(&self, spreadsheet: &SpreadsheetId, range: &str) -> Result<()> {
        let request = self
            .client
            .post(format!("{}:clear", self.values_url(spreadsheet, range)))
            .json(&serde_json::json!({}));
        self.send(request, "clear").await?;
        Ok(())
    }

    async fn metadata_get(&self, spreadsheet: &SpreadsheetId) -> Result<()> {
        let request = self
            .client
            .get(self.spreadsheet_url(spreadsheet))
            .query(&[("fields", "spreadsheetId")]);
        self.send(request, "metadata read").await?;
        Ok(())
    }

    async fn authorize(&self) -> Result<()> {
        self.auth.bearer(&self.client).await.map(|_| ())
    }
}

fn parse_google_error(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<GoogleErrorEnvelope>(body) {
        if let Some(message) = envelope.error.message {
            return match envelope.error.status {
                Some(code) => format!("{} ({code}, HTTP {})", message.trim(), status.as_u16()),
                None => format!("{} (HTTP {})", message.trim(), status.as_u16()),
            };
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} (HTTP {})", trimmed, status.as_u16())
    }
}

fn parse_oauth_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<OAuthErrorBody>(body) {
        match (payload.error, payload.error_description) {
            (Some(error), Some(description)) => {
                return format!("{error}: {description} (HTTP {})", status.as_u16());
            }
            (Some(error), None) => return format!("{error} (HTTP {})", status.as_u16()),
            _ => {}
        }
    }
    format!("token request failed with HTTP {}", status.as_u16())
}
