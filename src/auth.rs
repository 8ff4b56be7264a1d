use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Out-of-band redirect: Google shows the authorization code in the browser
/// and the operator pastes it into the console.
const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Tokens are treated as expired this long before their actual expiry so a
/// request never goes out with a token about to lapse mid-flight.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: ClientSecrets,
}

/// OAuth client registration, read from the `installed` section of a
/// downloaded `credentials.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let file: ClientSecretsFile = serde_json::from_str(&raw)?;
        Ok(file.installed)
    }
}

/// The credential as cached on disk between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Loads and saves the cached token at a fixed path.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// None when no token has been cached yet.
    pub fn load(&self) -> Result<Option<StoredToken>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save(&self, token: &StoredToken) -> Result<(), AppError> {
        std::fs::write(&self.path, serde_json::to_string_pretty(token)?)?;
        Ok(())
    }
}

/// Token endpoint response for both the code exchange and the refresh grant.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<&str>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            // A refresh grant usually omits the refresh token; keep the old one.
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(String::from)),
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
        }
    }
}

/// Acquire a usable credential at startup: cached if still valid, silently
/// refreshed if expired but refreshable, otherwise the interactive console
/// flow. Any failure here is fatal; the poller cannot run without it.
pub async fn acquire(
    secrets: &ClientSecrets,
    store: &TokenStore,
    http: &reqwest::Client,
) -> Result<StoredToken, AppError> {
    if let Some(cached) = store.load()? {
        if cached.is_valid(Utc::now()) {
            return Ok(cached);
        }
        if let Some(refresh) = cached.refresh_token.as_deref() {
            tracing::info!("Cached token expired, refreshing");
            let refreshed = refresh_grant(secrets, refresh, http).await?;
            store.save(&refreshed)?;
            return Ok(refreshed);
        }
    }

    let token = console_flow(secrets, http).await?;
    store.save(&token)?;
    Ok(token)
}

async fn refresh_grant(
    secrets: &ClientSecrets,
    refresh_token: &str,
    http: &reqwest::Client,
) -> Result<StoredToken, AppError> {
    let params = [
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let resp = http.post(&secrets.token_uri).form(&params).send().await?;
    if !resp.status().is_success() {
        return Err(AppError::Auth(format!(
            "token refresh failed with status {}",
            resp.status()
        )));
    }

    let body: TokenResponse = resp.json().await?;
    Ok(body.into_stored(Some(refresh_token)))
}

/// First-time authorization: print the consent URL, read the code the
/// operator pastes back, exchange it for tokens.
async fn console_flow(
    secrets: &ClientSecrets,
    http: &reqwest::Client,
) -> Result<StoredToken, AppError> {
    let url = consent_url(secrets)?;
    println!("Open this URL in your browser and authorize access:\n\n{url}\n");
    println!("Enter the authorization code:");

    let code = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .map_err(|e| AppError::Internal(format!("stdin reader task failed: {e}")))??;

    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::Auth("empty authorization code".to_string()));
    }

    let params = [
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", REDIRECT_URI),
        ("grant_type", "authorization_code"),
    ];

    let resp = http.post(&secrets.token_uri).form(&params).send().await?;
    if !resp.status().is_success() {
        return Err(AppError::Auth(format!(
            "code exchange failed with status {}",
            resp.status()
        )));
    }

    let body: TokenResponse = resp.json().await?;
    Ok(body.into_stored(None))
}

fn consent_url(secrets: &ClientSecrets) -> Result<String, AppError> {
    let url = reqwest::Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("scope", SCOPE),
            ("access_type", "offline"),
        ],
    )
    .map_err(|e| AppError::Auth(format!("invalid auth_uri: {e}")))?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        }
    }

    #[test]
    fn token_validity_respects_the_expiry_margin() {
        let now = Utc::now();
        let fresh = StoredToken {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: now + Duration::seconds(3600),
        };
        assert!(fresh.is_valid(now));

        let almost_expired = StoredToken {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: now + Duration::seconds(30),
        };
        assert!(!almost_expired.is_valid(now));
    }

    #[test]
    fn refresh_response_keeps_the_previous_refresh_token() {
        let resp = TokenResponse {
            access_token: "new-access".into(),
            refresh_token: None,
            expires_in: 3600,
        };
        let stored = resp.into_stored(Some("old-refresh"));
        assert_eq!(stored.access_token, "new-access");
        assert_eq!(stored.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[test]
    fn consent_url_carries_the_spreadsheets_scope() {
        let url = consent_url(&secrets()).unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("spreadsheets"));
    }

    #[test]
    fn token_store_roundtrips_through_disk() {
        let path = std::env::temp_dir().join(format!("gigwatch-token-{}.json", std::process::id()));
        let store = TokenStore::new(path.clone());

        assert!(store.load().unwrap().is_none());

        let token = StoredToken {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: Utc::now() + Duration::seconds(3600),
        };
        store.save(&token).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn client_secrets_parse_the_installed_section() {
        let raw = r#"{
            "installed": {
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "shh",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob", "http://localhost"]
            }
        }"#;
        let file: ClientSecretsFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.installed.client_id, "id.apps.googleusercontent.com");
        assert_eq!(file.installed.token_uri, "https://oauth2.googleapis.com/token");
    }
}
