//! IGDB API client.
//!
//! IGDB authenticates through Twitch's client-credentials flow. Queries use
//! the Apicalypse text syntax sent as a POST body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::{AssetKind, AssetRef, GameCategory, GameStatus, SearchCandidate};
use super::{original_image_url, CatalogError, GameCatalog};
use crate::metrics::{record_request, EXTERNAL_SERVICE_DURATION};

/// Fields requested for every search. Cover and screenshot image ids are
/// expanded inline so no detail fetch is normally needed.
const SEARCH_FIELDS: &str = "name,first_release_date,category,status,summary,storyline,url,\
rating,genres.name,platforms.name,cover.image_id,screenshots.image_id";

/// Tokens are refreshed this long before they actually expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// IGDB client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgdbConfig {
    /// Twitch application client id.
    pub client_id: String,
    /// Twitch application client secret.
    pub client_secret: String,
    /// API base URL (default: https://api.igdb.com/v4).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// OAuth token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Image host base URL.
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    /// Maximum results requested per search.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.igdb.com/v4".to_string()
}

fn default_token_url() -> String {
    "https://id.twitch.tv/oauth2/token".to_string()
}

fn default_image_base_url() -> String {
    "https://images.igdb.com/igdb/image/upload".to_string()
}

fn default_search_limit() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

impl IgdbConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: default_base_url(),
            token_url: default_token_url(),
            image_base_url: default_image_base_url(),
            search_limit: default_search_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// IGDB API client.
pub struct IgdbClient {
    client: Client,
    config: IgdbConfig,
    token: RwLock<Option<AccessToken>>,
}

impl IgdbClient {
    /// Create a new IGDB client. No network traffic happens until the first
    /// request.
    pub fn new(config: IgdbConfig) -> Result<Self, CatalogError> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(CatalogError::NotConfigured(
                "IGDB client id and secret are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            token: RwLock::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, CatalogError> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut guard = self.token.write().await;
        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    async fn request_token(&self) -> Result<AccessToken, CatalogError> {
        debug!("Requesting IGDB access token");

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::AuthFailed(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse token response: {}", e))
        })?;

        info!(expires_in = token.expires_in, "Obtained IGDB access token");

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    /// POST an Apicalypse body to an endpoint, refreshing the token once on 401.
    async fn query<T>(&self, endpoint: &str, body: String) -> Result<T, CatalogError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let started = Instant::now();

        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            let token = self.access_token().await?;
            let response = self
                .client
                .post(&url)
                .header("Client-ID", &self.config.client_id)
                .bearer_auth(&token)
                .body(body.clone())
                .send()
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt == 1 {
                warn!("IGDB rejected access token, refreshing");
                self.invalidate_token().await;
                continue;
            }
            break response;
        };

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["igdb", endpoint])
            .observe(started.elapsed().as_secs_f64());

        let status = response.status();
        record_request("igdb", endpoint, status.is_success());
        if status == StatusCode::UNAUTHORIZED {
            return Err(CatalogError::AuthFailed("access token rejected".to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse {} response: {}", endpoint, e))
        })
    }
}

#[async_trait]
impl GameCatalog for IgdbClient {
    fn name(&self) -> &str {
        "igdb"
    }

    async fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SearchCandidate>, CatalogError> {
        debug!(query, limit, "IGDB game search");

        let games: Vec<IgdbGame> = self
            .query("games", search_body(query, limit))
            .await?;

        Ok(games.into_iter().map(SearchCandidate::from).collect())
    }

    async fn resolve_image_id(&self, asset: &AssetRef) -> Result<String, CatalogError> {
        let endpoint = match asset.kind {
            AssetKind::Cover => "covers",
            AssetKind::Screenshot => "screenshots",
        };
        debug!(endpoint, id = asset.id, "Resolving IGDB image id");

        let records: Vec<IgdbImageRecord> = self
            .query(endpoint, format!("fields image_id; where id = {};", asset.id))
            .await?;

        records
            .into_iter()
            .next()
            .and_then(|r| r.image_id)
            .ok_or_else(|| CatalogError::NotFound(format!("{} {}", endpoint, asset.id)))
    }

    fn image_url(&self, image_id: &str) -> String {
        original_image_url(&self.config.image_base_url, image_id)
    }
}

/// Build the Apicalypse search body, escaping quotes in the query.
fn search_body(query: &str, limit: u32) -> String {
    let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "search \"{}\"; fields {}; limit {};",
        escaped, SEARCH_FIELDS, limit
    )
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_lifetime")]
    expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    first_release_date: Option<i64>,
    #[serde(default)]
    category: Option<u32>,
    #[serde(default)]
    status: Option<u32>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    storyline: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    genres: Vec<IgdbNamedField>,
    #[serde(default)]
    platforms: Vec<IgdbNamedField>,
    #[serde(default)]
    cover: Option<IgdbImageField>,
    #[serde(default)]
    screenshots: Vec<IgdbImageField>,
}

/// Image fields come back either expanded or as a bare id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IgdbImageField {
    Expanded {
        id: u64,
        #[serde(default)]
        image_id: Option<String>,
    },
    Id(u64),
}

impl IgdbImageField {
    fn into_ref(self, kind: AssetKind) -> AssetRef {
        match self {
            Self::Expanded { id, image_id } => AssetRef { kind, id, image_id },
            Self::Id(id) => AssetRef {
                kind,
                id,
                image_id: None,
            },
        }
    }
}

/// Genre and platform references, expanded to their names when requested.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IgdbNamedField {
    Expanded { name: String },
    Id(u64),
}

fn names(fields: Vec<IgdbNamedField>) -> Vec<String> {
    fields
        .into_iter()
        .filter_map(|field| match field {
            IgdbNamedField::Expanded { name } => Some(name),
            IgdbNamedField::Id(_) => None,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct IgdbImageRecord {
    #[serde(default)]
    image_id: Option<String>,
}

impl From<IgdbGame> for SearchCandidate {
    fn from(game: IgdbGame) -> Self {
        Self {
            id: game.id,
            name: game.name,
            first_release_date: game.first_release_date.unwrap_or(0),
            category: game
                .category
                .map(GameCategory::from_code)
                .unwrap_or_default(),
            status: game.status.map(GameStatus::from_code).unwrap_or_default(),
            summary: game.summary.unwrap_or_default(),
            storyline: game.storyline,
            url: game.url,
            rating: game.rating,
            genres: names(game.genres),
            platforms: names(game.platforms),
            cover: game.cover.map(|c| c.into_ref(AssetKind::Cover)),
            screenshots: game
                .screenshots
                .into_iter()
                .map(|s| s.into_ref(AssetKind::Screenshot))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_credentials() {
        let result = IgdbClient::new(IgdbConfig::new("", ""));
        assert!(matches!(result, Err(CatalogError::NotConfigured(_))));
    }

    #[test]
    fn test_search_body_escapes_quotes() {
        let body = search_body(r#"The "Witcher" 3"#, 10);
        assert!(body.starts_with(r#"search "The \"Witcher\" 3";"#));
        assert!(body.contains("cover.image_id"));
        assert!(body.contains("genres.name,platforms.name"));
        assert!(body.ends_with("limit 10;"));
    }

    #[test]
    fn test_parse_expanded_game() {
        let json = r#"[{
            "id": 1877,
            "name": "Cyberpunk 2077",
            "first_release_date": 1607558400,
            "category": 0,
            "status": 0,
            "summary": "An open-world action RPG.",
            "url": "https://www.igdb.com/games/cyberpunk-2077",
            "rating": 78.4,
            "genres": [{"id": 12, "name": "Role-playing (RPG)"}, {"id": 5, "name": "Shooter"}],
            "platforms": [{"id": 6, "name": "PC (Microsoft Windows)"}],
            "cover": {"id": 81921, "image_id": "co1rft"},
            "screenshots": [{"id": 1, "image_id": "sc1"}, {"id": 2, "image_id": "sc2"}]
        }]"#;
        let games: Vec<IgdbGame> = serde_json::from_str(json).unwrap();
        let candidate = SearchCandidate::from(games.into_iter().next().unwrap());

        assert_eq!(candidate.id, 1877);
        assert_eq!(candidate.category, GameCategory::MainGame);
        assert_eq!(candidate.status, GameStatus::Released);
        assert_eq!(candidate.cover, Some(AssetRef::cover(81921, "co1rft")));
        assert_eq!(candidate.screenshots.len(), 2);
        assert_eq!(candidate.screenshots[1].image_id.as_deref(), Some("sc2"));
        assert_eq!(candidate.rating, Some(78.4));
        assert_eq!(candidate.genres, vec!["Role-playing (RPG)", "Shooter"]);
        assert_eq!(candidate.platforms, vec!["PC (Microsoft Windows)"]);
    }

    #[test]
    fn test_parse_unexpanded_references() {
        let json = r#"[{"id": 5, "name": "Thing", "cover": 44, "screenshots": [45, 46], "genres": [12]}]"#;
        let games: Vec<IgdbGame> = serde_json::from_str(json).unwrap();
        let candidate = SearchCandidate::from(games.into_iter().next().unwrap());

        let cover = candidate.cover.unwrap();
        assert_eq!(cover.kind, AssetKind::Cover);
        assert_eq!(cover.id, 44);
        assert!(cover.image_id.is_none());
        assert_eq!(candidate.screenshots[0].kind, AssetKind::Screenshot);
        assert_eq!(candidate.first_release_date, 0);
        assert_eq!(candidate.status, GameStatus::Unknown);
        assert!(candidate.genres.is_empty());
        assert!(candidate.rating.is_none());
    }

    #[test]
    fn test_image_url_uses_configured_host() {
        let mut config = IgdbConfig::new("id", "secret");
        config.image_base_url = "https://img.test/upload".to_string();
        let client = IgdbClient::new(config).unwrap();
        assert_eq!(
            client.image_url("sc1"),
            "https://img.test/upload/t_original/sc1.webp"
        );
    }
}
