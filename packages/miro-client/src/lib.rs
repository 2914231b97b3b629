//! Pure Miro REST API client.
//!
//! A minimal client for the Miro v2 API. Supports listing organization
//! members and boards with cursor pagination, bounded retries on
//! throttling and transport failures, and typed errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use miro_client::{fetch_all, MemberQuery, MiroClient, RetryPolicy};
//!
//! let client = MiroClient::new("your-api-token");
//!
//! let source = client.members("3458764517517818867", MemberQuery::default());
//! let members = fetch_all(source, RetryPolicy::default()).await?;
//! for member in &members {
//!     println!("{} {}", member.id, member.email.as_deref().unwrap_or("-"));
//! }
//! ```

pub mod error;
pub mod mock;
pub mod pagination;
pub mod retry;
pub mod types;

pub use error::{MiroError, PageError, Result};
pub use pagination::{fetch_all, PageSource, PageStream, Paginator};
pub use retry::RetryPolicy;
pub use types::{Board, BoardOwner, Cursor, Member, MemberQuery, Page, Record};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use types::{BoardsResponse, MembersResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.miro.com/v2";

/// Page size used by the boards listing.
pub const DEFAULT_BOARDS_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct MiroClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl MiroClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MiroError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Organization members, as a page source.
    pub fn members(&self, org_id: impl Into<String>, query: MemberQuery) -> MembersSource {
        MembersSource {
            client: self.clone(),
            org_id: org_id.into(),
            query,
        }
    }

    /// Boards visible to the token, as a page source.
    pub fn boards(&self, limit: u32) -> BoardsSource {
        BoardsSource {
            client: self.clone(),
            limit,
        }
    }

    /// GET a JSON document, mapping status codes onto [`MiroError`].
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json")
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(MiroError::RateLimited { retry_after });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(MiroError::Auth {
                status: status.as_u16(),
                message: body,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MiroError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| MiroError::Malformed(e.to_string()))
    }
}

/// `GET /orgs/{org_id}/members`, paged by the `cursor` body field.
pub struct MembersSource {
    client: MiroClient,
    org_id: String,
    query: MemberQuery,
}

#[async_trait]
impl PageSource for MembersSource {
    type Item = Member;

    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<Page<Member>> {
        let url = format!("{}/orgs/{}/members", self.client.base_url, self.org_id);
        let params = self.query.to_params(cursor);

        tracing::debug!(org_id = %self.org_id, cursor = ?cursor.map(Cursor::as_str), "Fetching members page");
        let resp: MembersResponse = self.client.get_json(&url, &params).await?;
        Ok(Page::new(resp.data, resp.cursor))
    }

    fn name(&self) -> &str {
        "org_members"
    }
}

/// `GET /boards`, paged by following `links.next`.
pub struct BoardsSource {
    client: MiroClient,
    limit: u32,
}

#[async_trait]
impl PageSource for BoardsSource {
    type Item = Board;

    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<Page<Board>> {
        // The next link already carries offset and limit
        let resp: BoardsResponse = match cursor {
            Some(next) => self.client.get_json(next.as_str(), &[]).await?,
            None => {
                let url = format!("{}/boards", self.client.base_url);
                let params = [("limit", self.limit.clamp(1, 50).to_string())];
                self.client.get_json(&url, &params).await?
            }
        };

        let next = resp.links.and_then(|links| links.next);
        Ok(Page::new(resp.data, next))
    }

    fn name(&self) -> &str {
        "boards"
    }
}
