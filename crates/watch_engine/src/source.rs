use std::time::Duration;

use chrono::DateTime;
use futures_util::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT, COOKIE, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use watch_core::{Item, Session};
use watch_logging::watch_trace;

use crate::{FailureKind, FetchError, Page, PageCursor};

pub(crate) const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

const LOGIN_PATH_PREFIX: &str = "/accounts/login";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub query_hash: String,
    pub page_size: u32,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.instagram.com".to_string(),
            query_hash: "33ba35852cb50da46f5b5e889df7d159".to_string(),
            page_size: 50,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// One page of comments for a post, addressed by its short code.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        code: &str,
        after: Option<&str>,
        session: &Session,
    ) -> Result<Page, FetchError>;
}

/// Reads comment pages from a GraphQL listing endpoint.
#[derive(Debug, Clone)]
pub struct GraphqlPageSource {
    settings: FetchSettings,
}

impl GraphqlPageSource {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn page_url(&self, code: &str, after: Option<&str>) -> Result<reqwest::Url, FetchError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let mut url = reqwest::Url::parse(&format!("{base}/graphql/query/"))
            .map_err(|err| FetchError::new(FailureKind::Network, format!("bad base url: {err}")))?;
        let variables = json!({
            "shortcode": code,
            "after": after.unwrap_or_default(),
            "first": self.settings.page_size,
        });
        url.query_pairs_mut()
            .append_pair("query_hash", &self.settings.query_hash)
            .append_pair("variables", &variables.to_string());
        Ok(url)
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl PageSource for GraphqlPageSource {
    async fn fetch_page(
        &self,
        code: &str,
        after: Option<&str>,
        session: &Session,
    ) -> Result<Page, FetchError> {
        let url = self.page_url(code, after)?;
        let cookie = HeaderValue::from_str(session.cookie())
            .map_err(|_| FetchError::auth_expired("session cookie is not a valid header value"))?;
        let client = self.build_client()?;

        let response = client
            .get(url)
            .header(ACCEPT, "*/*")
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(FetchError::auth_expired(format!("upstream answered {status}")));
        }
        if response.url().path().starts_with(LOGIN_PATH_PREFIX) {
            return Err(FetchError::auth_expired("redirected to the login page"));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = self.read_body(response).await?;
        watch_trace!("page for {} after {:?}: {} bytes", code, after, body.len());
        parse_page(&body)
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<GraphqlData>,
    #[serde(default)]
    require_login: bool,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlData {
    shortcode_media: Option<ShortcodeMedia>,
}

#[derive(Debug, Deserialize)]
struct ShortcodeMedia {
    edge_media_to_comment: CommentConnection,
}

#[derive(Debug, Deserialize)]
struct CommentConnection {
    #[serde(default)]
    edges: Vec<CommentEdge>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct CommentEdge {
    node: CommentNode,
}

#[derive(Debug, Deserialize)]
struct CommentNode {
    id: String,
    text: String,
    created_at: i64,
    owner: CommentOwner,
}

#[derive(Debug, Deserialize)]
struct CommentOwner {
    id: String,
    username: String,
    #[serde(default)]
    profile_pic_url: String,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

fn parse_page(body: &[u8]) -> Result<Page, FetchError> {
    let response: GraphqlResponse = serde_json::from_slice(body)
        .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;

    if response.require_login || response.message.as_deref() == Some("login_required") {
        return Err(FetchError::auth_expired("upstream requires login"));
    }

    let media = response
        .data
        .and_then(|data| data.shortcode_media)
        .ok_or_else(|| FetchError::new(FailureKind::Decode, "post not found or not visible"))?;
    let connection = media.edge_media_to_comment;

    let items = connection
        .edges
        .into_iter()
        .map(|edge| node_to_item(edge.node))
        .collect::<Result<Vec<_>, _>>()?;

    let next = match (connection.page_info.has_next_page, connection.page_info.end_cursor) {
        (true, Some(cursor)) if !cursor.is_empty() => PageCursor::next(cursor),
        (true, _) => PageCursor {
            end_cursor: None,
            has_more: true,
        },
        (false, _) => PageCursor::end(),
    };

    Ok(Page { items, next })
}

fn node_to_item(node: CommentNode) -> Result<Item, FetchError> {
    let created_at = DateTime::from_timestamp(node.created_at, 0).ok_or_else(|| {
        FetchError::new(
            FailureKind::Decode,
            format!("comment {} has out-of-range created_at {}", node.id, node.created_at),
        )
    })?;
    Ok(Item {
        id: node.id,
        text: node.text,
        created_at,
        author_id: node.owner.id,
        author_handle: node.owner.username,
        author_avatar_url: node.owner.profile_pic_url,
    })
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
