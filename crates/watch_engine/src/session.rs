use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use serde::Deserialize;
use thiserror::Error;
use watch_core::{Credentials, Session};
use watch_logging::{watch_debug, watch_info};

use crate::source::DEFAULT_USER_AGENT;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("credentials are not configured")]
    CredentialsMissing,
    #[error("login rejected: {0}")]
    AuthFailure(String),
    #[error("login request failed: {0}")]
    Network(String),
}

/// Produces a fresh session. Called only after the upstream rejects one.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    async fn refresh(&self, credentials: &Credentials) -> Result<Session, SessionError>;
}

#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub base_url: String,
    pub login_page_path: String,
    pub login_path: String,
    pub session_cookie: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.instagram.com".to_string(),
            login_page_path: "/accounts/login/".to_string(),
            login_path: "/accounts/login/ajax/".to_string(),
            session_cookie: "sessionid".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Logs in through the web form endpoints. The session is the cookie header
/// the site would receive afterwards.
#[derive(Debug, Clone)]
pub struct LoginSessionProvider {
    settings: LoginSettings,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    authenticated: bool,
    message: Option<String>,
}

impl LoginSessionProvider {
    pub fn new(settings: LoginSettings) -> Self {
        Self { settings }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn build_client(&self, jar: Arc<Jar>) -> Result<reqwest::Client, SessionError> {
        reqwest::Client::builder()
            .timeout(self.settings.request_timeout)
            .cookie_provider(jar)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| SessionError::Network(err.to_string()))
    }
}

#[async_trait::async_trait]
impl SessionProvider for LoginSessionProvider {
    async fn refresh(&self, credentials: &Credentials) -> Result<Session, SessionError> {
        if !credentials.is_complete() {
            return Err(SessionError::CredentialsMissing);
        }
        let site = reqwest::Url::parse(&self.settings.base_url)
            .map_err(|err| SessionError::Network(format!("bad base url: {err}")))?;
        let jar = Arc::new(Jar::default());
        let client = self.build_client(jar.clone())?;

        let login_page = self.endpoint(&self.settings.login_page_path);
        client
            .get(&login_page)
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .send()
            .await
            .map_err(|err| SessionError::Network(err.to_string()))?;

        let csrf = cookie_header(&jar, &site)
            .and_then(|header| cookie_value(&header, "csrftoken").map(str::to_string))
            .unwrap_or_default();
        watch_debug!("login page issued a csrf token: {}", !csrf.is_empty());

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", &credentials.username)
            .append_pair(
                "enc_password",
                &format!(
                    "#PWD_INSTAGRAM_BROWSER:0:{}:{}",
                    Utc::now().timestamp(),
                    credentials.password
                ),
            )
            .append_pair("queryParams", "{}")
            .append_pair("optIntoOneTap", "false")
            .finish();

        let response = client
            .post(self.endpoint(&self.settings.login_path))
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(REFERER, login_page.as_str())
            .header("x-csrftoken", csrf)
            .header("x-requested-with", "XMLHttpRequest")
            .body(body)
            .send()
            .await
            .map_err(|err| SessionError::Network(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| SessionError::Network(err.to_string()))?;
        if !status.is_success() {
            return Err(SessionError::AuthFailure(format!("http status {status}")));
        }
        let outcome: LoginResponse = serde_json::from_slice(&bytes)
            .map_err(|err| SessionError::AuthFailure(format!("unreadable login response: {err}")))?;
        if !outcome.authenticated {
            let reason = outcome.message.unwrap_or_else(|| "not authenticated".to_string());
            return Err(SessionError::AuthFailure(reason));
        }

        let cookies = cookie_header(&jar, &site).unwrap_or_default();
        if cookie_value(&cookies, &self.settings.session_cookie).is_none() {
            return Err(SessionError::AuthFailure(format!(
                "no {} cookie issued",
                self.settings.session_cookie
            )));
        }

        watch_info!("Logged in as {}", credentials.username);
        Ok(Session::new(cookies))
    }
}

/// The `Cookie` header the jar would send to `site`.
fn cookie_header(jar: &Jar, site: &reqwest::Url) -> Option<String> {
    jar.cookies(site)
        .and_then(|value| value.to_str().ok().map(str::to_string))
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
