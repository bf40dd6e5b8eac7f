//! Cached startup values so later runs can skip flags and the initial login.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use watch_core::{Credentials, Session};
use watch_engine::{AtomicFileWriter, SessionError, SessionProvider};
use watch_logging::{watch_debug, watch_warn};

#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CachedEnv {
    pub username: Option<String>,
    pub password: Option<String>,
    pub session_cookie: Option<String>,
    pub url: Option<String>,
}

impl CachedEnv {
    pub fn new(credentials: &Credentials, session: &Session, url: &str) -> Self {
        Self {
            username: Some(credentials.username.clone()),
            password: Some(credentials.password.clone()),
            session_cookie: Some(session.cookie().to_string()),
            url: Some(url.to_string()),
        }
    }
}

impl fmt::Debug for CachedEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedEnv")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("session_cookie", &self.session_cookie.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url)
            .finish()
    }
}

/// `Ok(None)` when nothing has been cached yet.
pub fn load(path: &Path) -> Result<Option<CachedEnv>> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read env cache {:?}", path))
        }
    };
    let cached = ron::from_str(&content)
        .with_context(|| format!("Failed to parse env cache {:?}", path))?;
    Ok(Some(cached))
}

pub fn save(path: &Path, cached: &CachedEnv) -> Result<()> {
    let pretty = ron::ser::PrettyConfig::new();
    let content =
        ron::ser::to_string_pretty(cached, pretty).context("Failed to serialize env cache")?;
    AtomicFileWriter::new(path)
        .write(&content)
        .with_context(|| format!("Failed to write env cache {:?}", path))
}

/// Writes every refreshed session back to the env cache.
pub struct CachingSessionProvider {
    inner: Arc<dyn SessionProvider>,
    path: PathBuf,
    url: String,
}

impl CachingSessionProvider {
    pub fn new(inner: Arc<dyn SessionProvider>, path: PathBuf, url: String) -> Self {
        Self { inner, path, url }
    }
}

#[async_trait::async_trait]
impl SessionProvider for CachingSessionProvider {
    async fn refresh(&self, credentials: &Credentials) -> Result<Session, SessionError> {
        let session = self.inner.refresh(credentials).await?;
        match save(&self.path, &CachedEnv::new(credentials, &session, &self.url)) {
            Ok(()) => watch_debug!("Cached refreshed session in {:?}", self.path),
            Err(err) => watch_warn!("Could not cache refreshed session: {:#}", err),
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FixedSessions;

    #[async_trait::async_trait]
    impl SessionProvider for FixedSessions {
        async fn refresh(&self, _credentials: &Credentials) -> Result<Session, SessionError> {
            Ok(Session::new("sessionid=new"))
        }
    }

    #[test]
    fn missing_cache_is_none() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load(&temp.path().join("env_cache.ron")).unwrap(), None);
    }

    #[test]
    fn saved_cache_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env_cache.ron");
        let cached = CachedEnv::new(
            &Credentials::new("alice", "pw"),
            &Session::new("sessionid=1"),
            "https://www.instagram.com/p/abc/",
        );

        save(&path, &cached).unwrap();
        assert_eq!(load(&path).unwrap(), Some(cached));
    }

    #[test]
    fn corrupt_cache_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env_cache.ron");
        fs::write(&path, "(username: ").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cached = CachedEnv::new(
            &Credentials::new("alice", "hunter2"),
            &Session::new("sessionid=topsecret"),
            "https://www.instagram.com/p/abc/",
        );
        let shown = format!("{cached:?}");
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("topsecret"));
    }

    #[tokio::test]
    async fn refreshed_sessions_are_written_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env_cache.ron");
        let provider = CachingSessionProvider::new(
            Arc::new(FixedSessions),
            path.clone(),
            "https://www.instagram.com/p/abc/".to_string(),
        );

        let session = provider
            .refresh(&Credentials::new("alice", "pw"))
            .await
            .unwrap();

        assert_eq!(session, Session::new("sessionid=new"));
        let cached = load(&path).unwrap().expect("cache written");
        assert_eq!(cached.session_cookie.as_deref(), Some("sessionid=new"));
        assert_eq!(cached.username.as_deref(), Some("alice"));
    }
}
