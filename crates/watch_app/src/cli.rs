use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use watch_core::{Credentials, Session, DEFAULT_ITEM_CAP, DEFAULT_TEMPLATE};

use crate::env_cache::CachedEnv;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Watch a post for new comments and message each commenter once", long_about = None)]
pub struct Args {
    #[arg(short, long, env = "WATCH_USERNAME")]
    pub username: Option<String>,

    #[arg(short, long, env = "WATCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Post to monitor, e.g. https://www.instagram.com/p/<code>/
    #[arg(long, env = "WATCH_URL")]
    pub url: Option<String>,

    /// Session cookie to start with instead of logging in.
    #[arg(long, env = "WATCH_SESSION", hide_env_values = true)]
    pub session_cookie: Option<String>,

    /// Load username, password, session and URL from the env cache.
    #[arg(long)]
    pub use_cached_env: bool,

    #[arg(long, default_value = "env_cache.ron")]
    pub env_cache: PathBuf,

    /// Known-comments file.
    #[arg(long, default_value = "comments.json")]
    pub store: PathBuf,

    #[arg(long, default_value_t = 10_000)]
    pub poll_interval_ms: u64,

    #[arg(long, default_value_t = DEFAULT_ITEM_CAP)]
    pub item_cap: usize,

    #[arg(long, default_value_t = 50)]
    pub page_size: u32,

    #[arg(long, default_value_t = 1_000)]
    pub page_delay_ms: u64,

    /// Give up on a cycle's fetch phase after this many seconds.
    #[arg(long)]
    pub cycle_deadline_secs: Option<u64>,

    #[arg(long, default_value = "https://www.instagram.com")]
    pub base_url: String,

    /// POST notifications here as JSON instead of only logging them.
    #[arg(long)]
    pub webhook_url: Option<String>,

    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    pub message_template: String,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn cycle_deadline(&self) -> Option<Duration> {
        self.cycle_deadline_secs.map(Duration::from_secs)
    }
}

/// What the binary needs before the loop starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupConfig {
    pub credentials: Credentials,
    pub url: String,
    /// `None` means log in once before monitoring.
    pub session: Option<Session>,
}

/// Merges flags with the env cache. Explicit flags win over cached values.
pub fn resolve(args: &Args, cached: Option<CachedEnv>) -> Result<StartupConfig> {
    let explicit_session = args.session_cookie.clone().map(Session::new);

    if args.use_cached_env {
        let Some(cached) = cached else {
            bail!(
                "No cached environment found at {:?}. Run once with --username, --password and --url.",
                args.env_cache
            );
        };
        let Some(url) = args.url.clone().or(cached.url) else {
            bail!("No URL provided and no cached URL found.");
        };
        let credentials = Credentials::new(
            args.username.clone().or(cached.username).unwrap_or_default(),
            args.password.clone().or(cached.password).unwrap_or_default(),
        );
        let session = explicit_session.or(cached.session_cookie.map(Session::new));
        return Ok(StartupConfig {
            credentials,
            url,
            session,
        });
    }

    let (Some(username), Some(password), Some(url)) =
        (args.username.clone(), args.password.clone(), args.url.clone())
    else {
        bail!("Please provide username, password and post URL (or use --use-cached-env).");
    };
    Ok(StartupConfig {
        credentials: Credentials::new(username, password),
        url,
        session: explicit_session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["comment-watch"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("args parse")
    }

    fn cached() -> CachedEnv {
        CachedEnv {
            username: Some("cached_user".into()),
            password: Some("cached_pw".into()),
            session_cookie: Some("sessionid=cached".into()),
            url: Some("https://www.instagram.com/p/cached/".into()),
        }
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let args = args(&["--use-cached-env"]);
        assert_eq!(args.poll_interval(), Duration::from_secs(10));
        assert_eq!(args.item_cap, 100);
        assert_eq!(args.page_delay(), Duration::from_secs(1));
        assert_eq!(args.cycle_deadline(), None);
        assert_eq!(args.message_template, DEFAULT_TEMPLATE);
    }

    #[test]
    fn fresh_start_requires_credentials_and_url() {
        let err = resolve(&args(&["--username", "a", "--url", "x"]), None).unwrap_err();
        assert!(err.to_string().contains("Please provide"));
    }

    #[test]
    fn fresh_start_logs_in_unless_a_cookie_is_given() {
        let config = resolve(
            &args(&["-u", "alice", "-p", "pw", "--url", "https://www.instagram.com/p/x/"]),
            None,
        )
        .unwrap();
        assert_eq!(config.credentials, Credentials::new("alice", "pw"));
        assert_eq!(config.session, None);
    }

    #[test]
    fn cached_mode_without_cache_fails() {
        let err = resolve(&args(&["--use-cached-env"]), None).unwrap_err();
        assert!(err.to_string().contains("No cached environment"));
    }

    #[test]
    fn cached_mode_uses_cache_and_flag_url_overrides() {
        let config = resolve(
            &args(&["--use-cached-env", "--url", "https://www.instagram.com/p/flag/"]),
            Some(cached()),
        )
        .unwrap();
        assert_eq!(config.url, "https://www.instagram.com/p/flag/");
        assert_eq!(config.credentials, Credentials::new("cached_user", "cached_pw"));
        assert_eq!(config.session, Some(Session::new("sessionid=cached")));
    }

    #[test]
    fn cached_mode_without_any_url_fails() {
        let mut cache = cached();
        cache.url = None;
        let err = resolve(&args(&["--use-cached-env"]), Some(cache)).unwrap_err();
        assert!(err.to_string().contains("No URL"));
    }
}
