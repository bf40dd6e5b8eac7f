use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use watch_core::{MessageTemplate, ResourceRef};
use watch_engine::{
    Collaborators, FetchSettings, GraphqlPageSource, LogNotifier, LoginSessionProvider,
    LoginSettings, MonitorLoop, MonitorSettings, Notifier, PaginatedFetcher, SeenItemStore,
    SessionProvider, WebhookNotifier,
};
use watch_logging::{watch_info, watch_warn, LevelFilter};

use crate::cli::{self, Args};
use crate::env_cache::{self, CachedEnv, CachingSessionProvider};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

pub async fn run(args: Args) -> Result<()> {
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    watch_logging::initialize(level, args.log_file.as_deref());

    let cached = if args.use_cached_env {
        env_cache::load(&args.env_cache)?
    } else {
        None
    };
    let from_cache = cached.is_some();
    let config = cli::resolve(&args, cached)?;
    if from_cache {
        watch_info!("Loaded cached environment variables and URL.");
    }

    // Fail on a malformed reference before logging in.
    ResourceRef::parse(&config.url).context("Refusing to start")?;

    let login: Arc<dyn SessionProvider> = Arc::new(LoginSessionProvider::new(LoginSettings {
        base_url: args.base_url.clone(),
        ..LoginSettings::default()
    }));
    let sessions: Arc<dyn SessionProvider> = Arc::new(CachingSessionProvider::new(
        login.clone(),
        args.env_cache.clone(),
        config.url.clone(),
    ));

    let session = match config.session.clone() {
        Some(session) if !session.is_empty() => session,
        _ => {
            let session = login
                .refresh(&config.credentials)
                .await
                .context("Initial login failed")?;
            env_cache::save(
                &args.env_cache,
                &CachedEnv::new(&config.credentials, &session, &config.url),
            )?;
            watch_info!(
                "Arguments cached. To use the cached arguments next time, run with --use-cached-env"
            );
            session
        }
    };

    let source = GraphqlPageSource::new(FetchSettings {
        base_url: args.base_url.clone(),
        page_size: args.page_size,
        ..FetchSettings::default()
    });
    let notifier: Arc<dyn Notifier> = match &args.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url.as_str(), WEBHOOK_TIMEOUT)
                .context("Failed to set up webhook notifier")?,
        ),
        None => {
            watch_warn!("No --webhook-url given; notifications are only logged.");
            Arc::new(LogNotifier)
        }
    };
    let collaborators = Collaborators {
        fetcher: PaginatedFetcher::new(Arc::new(source)).with_page_delay(args.page_delay()),
        sessions,
        notifier,
    };

    let mut monitor = MonitorLoop::new(
        &config.url,
        SeenItemStore::new(&args.store),
        collaborators,
        config.credentials,
        session,
        MonitorSettings {
            poll_interval: args.poll_interval(),
            item_cap: args.item_cap,
            cycle_deadline: args.cycle_deadline(),
            template: MessageTemplate::new(args.message_template.as_str()),
        },
    )
    .context("Failed to start monitor")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watch_info!("Shutdown requested; finishing the current cycle.");
            on_signal.cancel();
        }
    });

    let cycles = monitor.run_until(cancel).await;
    watch_info!("Ran {} cycles; {} comments known.", cycles, monitor.known().len());
    Ok(())
}
