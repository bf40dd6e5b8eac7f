use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use watch_core::{
    advance, diff_new, Credentials, CycleEffect, CycleFailure, CycleMsg, CycleOutcome,
    CycleReport, FetchCycle, InvalidReference, Item, ItemSet, MessageTemplate, ResourceRef,
    Session, DEFAULT_ITEM_CAP,
};
use watch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::{
    FailureKind, Notifier, PaginatedFetcher, SeenItemStore, SessionProvider, StoreError,
};

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub item_cap: usize,
    /// Upper bound on the fetch phase of a cycle, retries included.
    pub cycle_deadline: Option<Duration>,
    pub template: MessageTemplate,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            item_cap: DEFAULT_ITEM_CAP,
            cycle_deadline: None,
            template: MessageTemplate::default(),
        }
    }
}

/// The IO collaborators a monitor drives.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: PaginatedFetcher,
    pub sessions: Arc<dyn SessionProvider>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    InvalidReference(#[from] InvalidReference),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Polls one post forever and notifies once per newly seen comment.
///
/// Owns the known set and the current session; nothing else mutates them.
pub struct MonitorLoop {
    resource: ResourceRef,
    store: SeenItemStore,
    known: ItemSet,
    dirty: bool,
    collaborators: Collaborators,
    credentials: Credentials,
    session: Session,
    settings: MonitorSettings,
    cycles: u64,
}

struct Fetched {
    items: Vec<Item>,
    retries_used: u32,
}

impl MonitorLoop {
    /// Validates the reference and loads the known set before any network call.
    pub fn new(
        reference: &str,
        store: SeenItemStore,
        collaborators: Collaborators,
        credentials: Credentials,
        session: Session,
        settings: MonitorSettings,
    ) -> Result<Self, MonitorError> {
        let resource = ResourceRef::parse(reference)?;
        let known = store.load()?;
        Ok(Self {
            resource,
            store,
            known,
            dirty: false,
            collaborators,
            credentials,
            session,
            settings,
            cycles: 0,
        })
    }

    pub fn known(&self) -> &ItemSet {
        &self.known
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs until the process exits.
    pub async fn run(&mut self) {
        self.run_until(CancellationToken::new()).await;
    }

    /// Runs cycles separated by the poll interval until `cancel` fires.
    /// Cancellation is observed between cycles and during the sleep, never
    /// in the middle of a cycle. Returns the number of cycles run.
    pub async fn run_until(&mut self, cancel: CancellationToken) -> u64 {
        let started = self.cycles;
        watch_info!(
            "Monitoring comments on {} every {:?}",
            self.resource.url(),
            self.settings.poll_interval
        );
        while !cancel.is_cancelled() {
            let outcome = self.run_cycle().await;
            match &outcome {
                CycleOutcome::Failed(failure) => watch_error!(
                    "Cycle {} for {} failed: {}",
                    self.cycles,
                    self.resource,
                    failure
                ),
                CycleOutcome::Partial(_) => {
                    watch_warn!("Cycle {} for {}: {}", self.cycles, self.resource, outcome)
                }
                CycleOutcome::Success(_) => {
                    watch_debug!("Cycle {} for {}: {}", self.cycles, self.resource, outcome)
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
        watch_info!("Stopped monitoring {}", self.resource);
        self.cycles - started
    }

    /// One fetch, diff, notify, persist pass. Never panics on upstream or
    /// delivery failures; they are folded into the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;

        let deadline = self.settings.cycle_deadline;
        let fetched = match deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.fetch_with_retry())
                .await
                .unwrap_or(Err(CycleFailure::DeadlineExceeded {
                    secs: deadline.as_secs(),
                })),
            None => self.fetch_with_retry().await,
        };
        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(failure) => return CycleOutcome::Failed(failure),
        };

        let fresh = diff_new(&fetched.items, &self.known);
        let mut report = CycleReport {
            fetched: fetched.items.len(),
            new_items: fresh.len(),
            retries_used: fetched.retries_used,
            ..CycleReport::default()
        };

        if fresh.is_empty() {
            watch_info!("No new comments.");
        } else {
            watch_info!("New comments detected ({}):", fresh.len());
        }
        for item in &fresh {
            watch_info!("- {}: {}", item.author_handle, item.text);
            let message = self.settings.template.render(item);
            match self
                .collaborators
                .notifier
                .send(&item.author_handle, &message)
                .await
            {
                Ok(()) => report.notified += 1,
                Err(err) => {
                    report.delivery_failures += 1;
                    watch_error!(
                        "Notification for comment {} on {} failed: {}",
                        item.id,
                        self.resource,
                        err
                    );
                }
            }
        }

        // Seen once attempted; a failed delivery is not retried next cycle.
        if self.known.merge(fresh) > 0 {
            self.dirty = true;
        }
        if self.dirty {
            match self.store.save(&self.known) {
                Ok(()) => {
                    self.dirty = false;
                    report.persisted = true;
                }
                Err(err) => {
                    watch_error!(
                        "Saving {} known comments to {:?} failed: {}",
                        self.known.len(),
                        self.store.path(),
                        err
                    );
                    return CycleOutcome::Partial(report);
                }
            }
        }
        CycleOutcome::Success(report)
    }

    async fn fetch_with_retry(&mut self) -> Result<Fetched, CycleFailure> {
        let mut cycle = FetchCycle::default();
        let mut effect = CycleEffect::Fetch;
        let mut items = Vec::new();
        let mut last_error = String::new();
        let mut last_kind: Option<FailureKind> = None;
        let mut refresh_error: Option<String> = None;

        loop {
            let msg = match effect {
                CycleEffect::Fetch => {
                    let attempt = cycle.attempts() + 1;
                    match self
                        .collaborators
                        .fetcher
                        .fetch_resource(&self.resource, &self.session, self.settings.item_cap)
                        .await
                    {
                        Ok(fetched) => {
                            items = fetched;
                            CycleMsg::FetchSucceeded
                        }
                        Err(err) => {
                            watch_warn!(
                                "Fetching comments for {} failed (attempt {}, retries used {}): {}",
                                self.resource,
                                attempt,
                                cycle.retries_used(),
                                err
                            );
                            let retryable = err.kind.is_retryable();
                            last_error = err.to_string();
                            last_kind = Some(err.kind);
                            CycleMsg::FetchFailed { retryable }
                        }
                    }
                }
                CycleEffect::RefreshSession => {
                    match self.collaborators.sessions.refresh(&self.credentials).await {
                        Ok(session) => {
                            watch_info!(
                                "Session refreshed for {} (retry {})",
                                self.resource,
                                cycle.retries_used()
                            );
                            self.session = session;
                            refresh_error = None;
                            CycleMsg::SessionRefreshed
                        }
                        Err(err) => {
                            watch_warn!(
                                "Session refresh for {} failed (retry {}): {}",
                                self.resource,
                                cycle.retries_used(),
                                err
                            );
                            refresh_error = Some(err.to_string());
                            CycleMsg::RefreshFailed
                        }
                    }
                }
                CycleEffect::Deliver => {
                    return Ok(Fetched {
                        items,
                        retries_used: cycle.retries_used(),
                    });
                }
                CycleEffect::GiveUp { attempts } => {
                    if last_kind == Some(FailureKind::InvalidReference) {
                        return Err(CycleFailure::InvalidReference(last_error));
                    }
                    if let Some(refresh_error) = refresh_error {
                        last_error =
                            format!("{last_error} (last session refresh: {refresh_error})");
                    }
                    return Err(CycleFailure::RetriesExhausted {
                        attempts,
                        last_error,
                    });
                }
            };
            (cycle, effect) = advance(cycle, msg);
        }
    }
}
