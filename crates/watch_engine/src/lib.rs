//! Comment watcher engine: upstream IO, persistence and the monitor loop.
mod monitor;
mod notify;
mod paginate;
mod persist;
mod session;
mod source;
mod store;
mod types;

pub use monitor::{Collaborators, MonitorError, MonitorLoop, MonitorSettings};
pub use notify::{DeliveryError, LogNotifier, Notifier, WebhookNotifier};
pub use paginate::{PaginatedFetcher, PAGE_DELAY};
pub use persist::{ensure_parent_dir, AtomicFileWriter, PersistError};
pub use session::{LoginSessionProvider, LoginSettings, SessionError, SessionProvider};
pub use source::{FetchSettings, GraphqlPageSource, PageSource};
pub use store::{SeenItemStore, StoreError};
pub use types::{FailureKind, FetchError, Page, PageCursor};
