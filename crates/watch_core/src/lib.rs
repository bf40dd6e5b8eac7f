//! Comment watcher core: pure domain types, dedup and the fetch-cycle state machine.
mod cycle;
mod item;
mod report;
mod resource;
mod session;
mod template;

pub use cycle::{advance, CycleEffect, CycleMsg, FetchCycle, FetchState, RetryBudget, MAX_RETRIES};
pub use item::{diff_new, Item, ItemSet};
pub use report::{CycleFailure, CycleOutcome, CycleReport};
pub use resource::{InvalidReference, ResourceRef};
pub use session::{Credentials, Session};
pub use template::{MessageTemplate, DEFAULT_TEMPLATE};

/// Items fetched per monitoring cycle unless configured otherwise.
pub const DEFAULT_ITEM_CAP: usize = 100;
