//! Fetch-with-refresh state machine for one monitoring cycle.
//!
//! The engine drives it: perform the effect returned by [`advance`], feed the
//! result back as a [`CycleMsg`], repeat until `Deliver` or `GiveUp`.

/// Session refreshes allowed per cycle. Total fetch attempts are `MAX_RETRIES + 1`.
pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    used: u32,
    max: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Takes one retry if any remain.
    pub fn try_consume(&mut self) -> bool {
        if self.used < self.max {
            self.used += 1;
            true
        } else {
            false
        }
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(MAX_RETRIES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Fetching,
    NeedsRefresh,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMsg {
    FetchSucceeded,
    /// `retryable` is false for failures a new session cannot fix.
    FetchFailed { retryable: bool },
    SessionRefreshed,
    RefreshFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEffect {
    Fetch,
    RefreshSession,
    Deliver,
    GiveUp { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCycle {
    state: FetchState,
    budget: RetryBudget,
    attempts: u32,
}

impl FetchCycle {
    /// Starts in `Fetching`; the first effect to perform is `CycleEffect::Fetch`.
    pub fn new(budget: RetryBudget) -> Self {
        Self {
            state: FetchState::Fetching,
            budget,
            attempts: 0,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Fetch attempts whose outcome has been reported so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn retries_used(&self) -> u32 {
        self.budget.used()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, FetchState::Success | FetchState::Failed)
    }
}

impl Default for FetchCycle {
    fn default() -> Self {
        Self::new(RetryBudget::default())
    }
}

/// Pure transition: applies a message to the cycle and returns the next effect.
///
/// Messages that do not fit the current state leave it unchanged and repeat
/// the effect that state expects.
pub fn advance(mut cycle: FetchCycle, msg: CycleMsg) -> (FetchCycle, CycleEffect) {
    let effect = match (cycle.state, msg) {
        (FetchState::Fetching, CycleMsg::FetchSucceeded) => {
            cycle.attempts += 1;
            cycle.state = FetchState::Success;
            CycleEffect::Deliver
        }
        (FetchState::Fetching, CycleMsg::FetchFailed { retryable }) => {
            cycle.attempts += 1;
            if retryable && cycle.budget.try_consume() {
                cycle.state = FetchState::NeedsRefresh;
                CycleEffect::RefreshSession
            } else {
                cycle.state = FetchState::Failed;
                CycleEffect::GiveUp {
                    attempts: cycle.attempts,
                }
            }
        }
        // A failed refresh has already spent its retry; fetch again with the
        // session still in hand.
        (FetchState::NeedsRefresh, CycleMsg::SessionRefreshed | CycleMsg::RefreshFailed) => {
            cycle.state = FetchState::Fetching;
            CycleEffect::Fetch
        }
        (FetchState::Fetching, _) => CycleEffect::Fetch,
        (FetchState::NeedsRefresh, _) => CycleEffect::RefreshSession,
        (FetchState::Success, _) => CycleEffect::Deliver,
        (FetchState::Failed, _) => CycleEffect::GiveUp {
            attempts: cycle.attempts,
        },
    };
    (cycle, effect)
}
