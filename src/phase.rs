// ⏰ Phase Clock - submission and voting windows
//
// The contest moves Submitting → Voting → Closed as wall-clock time crosses
// two deadlines. The phase is recomputed on every call, so a deadline
// crossing takes effect on the next request without a restart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ============================================================================
// PHASE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Entries are accepted (now < submission_end)
    Submitting,
    /// Votes are accepted (submission_end <= now < voting_end)
    Voting,
    /// Nothing is accepted (now >= voting_end)
    Closed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Submitting => "submitting",
            Phase::Voting => "voting",
            Phase::Closed => "closed",
        }
    }
}

// ============================================================================
// SCHEDULE
// ============================================================================

/// The two configured deadlines. Construction guarantees
/// `submission_end < voting_end`, so the Voting window is never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContestSchedule {
    submission_end: DateTime<Utc>,
    voting_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("submission end ({submission_end}) must be strictly before voting end ({voting_end})")]
pub struct ScheduleError {
    pub submission_end: DateTime<Utc>,
    pub voting_end: DateTime<Utc>,
}

impl ContestSchedule {
    pub fn new(submission_end: DateTime<Utc>, voting_end: DateTime<Utc>) -> Result<Self, ScheduleError> {
        if submission_end >= voting_end {
            return Err(ScheduleError {
                submission_end,
                voting_end,
            });
        }

        Ok(Self {
            submission_end,
            voting_end,
        })
    }

    pub fn submission_end(&self) -> DateTime<Utc> {
        self.submission_end
    }

    pub fn voting_end(&self) -> DateTime<Utc> {
        self.voting_end
    }

    /// Phase at instant `now`
    pub fn phase_at(&self, now: DateTime<Utc>) -> Phase {
        if now < self.submission_end {
            Phase::Submitting
        } else if now < self.voting_end {
            Phase::Voting
        } else {
            Phase::Closed
        }
    }

    pub fn submissions_open(&self, now: DateTime<Utc>) -> bool {
        self.phase_at(now) == Phase::Submitting
    }

    pub fn voting_open(&self, now: DateTime<Utc>) -> bool {
        self.phase_at(now) == Phase::Voting
    }
}

// ============================================================================
// CLOCK
// ============================================================================

/// Source of "now". Injected into the service so tests can move time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
