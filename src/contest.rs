// 🎃 Contest Service - submissions, votes and leaderboards
//
// Every operation reads the clock first and checks the phase gate before it
// touches the store. The store owns all entries; this layer never caches them.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::category::{normalize_categories, Category};
use crate::db::{self, Entry, EntrySummary, NewEntry};
use crate::error::{ContestError, ContestResult};
use crate::phase::{Clock, ContestSchedule, Phase};
use crate::photo::{PhotoUpload, UploadStager};

/// Entries shown per category on the leaderboard
pub const PODIUM_SIZE: usize = 3;

// ============================================================================
// POLICIES
// ============================================================================

/// When the full entries listing may be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingPolicy {
    /// Only while voting is open
    #[default]
    VotingOnly,
    /// At any time
    Always,
}

impl FromStr for ListingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "voting" | "voting-only" => Ok(ListingPolicy::VotingOnly),
            "always" => Ok(ListingPolicy::Always),
            other => Err(format!("unknown listing policy '{}' (expected 'voting' or 'always')", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContestOptions {
    pub listing: ListingPolicy,
    pub allow_reset: bool,
}

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// A costume submission as received from a client
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub name: String,
    pub costume_name: String,
    /// Raw tags; normalized on submit
    pub categories: Vec<String>,
    pub photo: Option<PhotoUpload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestStatus {
    /// True while submissions are accepted
    pub open: bool,
    pub phase: Phase,
    pub submission_end: DateTime<Utc>,
    pub voting_end: DateTime<Utc>,
}

/// Top entries for one category
#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub category: Category,
    pub entries: Vec<EntrySummary>,
}

// ============================================================================
// CONTEST
// ============================================================================

#[derive(Clone)]
pub struct Contest {
    db: Arc<Mutex<Connection>>,
    schedule: ContestSchedule,
    clock: Arc<dyn Clock>,
    stager: UploadStager,
    options: ContestOptions,
}

impl Contest {
    pub fn new(
        conn: Connection,
        schedule: ContestSchedule,
        clock: Arc<dyn Clock>,
        stager: UploadStager,
        options: ContestOptions,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            schedule,
            clock,
            stager,
            options,
        }
    }

    pub fn schedule(&self) -> &ContestSchedule {
        &self.schedule
    }

    pub fn options(&self) -> ContestOptions {
        self.options
    }

    fn conn(&self) -> ContestResult<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| {
            error!("Database mutex poisoned");
            ContestError::StoreUnavailable
        })
    }

    /// Current phase, evaluated against the clock on every call
    pub fn phase(&self) -> Phase {
        self.schedule.phase_at(self.clock.now())
    }

    pub fn status(&self) -> ContestStatus {
        let phase = self.phase();
        ContestStatus {
            open: phase == Phase::Submitting,
            phase,
            submission_end: self.schedule.submission_end(),
            voting_end: self.schedule.voting_end(),
        }
    }

    /// Create a new entry. Returns the id the store assigned.
    pub fn submit(&self, submission: Submission) -> ContestResult<i64> {
        let now = self.clock.now();
        if !self.schedule.submissions_open(now) {
            warn!("Rejected submission: submissions are closed");
            return Err(ContestError::SubmissionClosed);
        }

        let name = submission.name.trim();
        if name.is_empty() {
            return Err(ContestError::validation("name", "is required"));
        }
        let costume_name = submission.costume_name.trim();
        if costume_name.is_empty() {
            return Err(ContestError::validation("costumeName", "is required"));
        }

        let categories = normalize_categories(&submission.categories);

        let photo = match submission.photo.filter(|p| !p.is_empty()) {
            Some(upload) => {
                let mime = upload
                    .image_mime()
                    .ok_or_else(|| ContestError::validation("photo", "must be an image"))?;
                let staged = self.stager.stage(&upload, &mime).map_err(storage_error)?;
                Some(staged.into_data_uri().map_err(storage_error)?)
            }
            None => None,
        };

        let new_entry = NewEntry {
            submitter_name: name.to_string(),
            costume_name: costume_name.to_string(),
            categories,
            photo,
        };

        let id = {
            let conn = self.conn()?;
            db::insert_entry(&conn, &new_entry, now).map_err(storage_error)?
        };

        info!(
            "🎃 New entry #{}: '{}' by {} ({})",
            id,
            new_entry.costume_name,
            new_entry.submitter_name,
            new_entry.categories.join(", ")
        );
        Ok(id)
    }

    /// Record one vote and return the category's new count for that entry
    pub fn vote(&self, id: i64, category_label: &str) -> ContestResult<i64> {
        if !self.schedule.voting_open(self.clock.now()) {
            warn!("Rejected vote for entry {}: voting is closed", id);
            return Err(ContestError::VotingClosed);
        }

        let category = Category::from_label(category_label).ok_or_else(|| {
            warn!("Rejected vote for entry {}: unknown category '{}'", id, category_label);
            ContestError::InvalidCategory(category_label.to_string())
        })?;

        let votes = {
            let conn = self.conn()?;
            db::increment_vote(&conn, id, category).map_err(storage_error)?
        };

        match votes {
            Some(votes) => {
                info!("🗳️  Vote: entry #{} {} → {}", id, category, votes);
                Ok(votes)
            }
            None => Err(ContestError::EntryNotFound(id)),
        }
    }

    /// Top entries per category, in canonical category order. Not phase gated.
    pub fn results(&self) -> ContestResult<Vec<Leaderboard>> {
        let conn = self.conn()?;

        Category::ALL
            .iter()
            .map(|category| {
                let entries = db::top_entries(&conn, *category, PODIUM_SIZE).map_err(storage_error)?;
                Ok(Leaderboard {
                    category: *category,
                    entries,
                })
            })
            .collect()
    }

    /// Every entry, most total votes first, subject to the listing policy
    pub fn entries(&self) -> ContestResult<Vec<Entry>> {
        if self.options.listing == ListingPolicy::VotingOnly
            && !self.schedule.voting_open(self.clock.now())
        {
            return Err(ContestError::VotingClosed);
        }

        let conn = self.conn()?;
        db::get_all_entries(&conn).map_err(storage_error)
    }

    pub fn entry(&self, id: i64) -> ContestResult<Entry> {
        let conn = self.conn()?;
        db::get_entry(&conn, id)
            .map_err(storage_error)?
            .ok_or(ContestError::EntryNotFound(id))
    }

    pub fn entry_count(&self) -> ContestResult<i64> {
        let conn = self.conn()?;
        db::count_entries(&conn).map_err(storage_error)
    }

    /// Administrative reset: removes every entry
    pub fn reset(&self) -> ContestResult<usize> {
        if !self.options.allow_reset {
            warn!("Rejected reset: reset is disabled");
            return Err(ContestError::ResetDisabled);
        }

        let conn = self.conn()?;
        let removed = db::reset_entries(&conn).map_err(storage_error)?;
        warn!("🧹 Contest reset: {} entries removed", removed);
        Ok(removed)
    }
}

fn storage_error(err: anyhow::Error) -> ContestError {
    error!("Storage failure: {:#}", err);
    ContestError::Storage(err)
}
