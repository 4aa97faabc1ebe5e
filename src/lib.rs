// Costume Contest - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod category;
pub mod config;
pub mod contest;
pub mod db;
pub mod error;
pub mod phase;
pub mod photo;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use category::{normalize_categories, parse_category_tags, Category, DEFAULT_TAG};
pub use config::Config;
pub use contest::{
    Contest, ContestOptions, ContestStatus, Leaderboard, ListingPolicy, Submission, PODIUM_SIZE,
};
pub use db::{
    Entry, EntrySummary, NewEntry, VoteCounts,
    open_database, setup_database, insert_entry, increment_vote,
    get_entry, get_all_entries, top_entries, reset_entries, count_entries,
};
pub use error::{ContestError, ContestResult, ErrorKind};
pub use phase::{Clock, ContestSchedule, FixedClock, Phase, ScheduleError, SystemClock};
pub use photo::{decode_data_uri, encode_data_uri, PhotoUpload, StagedUpload, UploadStager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
