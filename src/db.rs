use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

use crate::category::Category;

/// One submitted costume with its per-category vote counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    // ========================================================================
    // IDENTITY (assigned by the store, never reused)
    // ========================================================================
    pub id: i64,

    // ========================================================================
    // SUBMISSION (immutable after insert)
    // ========================================================================
    pub submitter_name: String,
    pub costume_name: String,
    /// Free-form tags; always contains an "Overall" tag (any casing)
    pub categories: Vec<String>,
    /// Self-contained `data:` URI, never a filesystem path
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,

    // ========================================================================
    // TALLY (only ever incremented)
    // ========================================================================
    pub vote_counts: VoteCounts,
}

impl Entry {
    pub fn total_votes(&self) -> i64 {
        self.vote_counts.total()
    }
}

/// Data needed to create an entry; counters always start at zero
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub submitter_name: String,
    pub costume_name: String,
    pub categories: Vec<String>,
    pub photo: Option<String>,
}

/// Leaderboard projection of an entry for a single category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: i64,
    #[serde(rename = "name")]
    pub submitter_name: String,
    pub costume_name: String,
    #[serde(rename = "image")]
    pub photo: Option<String>,
    pub votes: i64,
}

/// Per-category counters, indexed by `Category::index`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteCounts([i64; 5]);

impl VoteCounts {
    pub fn get(&self, category: Category) -> i64 {
        self.0[category.index()]
    }

    pub fn total(&self) -> i64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

impl Serialize for VoteCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.label(), &count)?;
        }
        map.end()
    }
}

// ============================================================================
// CONNECTION & SCHEMA
// ============================================================================

/// Open (or create) the contest database file, ready for concurrent writers
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    conn.busy_timeout(Duration::from_secs(5))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode so readers don't block the vote writers
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    // ==========================================================================
    // Entries Table (one row per costume, five fixed counters)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) > 0),
            costume_name TEXT NOT NULL CHECK (length(costume_name) > 0),
            categories TEXT NOT NULL,
            image TEXT,
            votes_overall INTEGER NOT NULL DEFAULT 0 CHECK (votes_overall >= 0),
            votes_scariest INTEGER NOT NULL DEFAULT 0 CHECK (votes_scariest >= 0),
            votes_funniest INTEGER NOT NULL DEFAULT 0 CHECK (votes_funniest >= 0),
            votes_homemade_diy INTEGER NOT NULL DEFAULT 0 CHECK (votes_homemade_diy >= 0),
            votes_family INTEGER NOT NULL DEFAULT 0 CHECK (votes_family >= 0),
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// WRITES
// ============================================================================

/// Insert a new entry and return its store-assigned id
pub fn insert_entry(conn: &Connection, entry: &NewEntry, created_at: DateTime<Utc>) -> Result<i64> {
    let categories_json = serde_json::to_string(&entry.categories)?;

    let id = conn
        .query_row(
            "INSERT INTO entries (name, costume_name, categories, image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
            params![
                entry.submitter_name,
                entry.costume_name,
                categories_json,
                entry.photo,
                created_at.to_rfc3339(),
            ],
            |row| row.get(0),
        )
        .context("Failed to insert entry")?;

    Ok(id)
}

/// Add one vote to `category` on entry `id` and return the new count.
///
/// The read-modify-write happens inside a single UPDATE statement, so
/// concurrent callers (even on separate connections) never lose a vote.
/// Returns `None` when no entry has that id.
pub fn increment_vote(conn: &Connection, id: i64, category: Category) -> Result<Option<i64>> {
    // column() only yields one of five fixed identifiers
    let column = category.column();
    let sql = format!("UPDATE entries SET {column} = {column} + 1 WHERE id = ?1 RETURNING {column}");

    let votes = conn
        .query_row(&sql, params![id], |row| row.get(0))
        .optional()
        .with_context(|| format!("Failed to record {} vote for entry {}", category, id))?;

    Ok(votes)
}

/// Administrative reset: remove every entry. Returns how many were removed.
///
/// The AUTOINCREMENT sequence survives, so ids are not handed out twice.
pub fn reset_entries(conn: &Connection) -> Result<usize> {
    let removed = conn
        .execute("DELETE FROM entries", [])
        .context("Failed to clear entries")?;
    Ok(removed)
}

// ============================================================================
// READS
// ============================================================================

const ENTRY_COLUMNS: &str = "id, name, costume_name, categories, image, created_at,
    votes_overall, votes_scariest, votes_funniest, votes_homemade_diy, votes_family";

const TOTAL_VOTES: &str =
    "(votes_overall + votes_scariest + votes_funniest + votes_homemade_diy + votes_family)";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let categories_json: String = row.get(3)?;
    let categories: Vec<String> = serde_json::from_str(&categories_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let created_at_str: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(Entry {
        id: row.get(0)?,
        submitter_name: row.get(1)?,
        costume_name: row.get(2)?,
        categories,
        photo: row.get(4)?,
        created_at,
        vote_counts: VoteCounts([
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
        ]),
    })
}

pub fn get_entry(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1");
    let entry = conn.query_row(&sql, params![id], entry_from_row).optional()?;
    Ok(entry)
}

/// All entries, most total votes first; ties keep creation order
pub fn get_all_entries(conn: &Connection) -> Result<Vec<Entry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY {TOTAL_VOTES} DESC, id ASC");
    let mut stmt = conn.prepare(&sql)?;

    let entries = stmt
        .query_map([], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Top `limit` entries for one category, by that category's counter
pub fn top_entries(conn: &Connection, category: Category, limit: usize) -> Result<Vec<EntrySummary>> {
    let column = category.column();
    let sql = format!(
        "SELECT id, name, costume_name, image, {column}
         FROM entries
         ORDER BY {column} DESC, id ASC
         LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let summaries = stmt
        .query_map(params![limit as i64], |row| {
            Ok(EntrySummary {
                id: row.get(0)?,
                submitter_name: row.get(1)?,
                costume_name: row.get(2)?,
                photo: row.get(3)?,
                votes: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(summaries)
}

pub fn count_entries(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn new_entry(name: &str, costume: &str) -> NewEntry {
        NewEntry {
            submitter_name: name.to_string(),
            costume_name: costume.to_string(),
            categories: vec!["Overall".to_string()],
            photo: None,
        }
    }

    #[test]
    fn test_insert_and_fetch() {
        let conn = test_conn();
        let created_at = Utc::now();

        let mut entry = new_entry("Ada", "Vampire");
        entry.categories = vec!["scary".to_string(), "Overall".to_string()];
        entry.photo = Some("data:image/png;base64,AAEC".to_string());

        let id = insert_entry(&conn, &entry, created_at).unwrap();
        let stored = get_entry(&conn, id).unwrap().expect("entry should exist");

        assert_eq!(stored.submitter_name, "Ada");
        assert_eq!(stored.costume_name, "Vampire");
        assert_eq!(stored.categories, vec!["scary", "Overall"]);
        assert_eq!(stored.photo.as_deref(), Some("data:image/png;base64,AAEC"));
        assert_eq!(stored.created_at.timestamp(), created_at.timestamp());
        assert_eq!(stored.vote_counts, VoteCounts::default());
        assert_eq!(count_entries(&conn).unwrap(), 1);
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let conn = test_conn();
        let a = insert_entry(&conn, &new_entry("A", "Ghost"), Utc::now()).unwrap();
        let b = insert_entry(&conn, &new_entry("B", "Witch"), Utc::now()).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_empty_names_rejected_by_schema() {
        let conn = test_conn();
        assert!(insert_entry(&conn, &new_entry("", "Ghost"), Utc::now()).is_err());
        assert_eq!(count_entries(&conn).unwrap(), 0);
    }

    #[test]
    fn test_increment_vote() {
        let conn = test_conn();
        let id = insert_entry(&conn, &new_entry("Ada", "Vampire"), Utc::now()).unwrap();

        assert_eq!(increment_vote(&conn, id, Category::Overall).unwrap(), Some(1));
        assert_eq!(increment_vote(&conn, id, Category::Overall).unwrap(), Some(2));
        assert_eq!(increment_vote(&conn, id, Category::HomemadeDiy).unwrap(), Some(1));

        let stored = get_entry(&conn, id).unwrap().unwrap();
        assert_eq!(stored.vote_counts.get(Category::Overall), 2);
        assert_eq!(stored.vote_counts.get(Category::HomemadeDiy), 1);
        assert_eq!(stored.vote_counts.get(Category::Scariest), 0);
        assert_eq!(stored.total_votes(), 3);
    }

    #[test]
    fn test_increment_missing_entry() {
        let conn = test_conn();
        assert_eq!(increment_vote(&conn, 42, Category::Family).unwrap(), None);
    }

    #[test]
    fn test_concurrent_increments_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contest.db");

        let conn = open_database(&path).unwrap();
        let id = insert_entry(&conn, &new_entry("Ada", "Vampire"), Utc::now()).unwrap();

        const THREADS: usize = 8;
        const VOTES_PER_THREAD: usize = 25;

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let conn = open_database(&path).unwrap();
                    barrier.wait();
                    for _ in 0..VOTES_PER_THREAD {
                        increment_vote(&conn, id, Category::Overall).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stored = get_entry(&conn, id).unwrap().unwrap();
        assert_eq!(
            stored.vote_counts.get(Category::Overall),
            (THREADS * VOTES_PER_THREAD) as i64
        );
        println!("✅ {} concurrent votes, none lost", THREADS * VOTES_PER_THREAD);
    }

    #[test]
    fn test_listing_order() {
        let conn = test_conn();
        let a = insert_entry(&conn, &new_entry("A", "Ghost"), Utc::now()).unwrap();
        let b = insert_entry(&conn, &new_entry("B", "Witch"), Utc::now()).unwrap();
        let c = insert_entry(&conn, &new_entry("C", "Mummy"), Utc::now()).unwrap();

        increment_vote(&conn, c, Category::Funniest).unwrap();
        increment_vote(&conn, c, Category::Family).unwrap();
        increment_vote(&conn, b, Category::Scariest).unwrap();
        increment_vote(&conn, a, Category::Overall).unwrap();

        let ids: Vec<i64> = get_all_entries(&conn).unwrap().iter().map(|e| e.id).collect();
        // c has 2 votes; a and b tie at 1 and keep creation order
        assert_eq!(ids, vec![c, a, b]);
    }

    #[test]
    fn test_top_entries() {
        let conn = test_conn();
        let ids: Vec<i64> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|n| insert_entry(&conn, &new_entry(n, "Costume"), Utc::now()).unwrap())
            .collect();

        for (i, id) in ids.iter().enumerate() {
            for _ in 0..i {
                increment_vote(&conn, *id, Category::Scariest).unwrap();
            }
        }
        // Family votes only on the first entry
        increment_vote(&conn, ids[0], Category::Family).unwrap();

        let top = top_entries(&conn, Category::Scariest, 3).unwrap();
        assert_eq!(top.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ids[4], ids[3], ids[2]]);
        assert_eq!(top.iter().map(|s| s.votes).collect::<Vec<_>>(), vec![4, 3, 2]);

        let family = top_entries(&conn, Category::Family, 3).unwrap();
        assert_eq!(family[0].id, ids[0]);
        // zero-vote ties fall back to id order
        assert_eq!(family[1].id, ids[1]);
        assert_eq!(family[2].id, ids[2]);
    }

    #[test]
    fn test_reset_keeps_id_sequence() {
        let conn = test_conn();
        let first = insert_entry(&conn, &new_entry("A", "Ghost"), Utc::now()).unwrap();
        insert_entry(&conn, &new_entry("B", "Witch"), Utc::now()).unwrap();

        assert_eq!(reset_entries(&conn).unwrap(), 2);
        assert_eq!(count_entries(&conn).unwrap(), 0);

        let after = insert_entry(&conn, &new_entry("C", "Mummy"), Utc::now()).unwrap();
        assert!(after > first + 1);
    }

    #[test]
    fn test_vote_counts_serialize_by_label() {
        let json = serde_json::to_value(VoteCounts([1, 0, 2, 3, 0])).unwrap();
        assert_eq!(json["Overall"], 1);
        assert_eq!(json["Funniest"], 2);
        assert_eq!(json["Homemade/DIY"], 3);
    }
}
