//! SQLite persistence for entries, topics and their associations.
//!
//! The store exclusively owns all rows. Writes go through [`Store::upsert`],
//! which replaces an entry and its topic associations in one transaction.
//! Readers take a [`Snapshot`] so that rendering and search emission see a
//! single consistent view.

use crate::models::{topic_key, Entry, SiteStats, Topic, TopicCount};
use crate::slug::slugify;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Fingerprint and topics identical; nothing was written
    Unchanged,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id          INTEGER PRIMARY KEY,
    slug        TEXT NOT NULL UNIQUE,
    title       TEXT NOT NULL,
    raw_body    TEXT NOT NULL,
    html        TEXT NOT NULL,
    created     TEXT NOT NULL,
    modified    TEXT NOT NULL,
    source      TEXT,
    source_path TEXT NOT NULL,
    source_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS topics (
    id   INTEGER PRIMARY KEY,
    key  TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS entry_topics (
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    topic_id INTEGER NOT NULL REFERENCES topics(id),
    position INTEGER NOT NULL,
    PRIMARY KEY (entry_id, topic_id)
);

CREATE INDEX IF NOT EXISTS idx_entries_created ON entries(created DESC, slug);
CREATE INDEX IF NOT EXISTS idx_entry_topics_topic ON entry_topics(topic_id);
"#;

const ENTRY_COLUMNS: &str =
    "e.slug, e.title, e.raw_body, e.html, e.created, e.modified, e.source, e.source_path, e.source_hash";

const CORPUS_ORDER: &str = "e.created DESC, e.slug ASC";

/// SQLite-backed content store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the database at `path`, creating parent directories
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert or update an entry keyed by slug and replace its topic associations
    pub fn upsert(&mut self, entry: &Entry, topics: &[String]) -> StoreResult<UpsertOutcome> {
        let mut keys = HashSet::new();
        let topics: Vec<&str> = topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && keys.insert(topic_key(t)))
            .collect();

        let tx = self.conn.transaction()?;

        let existing: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, source_hash FROM entries WHERE slug = ?1",
                params![entry.slug],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (entry_id, outcome) = match existing {
            Some((id, hash)) => {
                if hash == entry.source_hash && current_topic_keys(&tx, id)? == topic_keys(&topics)
                {
                    return Ok(UpsertOutcome::Unchanged);
                }
                tx.execute(
                    "UPDATE entries SET title = ?2, raw_body = ?3, html = ?4, created = ?5,
                         modified = ?6, source = ?7, source_path = ?8, source_hash = ?9
                     WHERE id = ?1",
                    params![
                        id,
                        entry.title,
                        entry.raw_body,
                        entry.html,
                        entry.created,
                        entry.modified,
                        entry.source,
                        entry.source_path,
                        entry.source_hash,
                    ],
                )?;
                (id, UpsertOutcome::Updated)
            }
            None => {
                tx.execute(
                    "INSERT INTO entries (slug, title, raw_body, html, created, modified,
                         source, source_path, source_hash)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        entry.slug,
                        entry.title,
                        entry.raw_body,
                        entry.html,
                        entry.created,
                        entry.modified,
                        entry.source,
                        entry.source_path,
                        entry.source_hash,
                    ],
                )?;
                (tx.last_insert_rowid(), UpsertOutcome::Inserted)
            }
        };

        tx.execute(
            "DELETE FROM entry_topics WHERE entry_id = ?1",
            params![entry_id],
        )?;
        for (position, name) in topics.iter().enumerate() {
            let topic_id = ensure_topic(&tx, name)?;
            tx.execute(
                "INSERT INTO entry_topics (entry_id, topic_id, position) VALUES (?1, ?2, ?3)",
                params![entry_id, topic_id, position as i64],
            )?;
        }

        tx.commit()?;
        tracing::debug!(slug = %entry.slug, ?outcome, "upserted entry");
        Ok(outcome)
    }

    /// Every entry in corpus order (created DESC, slug ASC)
    pub fn all_entries(&self) -> StoreResult<Vec<Entry>> {
        all_entries(&self.conn)
    }

    pub fn entry(&self, slug: &str) -> StoreResult<Option<Entry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.slug = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![slug], entry_from_row)
            .optional()?)
    }

    /// Topics with at least one entry, by count DESC then name
    pub fn topic_cloud(&self) -> StoreResult<Vec<TopicCount>> {
        topic_cloud(&self.conn)
    }

    /// Entries carrying the topic with the given key, in corpus order
    pub fn entries_for_topic(&self, key: &str) -> StoreResult<Vec<Entry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e
             JOIN entry_topics et ON et.entry_id = e.id
             JOIN topics t ON t.id = et.topic_id
             WHERE t.key = ?1
             ORDER BY {CORPUS_ORDER}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![topic_key(key)], entry_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Topics of an entry in front-matter order
    pub fn topics_for_entry(&self, slug: &str) -> StoreResult<Vec<Topic>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.key, t.name, t.slug FROM topics t
             JOIN entry_topics et ON et.topic_id = t.id
             JOIN entries e ON e.id = et.entry_id
             WHERE e.slug = ?1
             ORDER BY et.position",
        )?;
        let rows = stmt.query_map(params![slug], topic_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Entries sharing a topic with `slug`, most shared topics first
    pub fn related_entries(&self, slug: &str, limit: usize) -> StoreResult<Vec<Entry>> {
        related_entries(&self.conn, slug, limit)
    }

    pub fn stats(&self) -> StoreResult<SiteStats> {
        stats(&self.conn)
    }

    /// Stored fingerprint for `slug`, if the entry exists
    pub fn fingerprint(&self, slug: &str) -> StoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT source_hash FROM entries WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// `(slug, source_path)` of every stored entry, sorted by slug
    pub fn sources(&self) -> StoreResult<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT slug, source_path FROM entries ORDER BY slug")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Delete entries (and their associations) by slug; returns the number removed
    pub fn remove_entries(&mut self, slugs: &[String]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM entries WHERE slug = ?1")?;
            for slug in slugs {
                removed += stmt.execute(params![slug])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Drop every row
    pub fn reset(&mut self) -> StoreResult<()> {
        self.conn.execute_batch(
            "BEGIN;
             DELETE FROM entry_topics;
             DELETE FROM entries;
             DELETE FROM topics;
             COMMIT;",
        )?;
        Ok(())
    }

    /// Read everything the renderer needs inside one read transaction
    pub fn snapshot(&self, related_limit: usize) -> StoreResult<Snapshot> {
        let tx = self.conn.unchecked_transaction()?;

        let entries = all_entries(&tx)?;
        let topic_cloud = topic_cloud(&tx)?;
        let stats = stats(&tx)?;

        let mut topics_by_entry: HashMap<String, Vec<Topic>> = HashMap::new();
        let mut members_by_topic: HashMap<String, Vec<String>> = HashMap::new();
        {
            let sql = format!(
                "SELECT e.slug, t.key, t.name, t.slug FROM entry_topics et
                 JOIN entries e ON e.id = et.entry_id
                 JOIN topics t ON t.id = et.topic_id
                 ORDER BY {CORPUS_ORDER}, et.position"
            );
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let slug: String = row.get(0)?;
                let topic = Topic {
                    key: row.get(1)?,
                    name: row.get(2)?,
                    slug: row.get(3)?,
                };
                members_by_topic
                    .entry(topic.key.clone())
                    .or_default()
                    .push(slug.clone());
                topics_by_entry.entry(slug).or_default().push(topic);
            }
        }

        let mut related = HashMap::new();
        if related_limit > 0 {
            for entry in &entries {
                let slugs = related_entries(&tx, &entry.slug, related_limit)?
                    .into_iter()
                    .map(|e| e.slug)
                    .collect::<Vec<_>>();
                if !slugs.is_empty() {
                    related.insert(entry.slug.clone(), slugs);
                }
            }
        }

        tx.commit()?;

        let positions = entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.slug.clone(), idx))
            .collect();

        Ok(Snapshot {
            entries,
            positions,
            topics_by_entry,
            members_by_topic,
            related,
            topic_cloud,
            stats,
        })
    }
}

/// Consistent read-only view of the store
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
    topics_by_entry: HashMap<String, Vec<Topic>>,
    members_by_topic: HashMap<String, Vec<String>>,
    related: HashMap<String, Vec<String>>,
    topic_cloud: Vec<TopicCount>,
    stats: SiteStats,
}

impl Snapshot {
    /// Entries in corpus order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, slug: &str) -> Option<&Entry> {
        self.positions.get(slug).map(|&idx| &self.entries[idx])
    }

    pub fn topics_for(&self, slug: &str) -> &[Topic] {
        self.topics_by_entry
            .get(slug)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Members of a topic in corpus order
    pub fn entries_for_topic(&self, key: &str) -> Vec<&Entry> {
        self.members_by_topic
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|slug| self.entry(slug))
            .collect()
    }

    pub fn related_for(&self, slug: &str) -> Vec<&Entry> {
        self.related
            .get(slug)
            .into_iter()
            .flatten()
            .filter_map(|s| self.entry(s))
            .collect()
    }

    pub fn topic_cloud(&self) -> &[TopicCount] {
        &self.topic_cloud
    }

    pub fn stats(&self) -> &SiteStats {
        &self.stats
    }

    /// Topic lists aligned with [`Snapshot::entries`]
    pub fn entry_topics(&self) -> Vec<Vec<Topic>> {
        self.entries
            .iter()
            .map(|e| self.topics_for(&e.slug).to_vec())
            .collect()
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        slug: row.get(0)?,
        title: row.get(1)?,
        raw_body: row.get(2)?,
        html: row.get(3)?,
        created: row.get(4)?,
        modified: row.get(5)?,
        source: row.get(6)?,
        source_path: row.get(7)?,
        source_hash: row.get(8)?,
    })
}

fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        key: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
    })
}

fn all_entries(conn: &Connection) -> StoreResult<Vec<Entry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e ORDER BY {CORPUS_ORDER}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], entry_from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

fn topic_cloud(conn: &Connection) -> StoreResult<Vec<TopicCount>> {
    let mut stmt = conn.prepare(
        "SELECT t.key, t.name, t.slug, COUNT(DISTINCT et.entry_id) AS n
         FROM topics t
         JOIN entry_topics et ON et.topic_id = t.id
         GROUP BY t.id
         HAVING n > 0
         ORDER BY n DESC, t.name COLLATE NOCASE ASC, t.key ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(TopicCount {
            topic: topic_from_row(row)?,
            count: row.get::<_, i64>(3)? as usize,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

fn related_entries(conn: &Connection, slug: &str, limit: usize) -> StoreResult<Vec<Entry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS}, COUNT(*) AS shared
         FROM entries me
         JOIN entry_topics mine ON mine.entry_id = me.id
         JOIN entry_topics other ON other.topic_id = mine.topic_id AND other.entry_id != me.id
         JOIN entries e ON e.id = other.entry_id
         WHERE me.slug = ?1
         GROUP BY e.id
         ORDER BY shared DESC, e.title ASC, e.slug ASC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![slug, limit as i64], entry_from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

fn stats(conn: &Connection) -> StoreResult<SiteStats> {
    let (entries, first_created, last_created): (i64, Option<NaiveDateTime>, Option<NaiveDateTime>) =
        conn.query_row(
            "SELECT COUNT(*), MIN(created), MAX(created) FROM entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
    let topics: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT topic_id) FROM entry_topics",
        [],
        |row| row.get(0),
    )?;

    Ok(SiteStats {
        entries: entries as usize,
        topics: topics as usize,
        first_created,
        last_created,
    })
}

fn current_topic_keys(conn: &Connection, entry_id: i64) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.key FROM topics t
         JOIN entry_topics et ON et.topic_id = t.id
         WHERE et.entry_id = ?1
         ORDER BY et.position",
    )?;
    let rows = stmt.query_map(params![entry_id], |row| row.get(0))?;
    Ok(rows.collect::<Result<_, _>>()?)
}

fn topic_keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| topic_key(n)).collect()
}

/// Look up a topic by key, creating it with a unique slug on first reference
fn ensure_topic(conn: &Connection, name: &str) -> StoreResult<i64> {
    let key = topic_key(name);
    if let Some(id) = conn
        .query_row(
            "SELECT id FROM topics WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?
    {
        return Ok(id);
    }

    let base = match slugify(name) {
        s if s.is_empty() => "topic".to_string(),
        s => s,
    };
    let mut slug = base.clone();
    let mut suffix = 2;
    while conn
        .query_row(
            "SELECT 1 FROM topics WHERE slug = ?1",
            params![slug],
            |_| Ok(()),
        )
        .optional()?
        .is_some()
    {
        slug = format!("{base}-{suffix}");
        suffix += 1;
    }

    conn.execute(
        "INSERT INTO topics (key, name, slug) VALUES (?1, ?2, ?3)",
        params![key, name, slug],
    )?;
    Ok(conn.last_insert_rowid())
}
