//! Store (C2): a single relational file with lazily-migrated tables for
//! posts, pain signals, opportunity scores, leads, validation reports, and
//! personas. Grounded on `original_source/copilot/providers/storage/sqlite_provider.py`
//! for schema and semantics, and on
//! `examples/cooprefr-bettersys/rust-backend/src/signals/db_storage.rs` for
//! the `rusqlite` idiom (mutex-guarded single connection, `params!` macro).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use common_types::{Lead, OpportunityScore, PainScore, Post, ValidationReport};
use error_types::StoreError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use scoring_engine::HistorySource;
use serde_json::Value;

const RAW_POSTS_COLUMNS: &[(&str, &str)] = &[
    ("id", "TEXT PRIMARY KEY"),
    ("source", "TEXT NOT NULL"),
    ("title", "TEXT NOT NULL"),
    ("body", "TEXT"),
    ("author", "TEXT"),
    ("url", "TEXT"),
    ("upvotes", "INTEGER NOT NULL DEFAULT 0"),
    ("comments_count", "INTEGER NOT NULL DEFAULT 0"),
    ("created_at", "TEXT NOT NULL"),
    ("channel", "TEXT"),
    ("subreddit", "TEXT"),
    ("sentiment_label", "TEXT"),
    ("sentiment_intensity", "REAL NOT NULL DEFAULT 0"),
    ("metadata", "TEXT NOT NULL DEFAULT '{}'"),
];

const SIGNALS_COLUMNS: &[(&str, &str)] = &[
    ("post_id", "TEXT PRIMARY KEY"),
    ("score", "REAL NOT NULL"),
    ("reasoning", "TEXT NOT NULL DEFAULT ''"),
    ("detected_problems", "TEXT NOT NULL DEFAULT '[]'"),
    ("suggested_solutions", "TEXT NOT NULL DEFAULT '[]'"),
    ("engagement_score", "REAL NOT NULL DEFAULT 0"),
    ("validation_score", "REAL NOT NULL DEFAULT 0"),
    ("recency_score", "REAL NOT NULL DEFAULT 0"),
    ("composite_value", "REAL NOT NULL DEFAULT 0"),
    ("sentiment_label", "TEXT"),
    ("sentiment_intensity", "REAL NOT NULL DEFAULT 0"),
    ("analyzed_at", "TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))"),
];

const OPPORTUNITY_SCORES_COLUMNS: &[(&str, &str)] = &[
    ("post_id", "TEXT PRIMARY KEY"),
    ("source", "TEXT NOT NULL"),
    ("final_score", "REAL NOT NULL"),
    ("pain_intensity", "REAL NOT NULL DEFAULT 0"),
    ("engagement_norm", "REAL NOT NULL DEFAULT 0"),
    ("validation_evidence", "REAL NOT NULL DEFAULT 0"),
    ("sentiment_intensity", "REAL NOT NULL DEFAULT 0"),
    ("recency", "REAL NOT NULL DEFAULT 0"),
    ("trend_momentum", "REAL NOT NULL DEFAULT 0"),
    ("market_signal", "REAL NOT NULL DEFAULT 0"),
    ("cross_source_bonus", "REAL NOT NULL DEFAULT 0"),
    ("dimensions", "TEXT NOT NULL DEFAULT '{}'"),
    ("weights", "TEXT NOT NULL DEFAULT '{}'"),
    ("computed_at", "TEXT NOT NULL"),
];

const LEADS_COLUMNS: &[(&str, &str)] = &[
    ("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    ("post_id", "TEXT NOT NULL"),
    ("author", "TEXT NOT NULL"),
    ("content_snippet", "TEXT NOT NULL DEFAULT ''"),
    ("intent_score", "REAL NOT NULL DEFAULT 0"),
    ("contact_url", "TEXT"),
    ("status", "TEXT NOT NULL DEFAULT 'new'"),
    ("verified_profiles", "TEXT NOT NULL DEFAULT '{}'"),
    ("source", "TEXT NOT NULL"),
    ("created_at", "TEXT NOT NULL"),
];

const VALIDATION_REPORTS_COLUMNS: &[(&str, &str)] = &[
    ("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    ("post_id", "TEXT NOT NULL"),
    ("source", "TEXT NOT NULL"),
    ("idea_summary", "TEXT NOT NULL DEFAULT ''"),
    ("market_size_estimate", "TEXT"),
    ("competitors", "TEXT NOT NULL DEFAULT '[]'"),
    ("swot_analysis", "TEXT NOT NULL DEFAULT '{}'"),
    ("validation_verdict", "TEXT NOT NULL DEFAULT ''"),
    ("next_steps", "TEXT NOT NULL DEFAULT '[]'"),
    ("generated_at", "TEXT NOT NULL"),
];

const PERSONAS_COLUMNS: &[(&str, &str)] = &[
    ("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    ("post_id", "TEXT NOT NULL"),
    ("name", "TEXT NOT NULL DEFAULT ''"),
    ("role", "TEXT NOT NULL DEFAULT ''"),
    ("company", "TEXT"),
    ("industry", "TEXT"),
    ("pain_points", "TEXT NOT NULL DEFAULT '[]'"),
    ("personality", "TEXT"),
    ("budget_range", "TEXT"),
    ("preferred_communication", "TEXT"),
    ("buying_triggers", "TEXT NOT NULL DEFAULT '[]'"),
    ("decision_maker", "INTEGER NOT NULL DEFAULT 0"),
    ("opportunity_fit_score", "REAL NOT NULL DEFAULT 0"),
    ("generated_at", "TEXT NOT NULL"),
];

const TABLES: &[(&str, &[(&str, &str)])] = &[
    ("raw_posts", RAW_POSTS_COLUMNS),
    ("signals", SIGNALS_COLUMNS),
    ("opportunity_scores", OPPORTUNITY_SCORES_COLUMNS),
    ("leads", LEADS_COLUMNS),
    ("validation_reports", VALIDATION_REPORTS_COLUMNS),
    ("personas", PERSONAS_COLUMNS),
];

/// A single relational file. All writes are serialized behind one mutex —
/// the spec assumes one process, one connection (§5).
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    /// Create any missing tables, then add any column the current model
    /// requires that an older on-disk schema lacks. Never drops a column.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        for (table, columns) in TABLES {
            let column_defs: Vec<String> = columns
                .iter()
                .map(|(name, ty)| format!("{name} {ty}"))
                .collect();
            conn.execute(
                &format!("CREATE TABLE IF NOT EXISTS {table} ({})", column_defs.join(", ")),
                [],
            )?;
            migrate_columns(&conn, table, columns)?;
        }
        Ok(())
    }

    pub fn save_post(&self, post: &Post) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO raw_posts
             (id, source, title, body, author, url, upvotes, comments_count, created_at,
              channel, subreddit, sentiment_label, sentiment_intensity, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                post.id,
                post.source,
                post.title,
                post.body,
                post.author,
                post.url,
                post.upvotes as i64,
                post.comments_count as i64,
                post.created_at.to_rfc3339(),
                post.channel,
                post.subreddit,
                post.sentiment_label,
                post.sentiment_intensity,
                serde_json::to_string(&post.metadata)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM raw_posts WHERE id = ?1", params![id], row_to_post)
            .optional()
            .map_err(StoreError::from)
    }

    pub fn get_posts(&self, limit: usize, source: Option<&str>) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = if source.is_some() {
            conn.prepare(
                "SELECT * FROM raw_posts WHERE source = ?1 ORDER BY created_at DESC LIMIT ?2",
            )?
        } else {
            conn.prepare("SELECT * FROM raw_posts ORDER BY created_at DESC LIMIT ?1")?
        };

        let rows = if let Some(source) = source {
            stmt.query_map(params![source, limit as i64], row_to_post)?
        } else {
            stmt.query_map(params![limit as i64], row_to_post)?
        };
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn save_signal(&self, post_id: &str, score: &PainScore) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO signals
             (post_id, score, reasoning, detected_problems, suggested_solutions,
              engagement_score, validation_score, recency_score, composite_value,
              sentiment_label, sentiment_intensity, analyzed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                post_id,
                score.score,
                score.reasoning,
                serde_json::to_string(&score.detected_problems)?,
                serde_json::to_string(&score.suggested_solutions)?,
                score.engagement_score,
                score.validation_score,
                score.recency_score,
                score.composite_value,
                score.sentiment_label,
                score.sentiment_intensity,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_signal(&self, post_id: &str) -> Result<Option<PainScore>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT score, reasoning, detected_problems, suggested_solutions, engagement_score,
                    validation_score, recency_score, composite_value, sentiment_label,
                    sentiment_intensity
             FROM signals WHERE post_id = ?1",
            params![post_id],
            |row| {
                Ok(PainScore {
                    score: row.get(0)?,
                    reasoning: row.get(1)?,
                    detected_problems: json_column(row, 2)?,
                    suggested_solutions: json_column(row, 3)?,
                    engagement_score: row.get(4)?,
                    validation_score: row.get(5)?,
                    recency_score: row.get(6)?,
                    composite_value: row.get(7)?,
                    sentiment_label: row.get(8)?,
                    sentiment_intensity: row.get(9)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn save_opportunity_score(&self, score: &OpportunityScore) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO opportunity_scores
             (post_id, source, final_score, pain_intensity, engagement_norm,
              validation_evidence, sentiment_intensity, recency, trend_momentum,
              market_signal, cross_source_bonus, dimensions, weights, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                score.post_id,
                score.source,
                score.final_score,
                score.pain_intensity,
                score.engagement_norm,
                score.validation_evidence,
                score.sentiment_intensity,
                score.recency,
                score.trend_momentum,
                score.market_signal,
                score.cross_source_bonus,
                serde_json::to_string(&score.dimensions)?,
                serde_json::to_string(&score.weights)?,
                score.computed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_opportunity_scores(
        &self,
        limit: usize,
        min_score: f64,
    ) -> Result<Vec<OpportunityScore>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT post_id, source, final_score, pain_intensity, engagement_norm,
                    validation_evidence, sentiment_intensity, recency, trend_momentum,
                    market_signal, cross_source_bonus, dimensions, weights, computed_at
             FROM opportunity_scores
             WHERE final_score >= ?1
             ORDER BY final_score DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![min_score, limit as i64], |row| {
            Ok(OpportunityScore {
                post_id: row.get(0)?,
                source: row.get(1)?,
                final_score: row.get(2)?,
                pain_intensity: row.get(3)?,
                engagement_norm: row.get(4)?,
                validation_evidence: row.get(5)?,
                sentiment_intensity: row.get(6)?,
                recency: row.get(7)?,
                trend_momentum: row.get(8)?,
                market_signal: row.get(9)?,
                cross_source_bonus: row.get(10)?,
                dimensions: json_column(row, 11)?,
                weights: json_column(row, 12)?,
                computed_at: parse_timestamp(row, 13)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn save_lead(&self, lead: &Lead) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO leads
             (post_id, author, content_snippet, intent_score, contact_url, status,
              verified_profiles, source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                lead.post_id,
                lead.author,
                lead.content_snippet,
                lead.intent_score,
                lead.contact_url,
                lead.status,
                serde_json::to_string(&lead.verified_profiles)?,
                lead.source,
                lead.created_at.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_leads(&self, limit: Option<usize>) -> Result<Vec<Lead>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, post_id, author, content_snippet, intent_score, contact_url, status,
                    verified_profiles, source, created_at
             FROM leads ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![sql_limit(limit)], |row| {
            Ok(Lead {
                id: Some(row.get(0)?),
                post_id: row.get(1)?,
                author: row.get(2)?,
                content_snippet: row.get(3)?,
                intent_score: row.get(4)?,
                contact_url: row.get(5)?,
                status: row.get(6)?,
                verified_profiles: json_column(row, 7)?,
                source: row.get(8)?,
                created_at: parse_timestamp(row, 9)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn save_report(&self, report: &ValidationReport) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO validation_reports
             (post_id, source, idea_summary, market_size_estimate, competitors,
              swot_analysis, validation_verdict, next_steps, generated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                report.post_id,
                report.source,
                report.idea_summary,
                report.market_size_estimate,
                serde_json::to_string(&report.competitors)?,
                serde_json::to_string(&report.swot_analysis)?,
                report.validation_verdict,
                serde_json::to_string(&report.next_steps)?,
                report.generated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_reports(&self, limit: Option<usize>) -> Result<Vec<ValidationReport>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT post_id, source, idea_summary, market_size_estimate, competitors,
                    swot_analysis, validation_verdict, next_steps, generated_at
             FROM validation_reports ORDER BY generated_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![sql_limit(limit)], |row| {
            Ok(ValidationReport {
                post_id: row.get(0)?,
                source: row.get(1)?,
                idea_summary: row.get(2)?,
                market_size_estimate: row.get(3)?,
                competitors: json_column(row, 4)?,
                swot_analysis: json_column(row, 5)?,
                validation_verdict: row.get(6)?,
                next_steps: json_column(row, 7)?,
                generated_at: parse_timestamp(row, 8)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }
}

impl HistorySource for Store {
    fn get_posts(&self, limit: usize, source: Option<&str>) -> Result<Vec<Post>, StoreError> {
        Store::get_posts(self, limit, source)
    }
}

fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get("id")?,
        source: row.get("source")?,
        title: row.get("title")?,
        body: row.get("body")?,
        author: row.get("author")?,
        url: row.get("url")?,
        upvotes: row.get::<_, i64>("upvotes")? as u64,
        comments_count: row.get::<_, i64>("comments_count")? as u64,
        created_at: parse_timestamp_named(row, "created_at")?,
        channel: row.get("channel")?,
        subreddit: row.get("subreddit")?,
        sentiment_label: row.get("sentiment_label")?,
        sentiment_intensity: row.get("sentiment_intensity")?,
        metadata: json_column_named(row, "metadata")?,
    })
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_timestamp_named(row: &Row, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::InvalidColumnName(format!("{name}: {e}")))
}

fn json_column<T: serde::de::DeserializeOwned + Default>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn json_column_named<T: serde::de::DeserializeOwned + Default>(
    row: &Row,
    name: &str,
) -> rusqlite::Result<T> {
    let raw: String = row.get(name)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::InvalidColumnName(format!("{name}: {e}")))
}

/// SQLite treats a negative `LIMIT` as unbounded; that's how an absent
/// `limit` argument is expressed in the queries below.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l as i64).unwrap_or(-1)
}

/// Diff the model's expected columns against `PRAGMA table_info` and add
/// whatever is missing. Never removes a column, so legacy data survives.
fn migrate_columns(conn: &Connection, table: &str, columns: &[(&str, &str)]) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let existing: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<_, _>>()?;

    for (name, ty) in columns {
        if !existing.iter().any(|c| c == name) {
            // SQLite forbids a non-constant default on ADD COLUMN for some
            // types; strip PRIMARY KEY/AUTOINCREMENT since those only make
            // sense at CREATE TABLE time.
            let add_ty = ty.replace("PRIMARY KEY AUTOINCREMENT", "").trim().to_string();
            let add_ty = if add_ty.is_empty() { "TEXT".to_string() } else { add_ty };
            conn.execute(
                &format!("ALTER TABLE {table} ADD COLUMN {name} {add_ty}"),
                [],
            )
            .map_err(|e| StoreError::MigrationFailed(format!("{table}.{name}: {e}")))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn sample_post(id: &str, source: &str) -> Post {
        Post {
            id: id.to_string(),
            source: source.to_string(),
            title: "Looking for a tool".into(),
            body: Some("I've tried everything".into()),
            author: "a".into(),
            url: "https://example.com".into(),
            upvotes: 10,
            comments_count: 2,
            created_at: Utc::now(),
            channel: Some("r/test".into()),
            subreddit: Some("test".into()),
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata: Map::new(),
        }
    }

    #[test]
    fn save_and_get_post_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        let post = sample_post("forum_1", "discussion-forum");
        store.save_post(&post).unwrap();
        let fetched = store.get_post("forum_1").unwrap().unwrap();
        assert_eq!(fetched.id, post.id);
        assert_eq!(fetched.title, post.title);
    }

    #[test]
    fn save_post_upserts_by_id() {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        let mut post = sample_post("forum_1", "discussion-forum");
        store.save_post(&post).unwrap();
        post.upvotes = 999;
        store.save_post(&post).unwrap();

        let all = store.get_posts(10, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].upvotes, 999);
    }

    #[test]
    fn get_posts_filters_by_source() {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        store.save_post(&sample_post("forum_1", "discussion-forum")).unwrap();
        store.save_post(&sample_post("news_1", "news-aggregator")).unwrap();

        let forum_only = store.get_posts(10, Some("discussion-forum")).unwrap();
        assert_eq!(forum_only.len(), 1);
        assert_eq!(forum_only[0].source, "discussion-forum");
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        store.initialize().unwrap();
    }

    #[test]
    fn save_signal_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        store.save_post(&sample_post("forum_1", "discussion-forum")).unwrap();
        let score = PainScore {
            score: 0.7,
            reasoning: "strong signal".into(),
            detected_problems: vec!["no good tool".into()],
            suggested_solutions: vec![],
            engagement_score: 0.0,
            validation_score: 0.5,
            recency_score: 0.0,
            composite_value: 0.0,
            sentiment_label: Some("frustrated".into()),
            sentiment_intensity: 0.7,
        };
        store.save_signal("forum_1", &score).unwrap();
        let fetched = store.get_signal("forum_1").unwrap().unwrap();
        assert_eq!(fetched.score, 0.7);
        assert_eq!(fetched.detected_problems, vec!["no good tool".to_string()]);
    }

    #[test]
    fn get_opportunity_scores_respects_min_score_and_order() {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        for (id, score) in [("a", 0.9), ("b", 0.2), ("c", 0.5)] {
            store.save_post(&sample_post(id, "discussion-forum")).unwrap();
            let opp = OpportunityScore {
                post_id: id.to_string(),
                source: "discussion-forum".into(),
                final_score: score,
                pain_intensity: 0.0,
                engagement_norm: 0.0,
                validation_evidence: 0.0,
                sentiment_intensity: 0.0,
                recency: 0.0,
                trend_momentum: 0.0,
                market_signal: 0.0,
                cross_source_bonus: 0.0,
                dimensions: HashMap::new(),
                weights: HashMap::new(),
                computed_at: Utc::now(),
            };
            store.save_opportunity_score(&opp).unwrap();
        }

        let top = store.get_opportunity_scores(10, 0.3).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].post_id, "a");
        assert_eq!(top[1].post_id, "c");
    }

    #[test]
    fn save_lead_assigns_autoincrement_id() {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        store.save_post(&sample_post("forum_1", "discussion-forum")).unwrap();
        let lead = Lead {
            id: None,
            post_id: "forum_1".into(),
            author: "a".into(),
            content_snippet: "snippet".into(),
            intent_score: 0.8,
            contact_url: Some("https://example.com/a".into()),
            status: "new".into(),
            verified_profiles: HashMap::new(),
            source: "discussion-forum".into(),
            created_at: Utc::now(),
        };
        let id = store.save_lead(&lead).unwrap();
        assert!(id > 0);
        let leads = store.get_leads(None).unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].id, Some(id));
    }
}
