use crate::engine::{
    BlockingCategory, DomainHash, EntrySource, FalsePositiveReport, Guidance, MatchTier, SiteEntry,
};
use crate::logger::types::{DecisionAction, DecisionLogEntry};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

const ENTRY_COLUMNS: &str =
    "domain_hash, pattern, category, confidence, is_regex, source, added_by_user, is_active";

pub struct DbClient {
    db_path: String,
    conn: Mutex<Connection>,
}

pub struct LogWriter {
    conn: Connection,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn row_to_entry(row: &Row<'_>) -> Result<SiteEntry> {
    let hash: String = row.get(0)?;
    let category: String = row.get(2)?;
    let source: String = row.get(5)?;

    Ok(SiteEntry {
        domain_hash: DomainHash::from_hex(hash.clone())
            .ok_or_else(|| conversion_error(0, format!("bad domain hash {:?}", hash)))?,
        pattern: row.get(1)?,
        category: category.parse::<BlockingCategory>().map_err(|e| conversion_error(2, e))?,
        confidence: row.get::<_, f64>(3)? as f32,
        is_regex: row.get(4)?,
        source: source.parse::<EntrySource>().map_err(|e| conversion_error(5, e))?,
        added_by_user: row.get(6)?,
        is_active: row.get(7)?,
    })
}

impl DbClient {
    pub fn new(db_path: impl Into<String>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path)?;
        if db_path != ":memory:" {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    pub fn create_log_writer(&self) -> Result<LogWriter> {
        LogWriter::new(&self.db_path)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS site_entries (
                domain_hash TEXT PRIMARY KEY,
                pattern TEXT NOT NULL,
                category TEXT NOT NULL,
                confidence REAL NOT NULL DEFAULT 1.0,
                is_regex INTEGER NOT NULL DEFAULT 0,
                source TEXT NOT NULL,
                added_by_user INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                added_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_entries_kind ON site_entries(is_regex, is_active);

            CREATE TABLE IF NOT EXISTS false_positive_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url_hash TEXT NOT NULL,
                original_url TEXT NOT NULL,
                reason TEXT NOT NULL,
                reported_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reports_hash ON false_positive_reports(url_hash);

            CREATE TABLE IF NOT EXISTS guidance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL,
                locale TEXT NOT NULL DEFAULT 'en',
                text TEXT NOT NULL,
                reference TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_guidance_category ON guidance(category);

            CREATE TABLE IF NOT EXISTS decision_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                domain TEXT NOT NULL,
                action TEXT NOT NULL,
                category TEXT,
                confidence REAL NOT NULL,
                tier TEXT NOT NULL,
                cached INTEGER NOT NULL,
                latency_us INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON decision_logs(timestamp);",
        )?;

        info!("SQLite database initialized at {}", self.db_path);
        Ok(())
    }

    pub fn entry_by_hash(&self, hash: &DomainHash) -> Result<Option<SiteEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM site_entries WHERE domain_hash = ?1 AND is_active = 1",
            ENTRY_COLUMNS
        ))?;
        stmt.query_row([hash.as_str()], row_to_entry).optional()
    }

    pub fn entries_matching_fragment(&self, fragment: &str) -> Result<Vec<SiteEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM site_entries
             WHERE is_regex = 0 AND is_active = 1
               AND (instr(?1, ltrim(pattern, '*.')) > 0 OR instr(pattern, ?1) > 0)
             ORDER BY confidence DESC, pattern",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt.query_map([fragment.to_lowercase()], row_to_entry)?;
        rows.collect()
    }

    pub fn regex_entries(&self) -> Result<Vec<SiteEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM site_entries WHERE is_regex = 1 AND is_active = 1
             ORDER BY confidence DESC, pattern",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_entry)?;
        rows.collect()
    }

    pub fn upsert_entry(&self, entry: &SiteEntry) -> Result<()> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "INSERT OR REPLACE INTO site_entries (
                domain_hash, pattern, category, confidence, is_regex,
                source, added_by_user, is_active, added_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        stmt.execute(params![
            entry.domain_hash.as_str(),
            entry.pattern,
            entry.category.as_str(),
            entry.confidence as f64,
            entry.is_regex,
            entry.source.as_str(),
            entry.added_by_user,
            entry.is_active,
            now_secs(),
        ])?;
        Ok(())
    }

    pub fn deactivate_entry(&self, hash: &DomainHash) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE site_entries SET is_active = 0 WHERE domain_hash = ?1 AND is_active = 1",
            [hash.as_str()],
        )?;
        Ok(changed > 0)
    }

    pub fn count_user_added(&self) -> Result<u64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM site_entries WHERE added_by_user = 1 AND is_active = 1",
            [],
            |r| r.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn search_entries(&self, query: &str) -> Result<Vec<SiteEntry>> {
        let query = query.trim().to_lowercase();
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM site_entries
             WHERE is_active = 1
               AND (instr(pattern, ?1) > 0 OR lower(category) = ?1 OR domain_hash = ?2)
             ORDER BY pattern LIMIT 100",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![query, DomainHash::of(&query).as_str()],
            row_to_entry,
        )?;
        rows.collect()
    }

    pub fn insert_report(&self, report: &FalsePositiveReport) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO false_positive_reports (url_hash, original_url, reason, reported_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                report.url_hash.as_str(),
                report.original_url,
                report.reason,
                report.reported_at
            ],
        )?;
        Ok(())
    }

    pub fn reports_for(&self, hash: &DomainHash) -> Result<Vec<FalsePositiveReport>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT original_url, reason, reported_at FROM false_positive_reports
             WHERE url_hash = ?1 ORDER BY reported_at",
        )?;
        let rows = stmt.query_map([hash.as_str()], |row| {
            Ok(FalsePositiveReport {
                url_hash: hash.clone(),
                original_url: row.get(0)?,
                reason: row.get(1)?,
                reported_at: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    pub fn insert_guidance(&self, guidance: &Guidance) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO guidance (category, locale, text, reference) VALUES (?1, ?2, ?3, ?4)",
            params![
                guidance.category.as_str(),
                guidance.locale,
                guidance.text,
                guidance.reference
            ],
        )?;
        Ok(())
    }

    pub fn random_guidance(&self, category: BlockingCategory) -> Result<Option<Guidance>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT locale, text, reference FROM guidance
             WHERE category = ?1 ORDER BY RANDOM() LIMIT 1",
        )?;
        stmt.query_row([category.as_str()], |row| {
            Ok(Guidance {
                category,
                locale: row.get(0)?,
                text: row.get(1)?,
                reference: row.get(2)?,
            })
        })
        .optional()
    }

    pub fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT domain, action, category, confidence, tier, cached, latency_us
             FROM decision_logs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            let action: String = row.get(1)?;
            let category: Option<String> = row.get(2)?;
            let tier: String = row.get(4)?;
            Ok(DecisionLogEntry {
                domain: row.get(0)?,
                action: parse_action(&action),
                category: category.and_then(|c| c.parse().ok()),
                confidence: row.get::<_, f64>(3)? as f32,
                tier: parse_tier(&tier),
                cached: row.get(5)?,
                latency_us: row.get::<_, i64>(6)? as u64,
            })
        })?;
        rows.collect()
    }
}

impl LogWriter {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    pub fn insert_log(&mut self, entry: &DecisionLogEntry) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO decision_logs (
                timestamp, domain, action, category, confidence, tier, cached, latency_us
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        stmt.execute(params![
            now_secs(),
            entry.domain,
            format!("{:?}", entry.action),
            entry.category.map(|c| c.as_str()),
            entry.confidence as f64,
            format!("{:?}", entry.tier),
            entry.cached,
            entry.latency_us as i64,
        ])?;

        Ok(())
    }

    pub fn prune_logs(&mut self, retention_hours: u64) -> Result<()> {
        let cutoff = now_secs() - (retention_hours * 3600) as i64;
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM decision_logs WHERE timestamp < ?1")?;
        stmt.execute(params![cutoff])?;
        Ok(())
    }
}

fn parse_action(s: &str) -> DecisionAction {
    match s {
        "Blocked" => DecisionAction::Blocked,
        "FailClosed" => DecisionAction::FailClosed,
        _ => DecisionAction::Allowed,
    }
}

fn parse_tier(s: &str) -> MatchTier {
    match s {
        "ExactHash" => MatchTier::ExactHash,
        "Pattern" => MatchTier::Pattern,
        "Regex" => MatchTier::Regex,
        "Keyword" => MatchTier::Keyword,
        "Embedded" => MatchTier::Embedded,
        "FailClosed" => MatchTier::FailClosed,
        _ => MatchTier::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DbClient {
        let db = DbClient::new(":memory:").unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_entry_round_trip_and_deactivate() {
        let db = client();
        let entry = SiteEntry::curated("blocked.example", BlockingCategory::Gambling);
        db.upsert_entry(&entry).unwrap();

        assert_eq!(db.entry_by_hash(&entry.domain_hash).unwrap(), Some(entry.clone()));
        assert!(db.deactivate_entry(&entry.domain_hash).unwrap());
        assert!(!db.deactivate_entry(&entry.domain_hash).unwrap());
        assert_eq!(db.entry_by_hash(&entry.domain_hash).unwrap(), None);
    }

    #[test]
    fn test_fragment_query_matches_both_directions() {
        let db = client();
        db.upsert_entry(&SiteEntry::curated("*.casino.example", BlockingCategory::Gambling))
            .unwrap();
        db.upsert_entry(&SiteEntry::regex(r"bet\d+", BlockingCategory::Gambling, 0.9))
            .unwrap();

        let hits = db.entries_matching_fragment("live.casino.example").unwrap();
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].is_regex);

        // Pattern contains the fragment
        assert_eq!(db.entries_matching_fragment("casino").unwrap().len(), 1);
        assert!(db.entries_matching_fragment("news.example.org").unwrap().is_empty());
        assert_eq!(db.regex_entries().unwrap().len(), 1);
    }

    #[test]
    fn test_user_count_and_search() {
        let db = client();
        db.upsert_entry(&SiteEntry::user("mine.example", BlockingCategory::DatingSites))
            .unwrap();
        db.upsert_entry(&SiteEntry::curated("theirs.example", BlockingCategory::DatingSites))
            .unwrap();

        assert_eq!(db.count_user_added().unwrap(), 1);
        assert_eq!(db.search_entries("mine").unwrap().len(), 1);
        assert_eq!(db.search_entries("dating_sites").unwrap().len(), 2);
        assert_eq!(db.search_entries("theirs.example").unwrap().len(), 1);
    }

    #[test]
    fn test_guidance_and_reports() {
        let db = client();
        assert!(db.random_guidance(BlockingCategory::Gambling).unwrap().is_none());

        let guidance = Guidance {
            category: BlockingCategory::Gambling,
            locale: "en".into(),
            text: "Set a limit before you start.".into(),
            reference: "ref/1".into(),
        };
        db.insert_guidance(&guidance).unwrap();
        assert_eq!(db.random_guidance(BlockingCategory::Gambling).unwrap(), Some(guidance));

        let hash = DomainHash::of("ok.example");
        db.insert_report(&FalsePositiveReport {
            url_hash: hash.clone(),
            original_url: "https://ok.example/page".into(),
            reason: "school site".into(),
            reported_at: 42,
        })
        .unwrap();
        assert_eq!(db.reports_for(&hash).unwrap().len(), 1);
    }
}
