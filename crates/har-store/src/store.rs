//! SQLite-backed history of comparison runs

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use har_core::NormalizedExchange;
use har_diff::{ChangeCounts, Comparison, DiffRecord};
use rusqlite::{params, Connection, OpenFlags, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use ulid::Ulid;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    baseline_file TEXT NOT NULL,
    comparison_file TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS exchanges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    side TEXT NOT NULL,
    position INTEGER NOT NULL,
    kind TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    normalized_url TEXT NOT NULL,
    domain TEXT NOT NULL,
    path TEXT NOT NULL,
    status INTEGER NOT NULL,
    timing_ms REAL NOT NULL,
    request_headers TEXT NOT NULL,
    response_headers TEXT NOT NULL,
    request_body BLOB,
    response_body BLOB,
    gql_operation TEXT,
    gql_query TEXT,
    gql_query_norm TEXT,
    gql_variables TEXT,
    started_at TEXT
);

CREATE TABLE IF NOT EXISTS outcomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    outcome TEXT NOT NULL,
    domain TEXT NOT NULL,
    name TEXT NOT NULL,
    baseline_position INTEGER,
    comparison_position INTEGER,
    diff_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_exchanges_run ON exchanges(run_id, side, position);
CREATE INDEX IF NOT EXISTS idx_outcomes_run ON outcomes(run_id, outcome);
"#;

/// Which log an exchange row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Baseline,
    Comparison,
}

impl Side {
    fn as_str(self) -> &'static str {
        match self {
            Side::Baseline => "baseline",
            Side::Comparison => "comparison",
        }
    }
}

/// One stored comparison run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// ULID, sorts by creation time
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub baseline_file: String,
    pub comparison_file: String,
}

/// Persists comparisons for later inspection
pub struct ComparisonStore {
    conn: Connection,
}

impl ComparisonStore {
    /// Open or create a store file
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        debug!(path = %path.display(), "Opened comparison store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Store a comparison and both of its logs as a new run
    ///
    /// All rows are written in one transaction; on error nothing is kept.
    pub fn record(
        &mut self,
        comparison: &Comparison,
        baseline_file: &str,
        comparison_file: &str,
    ) -> StoreResult<RunRecord> {
        let run = RunRecord {
            run_id: Ulid::new().to_string(),
            created_at: Utc::now(),
            baseline_file: baseline_file.to_string(),
            comparison_file: comparison_file.to_string(),
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (run_id, created_at, baseline_file, comparison_file)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &run.run_id,
                run.created_at.to_rfc3339(),
                &run.baseline_file,
                &run.comparison_file,
            ],
        )?;

        let result = &comparison.result;
        let baseline = result
            .removed
            .iter()
            .chain(result.matched.iter().map(|p| &p.baseline));
        let candidate = result
            .added
            .iter()
            .chain(result.matched.iter().map(|p| &p.comparison));

        let mut exchange_rows = 0;
        for exchange in baseline {
            insert_exchange(&tx, &run.run_id, Side::Baseline, exchange)?;
            exchange_rows += 1;
        }
        for exchange in candidate {
            insert_exchange(&tx, &run.run_id, Side::Comparison, exchange)?;
            exchange_rows += 1;
        }

        let outcome_rows = insert_outcomes(&tx, &run.run_id, comparison)?;
        tx.commit()?;

        info!(
            run_id = %run.run_id,
            exchanges = exchange_rows,
            outcomes = outcome_rows,
            "Recorded comparison run"
        );
        Ok(run)
    }

    /// All runs, newest first
    pub fn runs(&self) -> StoreResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, created_at, baseline_file, comparison_file
             FROM runs ORDER BY run_id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(run_id, created_at, baseline_file, comparison_file)| -> StoreResult<_> {
                Ok(RunRecord {
                    run_id,
                    created_at: parse_timestamp(created_at)?,
                    baseline_file,
                    comparison_file,
                })
            })
            .collect()
    }

    /// Per-outcome totals for a run
    pub fn outcome_counts(&self, run_id: &str) -> StoreResult<ChangeCounts> {
        self.ensure_run(run_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT outcome, COUNT(*) FROM outcomes WHERE run_id = ?1 GROUP BY outcome",
        )?;
        let mut rows = stmt.query(params![run_id])?;

        let mut counts = ChangeCounts::default();
        while let Some(row) = rows.next()? {
            let outcome: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            let count = usize::try_from(count).unwrap_or(0);
            match outcome.as_str() {
                "added" => counts.added = count,
                "removed" => counts.removed = count,
                "changed" => counts.changed = count,
                "unchanged" => counts.unchanged = count,
                _ => {}
            }
        }
        Ok(counts)
    }

    /// Sorted distinct domains seen in a run's outcomes
    pub fn domains(&self, run_id: &str) -> StoreResult<Vec<String>> {
        self.ensure_run(run_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT domain FROM outcomes WHERE run_id = ?1 ORDER BY domain",
        )?;
        let domains = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(domains)
    }

    /// Stored diff records of a run's changed pairs, in pair order
    pub fn changed_records(&self, run_id: &str) -> StoreResult<Vec<DiffRecord>> {
        self.ensure_run(run_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT diff_json FROM outcomes
             WHERE run_id = ?1 AND outcome = 'changed' ORDER BY id",
        )?;
        let texts = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        texts
            .iter()
            .map(|text| serde_json::from_str(text).map_err(StoreError::from))
            .collect()
    }

    /// Number of exchange rows stored for one side of a run
    pub fn exchange_count(&self, run_id: &str, baseline: bool) -> StoreResult<usize> {
        let side = if baseline {
            Side::Baseline
        } else {
            Side::Comparison
        };
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM exchanges WHERE run_id = ?1 AND side = ?2",
            params![run_id, side.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn ensure_run(&self, run_id: &str) -> StoreResult<()> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM runs WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(StoreError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(())
    }
}

fn insert_exchange(
    tx: &Transaction<'_>,
    run_id: &str,
    side: Side,
    exchange: &NormalizedExchange,
) -> StoreResult<()> {
    let call = exchange.kind.graphql();
    let variables = call.map(|c| serde_json::to_string(&c.variables)).transpose()?;

    tx.execute(
        "INSERT INTO exchanges (
            run_id, side, position, kind, method, url, normalized_url, domain, path,
            status, timing_ms, request_headers, response_headers, request_body,
            response_body, gql_operation, gql_query, gql_query_norm, gql_variables, started_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            run_id,
            side.as_str(),
            exchange.index as i64,
            exchange.kind.label(),
            &exchange.method,
            &exchange.url,
            &exchange.normalized_url,
            &exchange.domain,
            &exchange.path,
            exchange.status,
            exchange.timing_ms,
            serde_json::to_string(exchange.request_headers.display())?,
            serde_json::to_string(exchange.response_headers.display())?,
            exchange.request_body.as_deref().map(str::as_bytes),
            exchange.response_body.as_deref().map(str::as_bytes),
            call.map(|c| c.operation_name.as_str()),
            call.map(|c| c.query.as_str()),
            call.map(|c| c.normalized_query()),
            variables,
            exchange.started_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn insert_outcomes(tx: &Transaction<'_>, run_id: &str, comparison: &Comparison) -> StoreResult<usize> {
    let mut stmt = tx.prepare(
        "INSERT INTO outcomes (
            run_id, outcome, domain, name, baseline_position, comparison_position, diff_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    let mut rows = 0;
    for exchange in &comparison.result.added {
        stmt.execute(params![
            run_id,
            "added",
            &exchange.domain,
            exchange.display_name(),
            Option::<i64>::None,
            Some(exchange.index as i64),
            Option::<String>::None,
        ])?;
        rows += 1;
    }

    for exchange in &comparison.result.removed {
        stmt.execute(params![
            run_id,
            "removed",
            &exchange.domain,
            exchange.display_name(),
            Some(exchange.index as i64),
            Option::<i64>::None,
            Option::<String>::None,
        ])?;
        rows += 1;
    }

    for record in &comparison.diffs {
        let (outcome, diff_json) = if record.is_changed() {
            ("changed", Some(serde_json::to_string(record)?))
        } else {
            ("unchanged", None)
        };
        stmt.execute(params![
            run_id,
            outcome,
            &record.domain,
            &record.name,
            Some(record.baseline_index as i64),
            Some(record.comparison_index as i64),
            diff_json,
        ])?;
        rows += 1;
    }

    Ok(rows)
}

fn parse_timestamp(value: String) -> StoreResult<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(&value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(source) => Err(StoreError::InvalidTimestamp { value, source }),
    }
}
