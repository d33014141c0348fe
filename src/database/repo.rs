use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, ToSql};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::database::schema::{COLORS_TABLE, MEDIA_TABLE, METADATA_TABLE, SCHEMA};
use crate::models::{ColorRow, MediaRow, MetadataRow};

const QUERY_KEYWORDS: [&str; 2] = ["SELECT", "WITH"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to initialize schema: {0}")]
    Schema(#[source] rusqlite::Error),
    #[error("failed to read table counts: {0}")]
    Count(#[source] rusqlite::Error),
}

/// A failed load. The whole transaction is rolled back, so no table keeps a
/// partial write.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("load transaction failed: {0}")]
    Transaction(#[source] rusqlite::Error),
    #[error("insert into {table} failed: {source}")]
    Insert {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("only read-only statements may be run, rejected: {0}")]
    NotReadOnly(String),
    #[error("only a single statement may be run")]
    MultipleStatements,
    #[error("query failed: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Rows actually written by a load, per table. Duplicates are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadCounts {
    pub metadata: usize,
    pub media: usize,
    pub colors: usize,
}

impl LoadCounts {
    pub fn total(&self) -> usize {
        self.metadata + self.media + self.colors
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub metadata: i64,
    pub media: i64,
    pub colors: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Real(f) => Some(*f),
            Cell::Text(s) => s.parse().ok(),
            Cell::Null => None,
        }
    }
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Text(format!("<{} byte blob>", b.len())),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Real(r) => write!(f, "{}", r),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// The local SQLite file holding the three artifact tables.
pub struct LocalStore {
    conn: Connection,
    path: PathBuf,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::init(conn, path.to_path_buf())
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(StoreError::Schema)?;
        conn.execute_batch(SCHEMA).map_err(StoreError::Schema)?;
        debug!(path = %path.display(), "Store opened");
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts all three row sets in one transaction, skipping rows that are
    /// already present. Metadata goes first so the foreign keys resolve.
    pub fn load(
        &mut self,
        metadata: &[MetadataRow],
        media: &[MediaRow],
        colors: &[ColorRow],
    ) -> Result<LoadCounts, LoadError> {
        let tx = self.conn.transaction().map_err(LoadError::Transaction)?;
        let mut counts = LoadCounts::default();

        {
            let meta_err = |source: rusqlite::Error| LoadError::Insert { table: METADATA_TABLE, source };
            let mut stmt_metadata = tx
                .prepare(
                    "INSERT OR IGNORE INTO artifact_metadata
                     (id, title, culture, period, century, medium, dimensions, description,
                      department, classification, dated, accessionyear, accessionmethod)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                )
                .map_err(meta_err)?;
            for row in metadata {
                counts.metadata += stmt_metadata
                    .execute(params![
                        row.id,
                        row.title,
                        row.culture,
                        row.period,
                        row.century,
                        row.medium,
                        row.dimensions,
                        row.description,
                        row.department,
                        row.classification,
                        row.dated,
                        row.accessionyear,
                        row.accessionmethod
                    ])
                    .map_err(meta_err)?;
            }

            let media_err = |source: rusqlite::Error| LoadError::Insert { table: MEDIA_TABLE, source };
            let mut stmt_media = tx
                .prepare(
                    "INSERT OR IGNORE INTO artifact_media
                     (objectid, imagecount, mediacount, colorcount, rank, datebegin, dateend)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(media_err)?;
            for row in media {
                counts.media += stmt_media
                    .execute(params![
                        row.objectid,
                        row.imagecount,
                        row.mediacount,
                        row.colorcount,
                        row.rank,
                        row.datebegin,
                        row.dateend
                    ])
                    .map_err(media_err)?;
            }

            let color_err = |source: rusqlite::Error| LoadError::Insert { table: COLORS_TABLE, source };
            let mut stmt_color = tx
                .prepare(
                    "INSERT OR IGNORE INTO artifact_colors
                     (objectid, color, spectrum, hue, percent, css3)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(color_err)?;
            for row in colors {
                counts.colors += stmt_color
                    .execute(params![row.objectid, row.color, row.spectrum, row.hue, row.percent, row.css3])
                    .map_err(color_err)?;
            }
        }

        tx.commit().map_err(LoadError::Transaction)?;
        info!(
            metadata = counts.metadata,
            media = counts.media,
            colors = counts.colors,
            "Load committed"
        );
        Ok(counts)
    }

    /// Runs one read-only statement. Anything that could write is refused
    /// before it is stepped.
    pub fn query(&self, sql: &str, params: &[(&str, &dyn ToSql)]) -> Result<QueryResult, QueryError> {
        if !is_single_statement(sql) {
            return Err(QueryError::MultipleStatements);
        }
        // SQLite counts BEGIN, ATTACH and most PRAGMAs as read-only, so the
        // leading keyword is checked as well.
        let keyword = first_keyword(sql);
        if !QUERY_KEYWORDS.contains(&keyword.as_str()) {
            return Err(QueryError::NotReadOnly(keyword));
        }

        let mut stmt = self.conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(QueryError::NotReadOnly(keyword));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();
        let mut result = QueryResult { columns, rows: Vec::new() };

        let mut rows = stmt.query(params)?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(Cell::from(row.get_ref(i)?));
            }
            result.rows.push(cells);
        }
        Ok(result)
    }

    pub fn counts(&self) -> Result<TableCounts, StoreError> {
        let count = |table: &str| -> Result<i64, StoreError> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .map_err(StoreError::Count)
        };
        Ok(TableCounts {
            metadata: count(METADATA_TABLE)?,
            media: count(MEDIA_TABLE)?,
            colors: count(COLORS_TABLE)?,
        })
    }

    /// Color rows whose object is missing from `artifact_metadata`.
    pub fn orphaned_colors(&self) -> Result<i64, StoreError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM artifact_colors c
                 LEFT JOIN artifact_metadata m ON m.id = c.objectid
                 WHERE m.id IS NULL",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Count)
    }
}

/// Drops leading whitespace and comments.
fn skip_trivia(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix("--") {
            rest = after.find('\n').map_or("", |n| &after[n + 1..]);
        } else if let Some(after) = trimmed.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |n| &after[n + 2..]);
        } else {
            return trimmed;
        }
    }
}

/// True when `sql` holds at most one statement. Quoted text and comments are
/// skipped; trailing `;`, whitespace and comments are allowed.
fn is_single_statement(sql: &str) -> bool {
    let mut chars = sql.char_indices().peekable();
    let mut quote: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                for (_, n) in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = ' ';
                for (_, n) in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            ';' => {
                let mut rest = &sql[i..];
                while let Some(after) = skip_trivia(rest).strip_prefix(';') {
                    rest = after;
                }
                return skip_trivia(rest).is_empty();
            }
            _ => {}
        }
    }
    true
}

fn first_keyword(sql: &str) -> String {
    skip_trivia(sql)
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}
