//! Entry query builder
//!
//! Describes the handful of SELECT shapes the readers need against the
//! `entries` table and renders them to SQL with numbered placeholders.
//! Every shape returns rows ordered by `(path, min_commit DESC)`.

use lakecat_core::{CommitId, CommitRange, Snapshot};
use rusqlite::types::Value;

const ROW_COLUMNS: &str = "branch_id, path, min_commit, max_commit, rowid AS row_locator";
const ROW_ORDER: &str = "ORDER BY path, min_commit DESC";

/// Which paths a select admits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathBound {
    /// Every path
    Any,
    /// Paths strictly greater than this one
    After(String),
    /// Only this path, versions with `min_commit` strictly below `below`
    OlderVersionsOf { path: String, below: CommitId },
}

/// One filtered, ordered, optionally limited select over a branch's rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub branch_id: i64,
    pub visibility: CommitRange,
    pub bound: PathBound,
    pub limit: Option<usize>,
}

impl SelectQuery {
    /// Rows of `branch_id` admitted by `snapshot`, any path, unlimited
    pub fn visible(branch_id: i64, snapshot: Snapshot) -> Self {
        Self {
            branch_id,
            visibility: snapshot.visibility(),
            bound: PathBound::Any,
            limit: None,
        }
    }

    /// Restrict to paths strictly after `after`; `None` starts at the beginning
    pub fn after(mut self, after: Option<&str>) -> Self {
        self.bound = match after {
            Some(path) => PathBound::After(path.to_string()),
            None => PathBound::Any,
        };
        self
    }

    /// Restrict to the remaining, older versions of one path
    pub fn older_versions_of(mut self, path: &str, below: CommitId) -> Self {
        self.bound = PathBound::OlderVersionsOf {
            path: path.to_string(),
            below,
        };
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn render(&self, params: &mut Vec<Value>) -> String {
        let mut sql = format!(
            "SELECT {} FROM entries WHERE branch_id = {}",
            ROW_COLUMNS,
            bind(params, self.branch_id)
        );

        if let Some(lower) = self.visibility.lower {
            sql.push_str(&format!(" AND min_commit >= {}", bind(params, lower.value())));
        }
        if let Some(upper) = self.visibility.upper {
            sql.push_str(&format!(" AND min_commit <= {}", bind(params, upper.value())));
        }

        match &self.bound {
            PathBound::Any => {}
            PathBound::After(path) => {
                sql.push_str(&format!(" AND path > {}", bind(params, path.clone())));
            }
            PathBound::OlderVersionsOf { path, below } => {
                sql.push_str(&format!(" AND path = {}", bind(params, path.clone())));
                sql.push_str(&format!(" AND min_commit < {}", bind(params, below.value())));
            }
        }

        sql.push(' ');
        sql.push_str(ROW_ORDER);

        if let Some(limit) = self.limit {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            sql.push_str(&format!(" LIMIT {}", bind(params, limit)));
        }
        sql
    }
}

/// A query the storage collaborator can execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryQuery {
    Select(SelectQuery),
    /// Both selects' rows, re-ordered as one stream
    UnionAll(SelectQuery, SelectQuery),
}

impl EntryQuery {
    pub fn select(query: SelectQuery) -> Self {
        EntryQuery::Select(query)
    }

    pub fn union_all(first: SelectQuery, second: SelectQuery) -> Self {
        EntryQuery::UnionAll(first, second)
    }

    /// Render to SQL plus positional parameters (`?1`, `?2`, ...)
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = match self {
            EntryQuery::Select(query) => query.render(&mut params),
            EntryQuery::UnionAll(first, second) => {
                // Each side keeps its own ORDER BY/LIMIT inside a subquery
                let first = first.render(&mut params);
                let second = second.render(&mut params);
                format!(
                    "SELECT * FROM ({}) UNION ALL SELECT * FROM ({}) {}",
                    first, second, ROW_ORDER
                )
            }
        };
        (sql, params)
    }
}

fn bind(params: &mut Vec<Value>, value: impl Into<Value>) -> String {
    params.push(value.into());
    format!("?{}", params.len())
}
