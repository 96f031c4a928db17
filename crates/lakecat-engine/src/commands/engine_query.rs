//! Engine-level read-only query surface.
//!
//! `apply_engine_query` is the single entry point for read-only queries that
//! span the store and core layers. It accepts a shared connection and never
//! writes to the catalog.

#![allow(clippy::result_large_err)]

use lakecat_core::errors::{CatalogError, ExError};
use lakecat_core::{log_op_end, log_op_error, log_op_start};
use lakecat_core::{Branch, Snapshot};
use lakecat_core_types::correlation::RequestContext;
use lakecat_store::entries::{drain, LineageReader, ReadOptions};
use lakecat_store::errors::{from_rusqlite, Result};
use lakecat_store::lineage::{LineageResolver, SqliteLineageResolver};
use lakecat_store::repo::SqliteRepo;
use rusqlite::Connection;

use crate::commands::read_tools::{EntryPage, ListOptions, Page};

// ---------------------------------------------------------------------------
// EngineQuery
// ---------------------------------------------------------------------------

/// Read-only queries supported by the engine.
#[derive(Debug, Clone)]
pub enum EngineQuery {
    /// List the significant version of every path visible to a branch at a
    /// snapshot, merged over the branch's lineage, in ascending path order.
    ListEntries {
        branch_id: i64,
        snapshot: Snapshot,
        options: ListOptions,
    },
    /// Look up a branch by name.
    GetBranch { name: String },
}

impl EngineQuery {
    fn op(&self) -> &'static str {
        match self {
            EngineQuery::ListEntries { .. } => "list_entries",
            EngineQuery::GetBranch { .. } => "get_branch",
        }
    }
}

/// Results returned by `apply_engine_query`.
#[derive(Debug, Clone)]
pub enum EngineQueryResult {
    Entries(EntryPage),
    Branch(Branch),
}

// ---------------------------------------------------------------------------
// apply_engine_query
// ---------------------------------------------------------------------------

/// Dispatch a read-only engine query.
///
/// Every query logs one start and one end (or end_error) event carrying the
/// request id. Errors are tagged with the request id of `ctx`.
///
/// # Errors
///
/// - `NotFound` when the branch does not exist
/// - `InvalidInput` / `InvalidCursor` for bad list options
/// - `LineageUnavailable` when the branch lineage cannot be loaded
/// - `Persistence` when a storage read fails
pub fn apply_engine_query(
    query: EngineQuery,
    conn: &Connection,
    ctx: &RequestContext,
) -> Result<EngineQueryResult> {
    let op = query.op();
    let request_id = ctx.request_id.to_string();
    log_op_start!(op, request_id = %request_id);
    let start = std::time::Instant::now();

    let result = (|| -> Result<EngineQueryResult> {
        match &query {
            EngineQuery::ListEntries {
                branch_id,
                snapshot,
                options,
            } => {
                list_entries(conn, *branch_id, *snapshot, options).map(EngineQueryResult::Entries)
            }
            EngineQuery::GetBranch { name } => {
                get_branch(conn, name).map(EngineQueryResult::Branch)
            }
        }
    })();

    let elapsed = start.elapsed().as_millis() as u64;
    match result {
        Ok(value) => {
            match &value {
                EngineQueryResult::Entries(page) => {
                    log_op_end!(
                        op,
                        duration_ms = elapsed,
                        request_id = %request_id,
                        rows = page.items.len(),
                        has_more = page.has_more
                    );
                }
                EngineQueryResult::Branch(_) => {
                    log_op_end!(op, duration_ms = elapsed, request_id = %request_id);
                }
            }
            Ok(value)
        }
        Err(e) => {
            let e = tag_with_context(e, ctx);
            log_op_error!(op, e.clone(), duration_ms = elapsed, request_id = %request_id);
            Err(e)
        }
    }
}

fn tag_with_context(err: ExError, ctx: &RequestContext) -> ExError {
    let err = err.with_request_id(ctx.request_id.clone());
    match &ctx.trace_id {
        Some(trace_id) => err.with_trace_id(trace_id.clone()),
        None => err,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn list_entries(
    conn: &Connection,
    branch_id: i64,
    snapshot: Snapshot,
    options: &ListOptions,
) -> Result<EntryPage> {
    let limit = options.effective_limit()?;
    let after = options.decode_cursor()?;

    let mut read_options = ReadOptions::default()
        .with_buffer_size(options.effective_buffer_size())
        .with_limit(limit + 1);
    if let Some(after) = after {
        read_options = read_options.with_after(after);
    }
    read_options.validate()?;

    // Lineage resolution, the merge and locator lookups see one snapshot of the catalog
    let tx = conn.unchecked_transaction().map_err(from_rusqlite)?;

    if SqliteRepo::get_branch(&tx, branch_id)?.is_none() {
        return Err(ExError::from(CatalogError::BranchNotFound {
            branch: branch_id.to_string(),
        })
        .with_op("list_entries")
        .with_branch_id(branch_id));
    }

    let ancestors = SqliteLineageResolver::new(&tx).resolve(branch_id, snapshot)?;
    let rows = {
        let mut reader = LineageReader::new(&tx, branch_id, snapshot, &ancestors, &read_options)?;
        drain(&mut reader)?
    };

    let page = Page::from_overshot(rows, limit, |row| row.path.clone()).try_map(|row| {
        Ok(SqliteRepo::get_entry_by_locator(&tx, row.row_locator)?.with_bounds_of(&row))
    })?;

    tx.commit().map_err(from_rusqlite)?;
    Ok(page)
}

fn get_branch(conn: &Connection, name: &str) -> Result<Branch> {
    SqliteRepo::get_branch_by_name(conn, name)?.ok_or_else(|| {
        ExError::from(CatalogError::BranchNotFound {
            branch: name.to_string(),
        })
        .with_op("get_branch")
        .with_entity_id(name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::read_tools::decode_cursor;
    use lakecat_core::errors::ExErrorKind;
    use lakecat_core::CommitId;
    use lakecat_store::repo::NewEntry;

    fn setup() -> (Connection, i64) {
        let mut conn = Connection::open_in_memory().unwrap();
        lakecat_store::migrations::apply_migrations(&mut conn).unwrap();
        let main = SqliteRepo::create_branch(&conn, "main", 0).unwrap();
        SqliteRepo::insert_commit(&conn, main.id, CommitId(1), "init", 0).unwrap();
        for path in ["a", "b", "c", "d", "e"] {
            let entry = NewEntry::new(path, CommitId(1), format!("mem://{path}"));
            SqliteRepo::insert_entry(&conn, main.id, &entry).unwrap();
        }
        (conn, main.id)
    }

    fn list(conn: &Connection, branch_id: i64, options: ListOptions) -> Result<EntryPage> {
        let query = EngineQuery::ListEntries {
            branch_id,
            snapshot: Snapshot::Committed,
            options,
        };
        match apply_engine_query(query, conn, &RequestContext::new())? {
            EngineQueryResult::Entries(page) => Ok(page),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_list_entries_first_page() {
        let (conn, main) = setup();
        let page = list(
            &conn,
            main,
            ListOptions {
                limit: Some(2),
                ..Default::default()
            },
        )
        .unwrap();

        let paths: Vec<_> = page.items.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b"]);
        assert!(page.has_more);
        assert_eq!(decode_cursor(page.cursor.as_deref().unwrap()).unwrap(), "b");
        assert_eq!(page.items[0].physical_address, "mem://a");
    }

    #[test]
    fn test_list_entries_last_page_has_no_cursor() {
        let (conn, main) = setup();
        let page = list(&conn, main, ListOptions::default()).unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(!page.has_more);
        assert!(page.cursor.is_none());
    }

    #[test]
    fn test_unknown_branch_is_not_found() {
        let (conn, _) = setup();
        let err = list(&conn, 999, ListOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert!(err.request_id().is_some());
    }

    #[test]
    fn test_get_branch() {
        let (conn, main) = setup();
        let query = EngineQuery::GetBranch {
            name: "main".to_string(),
        };
        match apply_engine_query(query, &conn, &RequestContext::new()).unwrap() {
            EngineQueryResult::Branch(branch) => assert_eq!(branch.id, main),
            other => panic!("unexpected result: {:?}", other),
        }

        let missing = EngineQuery::GetBranch {
            name: "nope".to_string(),
        };
        let err = apply_engine_query(missing, &conn, &RequestContext::new()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.entity_id(), Some("nope"));
    }

    #[test]
    fn test_zero_buffer_size_is_rejected() {
        let (conn, main) = setup();
        let err = list(
            &conn,
            main,
            ListOptions {
                buffer_size: Some(0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
