//! Integration tests for `apply_engine_query` over a seeded three-generation catalog.
//!
//! main (commits 1-4) <- dev forked at 2 <- feature forked at 1

use lakecat_core::logging_facility::init_test_capture;
use lakecat_core::{CommitId, ExErrorKind, Snapshot};
use lakecat_core_types::correlation::RequestContext;
use lakecat_engine::commands::read_tools::{decode_cursor, encode_cursor};
use lakecat_engine::{apply_engine_query, EngineQuery, EngineQueryResult, EntryPage, ListOptions};
use lakecat_store::repo::SqliteRepo;
use rusqlite::Connection;
use tempfile::TempDir;

const SEED: &str = r#"
schema_version: 0
branches:
  - name: main
    commits: [{id: 1}, {id: 2}, {id: 3}, {id: 4}]
    entries:
      - {path: a/1.parquet, min_commit: 1, physical_address: "mem://main/a1"}
      - {path: b/1.parquet, min_commit: 1, physical_address: "mem://main/b1"}
      - {path: c/1.parquet, min_commit: 1, max_commit: 2, physical_address: "mem://main/c1-v1"}
      - {path: c/1.parquet, min_commit: 2, physical_address: "mem://main/c1-v2", size: 512}
      - {path: d/1.parquet, min_commit: 1, max_commit: 3, physical_address: "mem://main/d1"}
      - {path: e/1.parquet, min_commit: 4, physical_address: "mem://main/e1"}
  - name: dev
    parent: main
    fork_commit: 2
    commits: [{id: 1}, {id: 2}]
    entries:
      - {path: b/1.parquet, min_commit: 1, physical_address: "mem://dev/b1"}
      - {path: b/2.parquet, min_commit: 2, physical_address: "mem://dev/b2"}
      - {path: f/1.parquet, min_commit: 0, physical_address: "mem://dev/f1-staged"}
  - name: feature
    parent: dev
    fork_commit: 1
    commits: [{id: 1}]
    entries:
      - {path: a/1.parquet, min_commit: 1, physical_address: "mem://feature/a1"}
      - {path: g/1.parquet, min_commit: 1, physical_address: "mem://feature/g1"}
"#;

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn setup() -> (TempDir, Connection) {
    let temp_dir = TempDir::new().unwrap();
    let mut conn = lakecat_store::db::open_catalog(temp_dir.path().join("catalog.db")).unwrap();
    lakecat_store::seed::import_seed_str(SEED, &mut conn).unwrap();
    (temp_dir, conn)
}

fn branch_id(conn: &Connection, name: &str) -> i64 {
    SqliteRepo::get_branch_by_name(conn, name)
        .unwrap()
        .unwrap()
        .id
}

fn list(
    conn: &Connection,
    branch: &str,
    snapshot: Snapshot,
    options: ListOptions,
) -> lakecat_store::Result<EntryPage> {
    let query = EngineQuery::ListEntries {
        branch_id: branch_id(conn, branch),
        snapshot,
        options,
    };
    match apply_engine_query(query, conn, &RequestContext::new())? {
        EngineQueryResult::Entries(page) => Ok(page),
        other => panic!("unexpected result: {:?}", other),
    }
}

fn addresses(page: &EntryPage) -> Vec<&str> {
    page.items
        .iter()
        .map(|e| e.physical_address.as_str())
        .collect()
}

fn with_limit(limit: usize, cursor: Option<String>) -> ListOptions {
    ListOptions {
        limit: Some(limit),
        cursor,
        buffer_size: Some(2),
    }
}

// ---------------------------------------------------------------------------
// Merged listing
// ---------------------------------------------------------------------------

#[test]
fn test_feature_sees_nearest_version_of_each_path() {
    let (_tmp, conn) = setup();

    let page = list(&conn, "feature", Snapshot::Committed, ListOptions::default()).unwrap();

    assert_eq!(
        addresses(&page),
        vec![
            "mem://feature/a1",
            "mem://dev/b1",
            "mem://main/c1-v2",
            "mem://main/d1",
            "mem://feature/g1",
        ]
    );
    assert!(!page.has_more);
    assert!(page.cursor.is_none());

    // d/1 was dropped on main after dev forked, so it is alive here
    let d = &page.items[3];
    assert!(d.max_commit.is_max());
    assert_eq!(page.items[2].size, 512);
}

#[test]
fn test_uncommitted_snapshot_includes_staged_writes() {
    let (_tmp, conn) = setup();

    let committed = list(&conn, "dev", Snapshot::Committed, ListOptions::default()).unwrap();
    let uncommitted = list(&conn, "dev", Snapshot::Uncommitted, ListOptions::default()).unwrap();

    assert!(!addresses(&committed).contains(&"mem://dev/f1-staged"));
    let staged = uncommitted
        .items
        .iter()
        .find(|e| e.path == "f/1.parquet")
        .unwrap();
    assert_eq!(staged.min_commit, CommitId::STAGED);
}

#[test]
fn test_pinned_snapshot_on_main() {
    let (_tmp, conn) = setup();

    let at_one = list(&conn, "main", Snapshot::At(CommitId(1)), ListOptions::default()).unwrap();
    assert_eq!(
        addresses(&at_one),
        vec![
            "mem://main/a1",
            "mem://main/b1",
            "mem://main/c1-v1",
            "mem://main/d1",
        ]
    );

    // The first version of c/1 was closed at commit 2, which is not visible at 1
    assert!(at_one.items[2].max_commit.is_max());
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[test]
fn test_pages_follow_cursor_without_gaps() {
    let (_tmp, conn) = setup();

    let first = list(&conn, "feature", Snapshot::Committed, with_limit(2, None)).unwrap();
    assert_eq!(
        addresses(&first),
        vec!["mem://feature/a1", "mem://dev/b1"]
    );
    assert!(first.has_more);
    assert_eq!(
        decode_cursor(first.cursor.as_deref().unwrap()).unwrap(),
        "b/1.parquet"
    );

    let second = list(&conn, "feature", Snapshot::Committed, with_limit(2, first.cursor)).unwrap();
    assert_eq!(
        addresses(&second),
        vec!["mem://main/c1-v2", "mem://main/d1"]
    );
    assert!(second.has_more);

    let third = list(&conn, "feature", Snapshot::Committed, with_limit(2, second.cursor)).unwrap();
    assert_eq!(addresses(&third), vec!["mem://feature/g1"]);
    assert!(!third.has_more);
    assert!(third.cursor.is_none());
}

#[test]
fn test_exact_fit_page_reports_no_more() {
    let (_tmp, conn) = setup();

    let page = list(&conn, "feature", Snapshot::Committed, with_limit(5, None)).unwrap();
    assert_eq!(page.items.len(), 5);
    assert!(!page.has_more);
}

#[test]
fn test_cursor_past_the_end_is_empty() {
    let (_tmp, conn) = setup();

    let cursor = Some(encode_cursor("zzz"));
    let page = list(&conn, "feature", Snapshot::Committed, with_limit(10, cursor)).unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_more);
}

#[test]
fn test_invalid_cursor_is_rejected() {
    let (_tmp, conn) = setup();

    let options = ListOptions {
        cursor: Some("%%%".to_string()),
        ..Default::default()
    };
    let err = list(&conn, "main", Snapshot::Committed, options).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidCursor);
}

#[test]
fn test_page_serializes_for_json_output() {
    let (_tmp, conn) = setup();

    let page = list(&conn, "main", Snapshot::Committed, with_limit(1, None)).unwrap();
    let json = serde_json::to_value(&page).unwrap();

    assert_eq!(json["has_more"], serde_json::json!(true));
    assert_eq!(json["items"][0]["path"], "a/1.parquet");
    assert!(json["cursor"].is_string());
}

#[test]
fn test_read_leaves_catalog_unchanged() {
    let (_tmp, conn) = setup();
    let count = |conn: &Connection| -> i64 {
        conn.query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))
            .unwrap()
    };

    let before = count(&conn);
    list(&conn, "feature", Snapshot::Committed, with_limit(2, None)).unwrap();
    assert_eq!(count(&conn), before);
    assert!(conn.is_autocommit());
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[test]
fn test_query_logs_start_and_end_with_request_id() {
    let capture = init_test_capture();
    let (_tmp, conn) = setup();
    let ctx = RequestContext::from_incoming(Some("req-list-entries-log"));

    let query = EngineQuery::ListEntries {
        branch_id: branch_id(&conn, "main"),
        snapshot: Snapshot::Committed,
        options: ListOptions::default(),
    };
    apply_engine_query(query, &conn, &ctx).unwrap();

    let events: Vec<_> = capture
        .events_for_op("list_entries")
        .into_iter()
        .filter(|e| e.field("request_id") == Some("req-list-entries-log"))
        .collect();
    let kinds: Vec<_> = events.iter().filter_map(|e| e.event.as_deref()).collect();
    assert_eq!(kinds, vec!["start", "end"]);
    assert_eq!(events[1].field("rows"), Some("5"));
}

#[test]
fn test_failed_query_logs_error_and_tags_request() {
    let capture = init_test_capture();
    let (_tmp, conn) = setup();
    let ctx = RequestContext::from_incoming(Some("req-get-branch-missing"));

    let query = EngineQuery::GetBranch {
        name: "missing".to_string(),
    };
    let err = apply_engine_query(query, &conn, &ctx).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(
        err.request_id().map(|r| r.as_str()),
        Some("req-get-branch-missing")
    );

    let errored = capture.count_events(|e| {
        e.op.as_deref() == Some("get_branch")
            && e.event.as_deref() == Some("end_error")
            && e.field("request_id") == Some("req-get-branch-missing")
    });
    assert_eq!(errored, 1);
}
