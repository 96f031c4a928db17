//! Result types and pagination helpers for the read-only query surface.
//!
//! All types are plain data containers with no I/O or mutation.

#![allow(clippy::result_large_err)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use lakecat_core::errors::{CatalogError, ExError, ExErrorKind};
use lakecat_core::EntryRecord;
use lakecat_store::entries::DEFAULT_BUFFER_SIZE;
use lakecat_store::errors::Result;
use serde::Serialize;

/// Default maximum items per paginated list query.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Upper bound on `limit`; larger requests are clamped.
pub const MAX_LIST_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Options controlling a paginated entry listing.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Maximum number of items to return (defaults to `DEFAULT_LIST_LIMIT`).
    pub limit: Option<usize>,
    /// Opaque cursor from a previous response (encoded last path).
    pub cursor: Option<String>,
    /// Rows fetched per round-trip for each branch in the lineage
    /// (defaults to `DEFAULT_BUFFER_SIZE`).
    pub buffer_size: Option<usize>,
}

impl ListOptions {
    /// Effective limit: `limit.unwrap_or(DEFAULT_LIST_LIMIT)`, clamped to `MAX_LIST_LIMIT`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an explicit limit of zero.
    pub fn effective_limit(&self) -> Result<usize> {
        match self.limit {
            Some(0) => Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("list_options")
                .with_message("limit must be positive")),
            Some(limit) => Ok(limit.min(MAX_LIST_LIMIT)),
            None => Ok(DEFAULT_LIST_LIMIT),
        }
    }

    pub fn effective_buffer_size(&self) -> usize {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    /// Decode the cursor to the path to resume after.
    ///
    /// # Errors
    ///
    /// `InvalidCursor` when the cursor is not an encoded path.
    pub fn decode_cursor(&self) -> Result<Option<String>> {
        self.cursor.as_deref().map(decode_cursor).transpose()
    }
}

/// A paginated page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Opaque cursor for the next page; `None` when this is the last page.
    pub cursor: Option<String>,
    /// Whether more items exist after this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from a raw over-fetched list.
    ///
    /// `raw` should contain `limit + 1` items at most. If `raw.len() > limit`,
    /// the extra item is dropped and `has_more` is set to `true`.
    pub fn from_overshot(mut raw: Vec<T>, limit: usize, cursor_fn: impl Fn(&T) -> String) -> Self {
        let has_more = raw.len() > limit;
        if has_more {
            raw.truncate(limit);
        }
        let cursor = if has_more {
            raw.last().map(|item| encode_cursor(&cursor_fn(item)))
        } else {
            None
        };
        Page {
            items: raw,
            cursor,
            has_more,
        }
    }

    /// Convert every item, keeping the cursor; stops at the first error.
    ///
    /// # Errors
    ///
    /// The first error returned by `f`.
    pub fn try_map<U>(self, f: impl FnMut(T) -> Result<U>) -> Result<Page<U>> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<Vec<_>>>()?,
            cursor: self.cursor,
            has_more: self.has_more,
        })
    }
}

/// A page of entry records.
pub type EntryPage = Page<EntryRecord>;

// ---------------------------------------------------------------------------
// Cursor encoding
// ---------------------------------------------------------------------------

/// Encode a path as an opaque cursor.
pub fn encode_cursor(path: &str) -> String {
    URL_SAFE_NO_PAD.encode(path.as_bytes())
}

/// Decode a cursor produced by [`encode_cursor`].
///
/// # Errors
///
/// `InvalidCursor` when the input is not URL-safe base64 of a UTF-8 path.
pub fn decode_cursor(cursor: &str) -> Result<String> {
    let invalid = || {
        ExError::from(CatalogError::InvalidCursor {
            cursor: cursor.to_string(),
        })
        .with_op("decode_cursor")
    };
    let bytes = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| invalid())?;
    String::from_utf8(bytes).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        let path = "tables/orders/part-0001.parquet";
        let cursor = encode_cursor(path);
        assert!(!cursor.contains('/'));
        assert_eq!(decode_cursor(&cursor).unwrap(), path);
    }

    #[test]
    fn test_garbage_cursor_is_rejected() {
        let err = decode_cursor("!!not-base64!!").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidCursor);

        // Valid base64, invalid UTF-8
        let err = decode_cursor(&URL_SAFE_NO_PAD.encode([0xff, 0xfe])).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidCursor);
    }

    #[test]
    fn test_from_overshot_sets_cursor_only_when_more() {
        let page = Page::from_overshot(vec!["a", "b", "c"], 2, |s| s.to_string());
        assert_eq!(page.items, vec!["a", "b"]);
        assert!(page.has_more);
        assert_eq!(decode_cursor(page.cursor.as_deref().unwrap()).unwrap(), "b");

        let page = Page::from_overshot(vec!["a", "b"], 2, |s| s.to_string());
        assert!(!page.has_more);
        assert!(page.cursor.is_none());
    }

    #[test]
    fn test_limit_defaults_and_clamps() {
        assert_eq!(
            ListOptions::default().effective_limit().unwrap(),
            DEFAULT_LIST_LIMIT
        );
        let big = ListOptions {
            limit: Some(50_000),
            ..Default::default()
        };
        assert_eq!(big.effective_limit().unwrap(), MAX_LIST_LIMIT);

        let zero = ListOptions {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(
            zero.effective_limit().unwrap_err().kind(),
            ExErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_try_map_keeps_pagination() {
        let page = Page::from_overshot(vec![1, 2, 3], 2, |n| n.to_string());
        let mapped = page.try_map(|n| Ok(n * 10)).unwrap();
        assert_eq!(mapped.items, vec![10, 20]);
        assert!(mapped.has_more);
    }
}
