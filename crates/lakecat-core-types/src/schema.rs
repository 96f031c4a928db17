//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Catalog identifiers
pub const FIELD_BRANCH_ID: &str = "branch_id";
pub const FIELD_SNAPSHOT: &str = "snapshot";
pub const FIELD_PATH: &str = "path";

// Reader sizes
pub const FIELD_ROWS: &str = "rows";
pub const FIELD_BUFFER_SIZE: &str = "buffer_size";
pub const FIELD_LINEAGE_LEN: &str = "lineage_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
