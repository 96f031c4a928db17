use lakecat_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using CatalogError
pub type Result<T> = std::result::Result<T, CatalogError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on
/// without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidSnapshot,
    InvalidCursor,
    NotFound,
    AlreadyExists,
    ConstraintViolation,

    // Lineage
    LineageUnavailable,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidSnapshot => "ERR_INVALID_SNAPSHOT",
            ExErrorKind::InvalidCursor => "ERR_INVALID_CURSOR",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::LineageUnavailable => "ERR_LINEAGE_UNAVAILABLE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus whatever
/// catalog context was known where the error was raised.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    branch_id: Option<i64>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            branch_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (branch name, path, seed digest...)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add branch context
    pub fn with_branch_id(mut self, branch_id: i64) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn branch_id(&self) -> Option<i64> {
        self.branch_id
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(branch_id) = self.branch_id {
            write!(f, " (branch_id: {})", branch_id)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by the pure catalog model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Raw snapshot value is not a sentinel and not a positive commit
    #[error("Invalid snapshot value: {raw}")]
    InvalidSnapshot { raw: String },

    /// Read buffer must hold at least one row
    #[error("Buffer size must be positive, got {buffer_size}")]
    InvalidBufferSize { buffer_size: usize },

    /// Branch does not exist
    #[error("Branch not found: {branch}")]
    BranchNotFound { branch: String },

    /// Pagination cursor could not be decoded
    #[error("Invalid cursor: {cursor}")]
    InvalidCursor { cursor: String },

    /// Version row with the same (branch, path, min_commit) already exists
    #[error("Duplicate version of {path} on branch {branch_id} at commit {min_commit}")]
    DuplicateVersion {
        branch_id: i64,
        path: String,
        min_commit: i64,
    },
}

/// Conversion from CatalogError to ExError
impl From<CatalogError> for ExError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidSnapshot { raw } => ExError::new(ExErrorKind::InvalidSnapshot)
                .with_entity_id(raw)
                .with_message("snapshot must be 'committed', 'uncommitted' or a positive commit"),

            CatalogError::InvalidBufferSize { buffer_size } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("read_options")
                    .with_message(format!("buffer size must be positive, got {}", buffer_size))
            }

            CatalogError::BranchNotFound { branch } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(branch)
                .with_message("branch not found"),

            CatalogError::InvalidCursor { cursor } => ExError::new(ExErrorKind::InvalidCursor)
                .with_entity_id(cursor)
                .with_message("cursor is not a valid encoded path"),

            CatalogError::DuplicateVersion {
                branch_id,
                path,
                min_commit,
            } => ExError::new(ExErrorKind::AlreadyExists)
                .with_branch_id(branch_id)
                .with_entity_id(path)
                .with_message(format!("version at commit {} already exists", min_commit)),
        }
    }
}
