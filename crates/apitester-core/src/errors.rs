use apitester_core_types::RequestId;
use thiserror::Error;

/// Result type alias using ApiTesterError
pub type Result<T> = std::result::Result<T, ApiTesterError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that is safe to match on in tests,
/// log pipelines and `error` event consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,

    // Snapshot cycle
    /// A per-type entity fetch failed; the rest of the batch continued
    FetchFailed,
    /// The snapshot routine failed outside the per-type fetch loop
    SnapshotAborted,

    // Integration/IO
    Io,
    Serialization,
    ExternalService,
    Timeout,
    InvalidConfig,

    // Auth
    Unauthorised,
    Forbidden,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::FetchFailed => "ERR_FETCH_FAILED",
            ExErrorKind::SnapshotAborted => "ERR_SNAPSHOT_ABORTED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Unauthorised => "ERR_UNAUTHORISED",
            ExErrorKind::Forbidden => "ERR_FORBIDDEN",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the entity and
/// cycle context needed to explain a failure in an `error` event.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_type: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_type: None,
            entity_id: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity type context
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add snapshot cycle context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
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

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity type context, if any
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the snapshot cycle context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
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
        if let Some(entity_type) = &self.entity_type {
            write!(f, " (entity_type: {})", entity_type)?;
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
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Concrete failures raised by the detector, the snapshot manager and the
/// HTTP collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiTesterError {
    /// A request path segment does not percent-decode to UTF-8
    #[error("Invalid path segment: {segment}")]
    InvalidPathSegment { segment: String },

    /// The backend answered with a status the caller cannot interpret
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The backend rejected the credentials
    #[error("Unauthorised request to {url}")]
    Unauthorised { url: String },

    /// The backend refused access
    #[error("Forbidden request to {url}")]
    Forbidden { url: String },

    /// The request never completed
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    /// The request timed out
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// A payload could not be interpreted
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// Configuration file or environment is unusable
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Reading a local file failed
    #[error("I/O failure on {path}: {reason}")]
    Io { path: String, reason: String },

    /// The snapshot routine panicked
    #[error("{phase} snapshot routine panicked: {reason}")]
    SnapshotPanicked { phase: String, reason: String },
}

/// Conversion from the concrete error enum into the structured facility
impl From<ApiTesterError> for ExError {
    fn from(err: ApiTesterError) -> Self {
        match err {
            ApiTesterError::InvalidPathSegment { segment } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("detect_entity_ids")
                    .with_message(format!(
                        "path segment `{}` is not valid percent-encoded UTF-8",
                        segment
                    ))
            }

            ApiTesterError::UnexpectedStatus { status, url } => {
                ExError::new(ExErrorKind::ExternalService)
                    .with_message(format!("status {} from {}", status, url))
            }

            ApiTesterError::Unauthorised { url } => ExError::new(ExErrorKind::Unauthorised)
                .with_message(format!("credentials rejected by {}", url)),

            ApiTesterError::Forbidden { url } => ExError::new(ExErrorKind::Forbidden)
                .with_message(format!("access refused by {}", url)),

            ApiTesterError::Transport { reason } => {
                ExError::new(ExErrorKind::ExternalService).with_message(reason)
            }

            ApiTesterError::Timeout { url } => ExError::new(ExErrorKind::Timeout)
                .with_message(format!("request to {} timed out", url)),

            ApiTesterError::InvalidPayload { reason } => {
                ExError::new(ExErrorKind::Serialization).with_message(reason)
            }

            ApiTesterError::InvalidConfig { reason } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(reason)
            }

            ApiTesterError::Io { path, reason } => {
                ExError::new(ExErrorKind::Io).with_message(format!("{}: {}", path, reason))
            }

            ApiTesterError::SnapshotPanicked { phase, reason } => {
                ExError::new(ExErrorKind::SnapshotAborted)
                    .with_op(format!("take_{}_snapshot", phase))
                    .with_message(format!("routine panicked: {}", reason))
            }
        }
    }
}
