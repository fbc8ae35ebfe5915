use thiserror::Error;

/// Convenience alias for `Result<T, ShardlineError>`.
pub type ShardlineResult<T> = Result<T, ShardlineError>;

/// Error classification for the query-compilation and event pipelines.
///
/// - `UserError`: bad input for one query; abort that query only
/// - `Configuration`: rejected operation detected while compiling a query
/// - `Transient`: resource limit or closed channel; caller MAY retry
/// - `InternalBug`: should never happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserError,
    Configuration,
    Transient,
    InternalBug,
}

/// Top-level error type that all crate-specific errors convert into.
#[derive(Error, Debug)]
pub enum ShardlineError {
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Metadata error: {0}")]
    MetaData(#[from] MetaDataError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Transient resource/backpressure error.
    #[error("Transient: {0}")]
    Transient(String),

    /// Internal bug: should never occur in production.
    #[error("InternalBug [{error_code}]: {message}")]
    InternalBug {
        error_code: &'static str,
        message: String,
    },
}

/// Cross-shard merge errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// The aggregate function kind has no merge strategy.
    #[error("Unsupported SQL operation: {0}")]
    UnsupportedAggregation(String),

    #[error("Column index out of bounds: {0}")]
    ColumnOutOfBounds(usize),

    #[error("Group limit exceeded: more than {0} groups buffered in memory")]
    GroupLimitExceeded(usize),

    /// A shard shipped a partial value the aggregate cannot fold.
    #[error("Invalid partial value for {function}: {value}")]
    InvalidPartial {
        function: &'static str,
        value: String,
    },
}

/// Routing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Sharding column '{column}' of table '{table}' has an unhashable value")]
    UnroutableValue { table: String, column: String },

    #[error("Auto table '{0}' has no storage units")]
    NoDataNodes(String),

    /// Sharded tables in one query must share a data node layout.
    #[error("Sharded tables are not bound to one layout: {0}")]
    UnboundTables(String),
}

/// Rule metadata errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaDataError {
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Database already exists: {0}")]
    DatabaseAlreadyExists(String),

    #[error("Storage unit '{storage_unit}' is not registered in database '{database}'")]
    UnknownStorageUnit {
        database: String,
        storage_unit: String,
    },

    #[error("Invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Stale rule event for '{rule}': version {version} <= applied {applied}")]
    StaleVersion {
        rule: String,
        version: u64,
        applied: u64,
    },

    #[error("Subscriber '{0}' has no context manager attached")]
    NotBound(String),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ShardlineError {
    /// Classify this error for abort/retry decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShardlineError::Merge(MergeError::UnsupportedAggregation(_)) => {
                ErrorKind::Configuration
            }
            ShardlineError::Merge(MergeError::GroupLimitExceeded(_)) => ErrorKind::Transient,
            ShardlineError::Merge(MergeError::ColumnOutOfBounds(_)) => ErrorKind::InternalBug,
            ShardlineError::Merge(MergeError::InvalidPartial { .. }) => ErrorKind::UserError,
            ShardlineError::Route(_) => ErrorKind::UserError,
            ShardlineError::MetaData(MetaDataError::NotBound(_)) => ErrorKind::InternalBug,
            ShardlineError::MetaData(_) => ErrorKind::UserError,
            ShardlineError::Config(_) => ErrorKind::Configuration,
            ShardlineError::Transient(_) => ErrorKind::Transient,
            ShardlineError::InternalBug { .. } => ErrorKind::InternalBug,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient)
    }

    pub fn is_internal_bug(&self) -> bool {
        matches!(self.kind(), ErrorKind::InternalBug)
    }

    /// Construct an internal-bug error with a stable error code.
    pub fn internal_bug(error_code: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(error_code, %message, "internal bug");
        ShardlineError::InternalBug {
            error_code,
            message,
        }
    }
}
