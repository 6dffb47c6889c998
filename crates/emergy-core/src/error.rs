use std::path::PathBuf;
use thiserror::Error;

/// HTTP-style status used when an upstream failure carries no status of its own.
pub const DEFAULT_UPSTREAM_STATUS: u16 = 502;

/// All errors produced by the emergy calculator.
///
/// The `Display` output of every variant is the human-readable detail that is
/// shown to the caller as-is.
#[derive(Error, Debug)]
pub enum EmergyError {
    /// One or more required columns are absent from the flow table.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The `Amount` column contains a cell that is not numeric.
    #[error("Invalid values found in column 'Amount'.")]
    InvalidAmount,

    /// The `UEV` column contains a non-numeric cell on a row that needs one.
    #[error("Invalid values found in column 'UEV' for input entries.")]
    InvalidUev,

    /// Input rows with a blank UEV, reported by file line number.
    #[error("Missing UEV values for input entries on lines: {}", join_lines(.lines))]
    MissingUev { lines: Vec<usize> },

    /// The uploaded file is not a CSV or spreadsheet.
    #[error("Unsupported file extension: '{0}'. Use .csv, .xls or .xlsx.")]
    UnsupportedExtension(String),

    /// No row has `Flow Direction = Input`.
    #[error("No valid entries with Flow Direction = 'Input' found.")]
    NoValidInputs,

    /// Every input row was dropped during numeric coercion.
    #[error("No rows with valid Amount and UEV.")]
    NoValidAmountUev,

    /// R or F is zero, so EYR/ELR/ESI are undefined.
    #[error("Cannot compute EYR/ELR/ESI with R or F equal to 0.")]
    DivisionByZero,

    /// The remote LCI catalog failed or was unreachable.
    #[error("{detail}")]
    UpstreamService { status: u16, detail: String },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV or spreadsheet could not be decoded into rows.
    #[error("Failed to parse table: {0}")]
    Parse(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything unexpected. The cause is kept for logging only.
    #[error("Internal Server Error")]
    Internal(#[source] anyhow::Error),
}

/// Stable, comparable classification of an [`EmergyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingColumns,
    InvalidAmount,
    InvalidUev,
    MissingUev,
    UnsupportedExtension,
    NoValidInputs,
    NoValidAmountUev,
    DivisionByZero,
    UpstreamService,
    FileRead,
    Parse,
    Config,
    Internal,
}

impl EmergyError {
    /// Wrap any error as an opaque internal failure.
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        EmergyError::Internal(err.into())
    }

    /// Build an upstream failure, defaulting the status to 502.
    pub fn upstream(status: Option<u16>, detail: impl Into<String>) -> Self {
        EmergyError::UpstreamService {
            status: status.unwrap_or(DEFAULT_UPSTREAM_STATUS),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EmergyError::MissingColumns(_) => ErrorKind::MissingColumns,
            EmergyError::InvalidAmount => ErrorKind::InvalidAmount,
            EmergyError::InvalidUev => ErrorKind::InvalidUev,
            EmergyError::MissingUev { .. } => ErrorKind::MissingUev,
            EmergyError::UnsupportedExtension(_) => ErrorKind::UnsupportedExtension,
            EmergyError::NoValidInputs => ErrorKind::NoValidInputs,
            EmergyError::NoValidAmountUev => ErrorKind::NoValidAmountUev,
            EmergyError::DivisionByZero => ErrorKind::DivisionByZero,
            EmergyError::UpstreamService { .. } => ErrorKind::UpstreamService,
            EmergyError::FileRead { .. } => ErrorKind::FileRead,
            EmergyError::Parse(_) => ErrorKind::Parse,
            EmergyError::Config(_) => ErrorKind::Config,
            EmergyError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// `true` for the "bad input" kinds that are safe to show to the caller.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingColumns
                | ErrorKind::InvalidAmount
                | ErrorKind::InvalidUev
                | ErrorKind::MissingUev
                | ErrorKind::UnsupportedExtension
                | ErrorKind::NoValidInputs
                | ErrorKind::NoValidAmountUev
                | ErrorKind::DivisionByZero
        )
    }

    /// Status code the boundary layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            EmergyError::UpstreamService { status, .. } => *status,
            e if e.is_validation() => 400,
            _ => 500,
        }
    }

    /// The caller-facing message.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

fn join_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias used throughout the emergy crates.
pub type Result<T> = std::result::Result<T, EmergyError>;
