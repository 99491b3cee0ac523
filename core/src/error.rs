use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error(
        "Insufficient funds in account {account_id}: balance {balance:.2} - {amount:.2} \
         would fall below the minimum balance of {floor:.2}"
    )]
    InsufficientFunds {
        account_id: i64,
        balance: f64,
        amount: f64,
        floor: f64,
    },

    #[error("Duplicate {entity}: {detail}")]
    DuplicateEntity { entity: &'static str, detail: String },

    #[error("Integrity error: {0}. Other records still depend on it")]
    IntegrityError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type BankResult<T> = Result<T, BankError>;

impl BankError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Reclassify SQLite constraint failures into the typed kinds the desk
    /// reports. Everything else passes through untouched.
    pub fn from_constraint(err: rusqlite::Error, entity: &'static str) -> Self {
        use rusqlite::ffi;
        if let rusqlite::Error::SqliteFailure(code, ref msg) = err {
            let detail = msg.clone().unwrap_or_else(|| code.to_string());
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY | ffi::SQLITE_CONSTRAINT_TRIGGER => {
                    return Self::IntegrityError(format!("{entity}: {detail}"));
                }
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::DuplicateEntity { entity, detail };
                }
                ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                    return Self::ValidationError(format!("{entity}: {detail}"));
                }
                _ => {}
            }
        }
        Self::Database(err)
    }

    /// Short stable name for the error kind, used in audit payloads and
    /// the runner's JSON responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::DuplicateEntity { .. } => "duplicate_entity",
            Self::IntegrityError(_) => "integrity_error",
            Self::ValidationError(_) => "validation_error",
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
            Self::Csv(_) => "csv",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}
