use sqlx::migrate::MigrateError;
use std::borrow::Cow;

/// Category an API layer maps onto a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    InvalidState,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorKind::Internal)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // sqlx errors
    #[error("Database Error : {0}")]
    DatabaseError(Cow<'static, str>),
    #[error("Constraint Violation: {}", constraint_message(.0))]
    ConstraintViolation(DbErrorMeta),
    #[error("Migration Error")]
    Migration(#[from] MigrateError),
    // Business rule errors
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Conflict: {0}")]
    Conflict(Cow<'static, str>),
    #[error("Invalid State: {0}")]
    InvalidState(Cow<'static, str>),
    #[error("Forbidden: {0}")]
    Forbidden(Cow<'static, str>),
    #[error("Internal System Error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

fn constraint_message(meta: &DbErrorMeta) -> Cow<'static, str> {
    let Some(constraint) = &meta.constraint else {
        return "Duplicate value".into();
    };

    format!("{constraint} rejected the row").into()
}

#[derive(Debug)]
pub struct DbErrorMeta {
    pub code: Option<String>,
    pub constraint: Option<String>,
    pub message: String,
}

impl From<sqlx::Error> for SystemError {
    fn from(err: sqlx::Error) -> Self {
        log::error!("{:?}", err);
        if let sqlx::Error::RowNotFound = err {
            return SystemError::NotFound("Resource not found".into());
        }
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return SystemError::ConstraintViolation(DbErrorMeta {
                        code: db_err.code().map(|s| s.to_string()),
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    });
                }
                _ => {
                    log::error!("Unhandled DB error: {:?}", db_err);
                    return SystemError::DatabaseError(db_err.message().to_string().into());
                }
            }
        }
        SystemError::InternalError(Box::new(err))
    }
}

impl SystemError {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_state(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn forbidden(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SystemError::BadRequest(_) => ErrorKind::BadRequest,
            SystemError::NotFound(_) => ErrorKind::NotFound,
            SystemError::Conflict(_) => ErrorKind::Conflict,
            SystemError::InvalidState(_) => ErrorKind::InvalidState,
            SystemError::Forbidden(_) => ErrorKind::Forbidden,
            // A constraint the engine did not anticipate is a store failure
            SystemError::ConstraintViolation(_)
            | SystemError::DatabaseError(_)
            | SystemError::Migration(_)
            | SystemError::InternalError(_) => ErrorKind::Internal,
        }
    }
}
