use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The referenced poll does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The poll's expiry instant has passed.
    #[error("Poll has expired: {0}")]
    Expired(String),
    /// The submitted option is not one of the poll's.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
    /// The voter already has a vote on this poll.
    #[error("Already voted: {0}")]
    AlreadyVoted(String),
    /// The store could not be reached or failed unexpectedly.
    /// The only kind worth retrying.
    #[error(transparent)]
    Storage(#[from] DbError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::Expired(_) => Status::Gone,
            Self::InvalidOption(_) => Status::UnprocessableEntity,
            Self::AlreadyVoted(_) => Status::Conflict,
            Self::Storage(_) => Status::ServiceUnavailable,
            Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
        }
    }

    /// Is it worth retrying the whole operation?
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => {
                Self::AlreadyVoted("A vote by this voter on this poll already exists".to_string())
            }
            StoreError::Db(err) => Self::Storage(err),
        }
    }
}

/// JSON body sent with every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

impl ErrorBody {
    /// A body for a bare status, used by the catchers.
    pub fn for_status(status: Status) -> Self {
        let kind = match status.code {
            400 => "badRequest",
            401 => "unauthorized",
            403 => "forbidden",
            404 => "notFound",
            409 => "alreadyVoted",
            410 => "expired",
            422 => "unprocessable",
            503 => "storage",
            _ if status.class() == StatusClass::ServerError => "internal",
            _ => "error",
        };
        Self {
            error: kind.to_string(),
            message: status.reason_lossy().to_string(),
        }
    }
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        let kind = match err {
            Error::NotFound(_) => "notFound",
            Error::Expired(_) => "expired",
            Error::InvalidOption(_) => "invalidOption",
            Error::AlreadyVoted(_) => "alreadyVoted",
            Error::Storage(_) => "storage",
            Error::BadRequest(_) => "badRequest",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
        };
        // Storage details stay in the logs.
        let message = match err {
            Error::Storage(_) => "Storage is temporarily unavailable, please retry".to_string(),
            other => other.to_string(),
        };
        Self {
            error: kind.to_string(),
            message,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{self}"),
            _ => warn!("{self}"),
        }
        (status, Json(ErrorBody::from(&self))).respond_to(req)
    }
}
