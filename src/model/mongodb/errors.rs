//! Write error classification. The mongodb crate has no named error codes.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

/// Server code for a unique index violation.
pub const DUPLICATE_KEY: i32 = 11000;

/// Did this write fail because it would break a unique index?
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::BulkWrite(ref failure) => failure
            .write_errors
            .iter()
            .flatten()
            .any(|e| e.code == DUPLICATE_KEY),
        _ => false,
    }
}
