//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

mod poll;
pub use poll::{normalize_option, NewPoll, Poll, PollCore};

mod vote;
pub use vote::{Vote, VoteCore};
