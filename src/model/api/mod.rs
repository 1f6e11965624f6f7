//! API-friendly types.
//!
//! These are what clients send and receive: IDs are plain strings, field names
//! are camelCase, and nothing exposes storage internals.

pub mod id;
pub mod poll;
pub mod tally;
pub mod vote;

pub use id::ApiId;
pub use poll::{PollDescription, PollSpec};
pub use tally::{OptionCount, Tally};
pub use vote::{CastVoteResponse, PollVotes, VoteRecord, VoteSpec};
