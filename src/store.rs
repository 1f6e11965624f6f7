//! Durable storage for polls and votes.
//!
//! Every backend enforces one-vote-per-voter-per-poll itself, atomically, so
//! callers never need to lock anything around an insert.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
};
use thiserror::Error;

use crate::model::{
    common::voter::VoterId,
    db::{NewPoll, Poll, Vote},
    mongodb::Id,
};

#[cfg(test)]
pub mod faulty;
mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A vote for the same (poll, voter) pair already exists.
    #[error("Duplicate vote")]
    Duplicate,
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Keyed, immutable vote records.
#[rocket::async_trait]
pub trait VoteStore: Send + Sync {
    /// Insert a vote unless one already exists for `(poll_id, voter_id)`.
    ///
    /// Of any number of concurrent calls for the same pair, exactly one
    /// succeeds and the rest fail with [`StoreError::Duplicate`].
    async fn try_insert(
        &self,
        poll_id: Id,
        voter_id: &VoterId,
        option: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<Vote>;

    /// Does a vote exist for `(poll_id, voter_id)`?
    ///
    /// Advisory only: a `false` may be stale by the time the caller acts on it.
    async fn exists_vote(&self, poll_id: Id, voter_id: &VoterId) -> StoreResult<bool>;

    /// All votes on the poll, newest first.
    async fn list_by_poll(&self, poll_id: Id) -> StoreResult<Vec<Vote>>;

    /// Number of votes per option label, read in a single pass.
    /// Labels with no votes are absent.
    async fn count_by_poll_grouped_by_option(
        &self,
        poll_id: Id,
    ) -> StoreResult<HashMap<String, u64>>;
}

/// Poll snapshots, as provided by the poll collaborator.
#[rocket::async_trait]
pub trait PollStore: Send + Sync {
    async fn insert_poll(&self, poll: NewPoll) -> StoreResult<Poll>;

    async fn find_poll(&self, poll_id: Id) -> StoreResult<Option<Poll>>;

    /// All polls, newest first.
    async fn list_polls(&self) -> StoreResult<Vec<Poll>>;

    /// Delete the poll and, atomically with it, every vote on it.
    /// Returns false if there was no such poll.
    async fn delete_poll(&self, poll_id: Id) -> StoreResult<bool>;
}

/// A backend providing both polls and votes.
pub trait Store: VoteStore + PollStore {}

impl<T: VoteStore + PollStore> Store for T {}

/// Shared handle on the configured backend. This becomes managed state.
#[derive(Clone)]
pub struct Storage(Arc<dyn Store>);

impl Storage {
    pub fn new(store: impl Store + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl Deref for Storage {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Storage {
    type Error = ();

    /// Get the storage handle from the managed state.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.rocket().state::<Storage>() {
            Some(storage) => Outcome::Success(storage.clone()),
            None => {
                error!("No storage backend is managed");
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}
