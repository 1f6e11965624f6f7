use std::collections::HashMap;
use std::io;

use chrono::{DateTime, Utc};
use mongodb::error::Error as DbError;

use super::{MemoryStore, PollStore, StoreError, StoreResult, VoteStore};
use crate::model::{
    common::voter::VoterId,
    db::{NewPoll, Poll, Vote},
    mongodb::Id,
};

/// Which operation should report the database as unreachable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    Insert,
    Counts,
    Listing,
}

/// Detail that must never reach a client.
pub const INTERNAL_DETAIL: &str = "connection refused by 10.0.0.7:27017";

/// A memory store whose chosen operation always fails as if the database had
/// gone away. Everything else behaves normally.
pub struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: MemoryStore::new(),
            fault,
        }
    }

    fn check(&self, op: Fault) -> StoreResult<()> {
        if self.fault == op {
            let io = io::Error::new(io::ErrorKind::ConnectionRefused, INTERNAL_DETAIL);
            return Err(StoreError::Db(DbError::from(io)));
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl VoteStore for FaultyStore {
    async fn try_insert(
        &self,
        poll_id: Id,
        voter_id: &VoterId,
        option: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<Vote> {
        self.check(Fault::Insert)?;
        self.inner
            .try_insert(poll_id, voter_id, option, timestamp)
            .await
    }

    async fn exists_vote(&self, poll_id: Id, voter_id: &VoterId) -> StoreResult<bool> {
        self.inner.exists_vote(poll_id, voter_id).await
    }

    async fn list_by_poll(&self, poll_id: Id) -> StoreResult<Vec<Vote>> {
        self.check(Fault::Listing)?;
        self.inner.list_by_poll(poll_id).await
    }

    async fn count_by_poll_grouped_by_option(
        &self,
        poll_id: Id,
    ) -> StoreResult<HashMap<String, u64>> {
        self.check(Fault::Counts)?;
        self.inner.count_by_poll_grouped_by_option(poll_id).await
    }
}

#[rocket::async_trait]
impl PollStore for FaultyStore {
    async fn insert_poll(&self, poll: NewPoll) -> StoreResult<Poll> {
        self.inner.insert_poll(poll).await
    }

    async fn find_poll(&self, poll_id: Id) -> StoreResult<Option<Poll>> {
        self.inner.find_poll(poll_id).await
    }

    async fn list_polls(&self) -> StoreResult<Vec<Poll>> {
        self.inner.list_polls().await
    }

    async fn delete_poll(&self, poll_id: Id) -> StoreResult<bool> {
        self.inner.delete_poll(poll_id).await
    }
}
