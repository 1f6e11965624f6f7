use std::collections::{hash_map::Entry, HashMap};

use chrono::{DateTime, Utc};
use rocket::tokio::sync::Mutex;

use super::{PollStore, StoreError, StoreResult, VoteStore};
use crate::model::{
    common::voter::VoterId,
    db::{NewPoll, Poll, Vote},
    mongodb::Id,
};

/// In-process backend, for single-node deployments and tests.
///
/// Both tables sit behind one lock, so every operation (including the poll
/// cascade) is atomic and every read is a consistent snapshot.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    polls: HashMap<Id, Poll>,
    /// Keyed on the uniqueness constraint.
    votes: HashMap<(Id, VoterId), Vote>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; IDs break ties between votes created in the same instant.
fn newest_first(a: &Vote, b: &Vote) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

#[rocket::async_trait]
impl VoteStore for MemoryStore {
    async fn try_insert(
        &self,
        poll_id: Id,
        voter_id: &VoterId,
        option: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<Vote> {
        let mut tables = self.tables.lock().await;
        match tables.votes.entry((poll_id, voter_id.clone())) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                let vote = Vote::new(poll_id, voter_id.clone(), option, timestamp);
                Ok(slot.insert(vote).clone())
            }
        }
    }

    async fn exists_vote(&self, poll_id: Id, voter_id: &VoterId) -> StoreResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.votes.contains_key(&(poll_id, voter_id.clone())))
    }

    async fn list_by_poll(&self, poll_id: Id) -> StoreResult<Vec<Vote>> {
        let tables = self.tables.lock().await;
        let mut votes: Vec<Vote> = tables
            .votes
            .values()
            .filter(|vote| vote.poll_id == poll_id)
            .cloned()
            .collect();
        votes.sort_by(newest_first);
        Ok(votes)
    }

    async fn count_by_poll_grouped_by_option(
        &self,
        poll_id: Id,
    ) -> StoreResult<HashMap<String, u64>> {
        let tables = self.tables.lock().await;
        let mut counts = HashMap::new();
        for vote in tables.votes.values().filter(|vote| vote.poll_id == poll_id) {
            *counts.entry(vote.option.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[rocket::async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(&self, poll: NewPoll) -> StoreResult<Poll> {
        let poll = Poll::new(poll);
        self.tables
            .lock()
            .await
            .polls
            .insert(poll.id, poll.clone());
        Ok(poll)
    }

    async fn find_poll(&self, poll_id: Id) -> StoreResult<Option<Poll>> {
        Ok(self.tables.lock().await.polls.get(&poll_id).cloned())
    }

    async fn list_polls(&self) -> StoreResult<Vec<Poll>> {
        let tables = self.tables.lock().await;
        let mut polls: Vec<Poll> = tables.polls.values().cloned().collect();
        polls.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(polls)
    }

    async fn delete_poll(&self, poll_id: Id) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.polls.remove(&poll_id).is_none() {
            return Ok(false);
        }
        tables.votes.retain(|(vote_poll, _), _| *vote_poll != poll_id);
        Ok(true)
    }
}
