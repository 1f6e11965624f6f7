//! The vote-casting and tallying engine.
//!
//! The engine keeps no state of its own. Each call validates against a fresh
//! poll snapshot, hands the single concurrency-sensitive step (the insert) to
//! the store's atomic primitive, and recomputes the tally from the store.

use chrono::{DateTime, Utc};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
};

use crate::error::{Error, Result};
use crate::model::{
    api::{CastVoteResponse, PollVotes, Tally},
    common::voter::VoterId,
    db::Poll,
    mongodb::Id,
};
use crate::store::{PollStore, StoreError, Storage, VoteStore};

pub struct TallyEngine {
    storage: Storage,
}

impl TallyEngine {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Record `voter_id`'s vote for `option` on the poll, then return the
    /// stored vote and the updated tally.
    pub async fn cast_vote(
        &self,
        poll_id: Id,
        voter_id: &VoterId,
        option: &str,
    ) -> Result<CastVoteResponse> {
        let poll = self.poll(poll_id).await?;
        let now = Utc::now();
        check_not_expired(&poll, now).map_err(|err| {
            debug!("Rejected ballot by {voter_id} on poll {poll_id}: {err}");
            err
        })?;

        // Fast path only; the insert below is what actually enforces uniqueness.
        if self.storage.exists_vote(poll_id, voter_id).await? {
            debug!("Rejected repeat vote by {voter_id} on poll {poll_id}");
            return Err(already_voted(voter_id, poll_id));
        }

        let option = resolve_option(&poll, option).map_err(|err| {
            debug!("Rejected ballot by {voter_id} on poll {poll_id}: {err}");
            err
        })?;

        let vote = self
            .storage
            .try_insert(poll_id, voter_id, option, now)
            .await
            .map_err(|err| match err {
                StoreError::Duplicate => {
                    debug!("Lost insert race for {voter_id} on poll {poll_id}");
                    already_voted(voter_id, poll_id)
                }
                StoreError::Db(err) => Error::Storage(err),
            })?;
        info!("Recorded vote {} on poll {poll_id}", vote.id);

        let tally = self.tally_for(&poll).await?;
        Ok(CastVoteResponse {
            vote: vote.into(),
            tally,
        })
    }

    /// Every vote on the poll, newest first, plus the tally.
    pub async fn get_tally(&self, poll_id: Id) -> Result<PollVotes> {
        let poll = self.poll(poll_id).await?;
        let votes = self.storage.list_by_poll(poll_id).await?;
        let tally = self.tally_for(&poll).await?;
        Ok(PollVotes {
            votes: votes.into_iter().map(Into::into).collect(),
            tally,
        })
    }

    /// Just the tally.
    pub async fn results(&self, poll_id: Id) -> Result<Tally> {
        let poll = self.poll(poll_id).await?;
        self.tally_for(&poll).await
    }

    async fn poll(&self, poll_id: Id) -> Result<Poll> {
        self.storage
            .find_poll(poll_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Poll with ID '{poll_id}'")))
    }

    async fn tally_for(&self, poll: &Poll) -> Result<Tally> {
        let counts = self
            .storage
            .count_by_poll_grouped_by_option(poll.id)
            .await?;
        Ok(Tally::assemble(poll, &counts, Utc::now()))
    }
}

fn already_voted(voter_id: &VoterId, poll_id: Id) -> Error {
    Error::AlreadyVoted(format!("Voter '{voter_id}' has already voted on poll '{poll_id}'"))
}

/// The poll's own label for a submitted option, matched ignoring case.
pub fn resolve_option<'p>(poll: &'p Poll, option: &str) -> Result<&'p str> {
    poll.canonical_option(option).ok_or_else(|| {
        Error::InvalidOption(format!(
            "'{option}' is not one of {:?} on poll '{}'",
            poll.options, poll.id
        ))
    })
}

pub fn check_not_expired(poll: &Poll, now: DateTime<Utc>) -> Result<()> {
    if poll.is_expired_at(now) {
        return Err(Error::Expired(format!("Poll '{}' is closed to voting", poll.id)));
    }
    Ok(())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TallyEngine {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.guard::<Storage>().await {
            Outcome::Success(storage) => Outcome::Success(TallyEngine::new(storage)),
            _ => Outcome::Error((Status::InternalServerError, ())),
        }
    }
}
