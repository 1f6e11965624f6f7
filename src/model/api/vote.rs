use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{ApiId, Tally},
    common::voter::VoterId,
    db::Vote,
};

/// The option a voter wishes to vote for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSpec {
    pub option: String,
}

/// API-friendly record of a single vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub id: ApiId,
    pub poll_id: ApiId,
    pub voter_id: VoterId,
    pub option: String,
    pub created_at: DateTime<Utc>,
}

impl From<Vote> for VoteRecord {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            poll_id: vote.vote.poll_id.into(),
            voter_id: vote.vote.voter_id,
            option: vote.vote.option,
            created_at: vote.vote.created_at,
        }
    }
}

/// The outcome of a successful vote: the stored record and the fresh tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteResponse {
    pub vote: VoteRecord,
    pub tally: Tally,
}

/// Every vote on a poll, newest first, together with the tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollVotes {
    pub votes: Vec<VoteRecord>,
    pub tally: Tally,
}
