use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::voter::VoterId, mongodb::Id};

/// Core vote data, as stored in the database.
///
/// Votes are immutable: nothing ever updates one after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    /// Foreign Key poll ID.
    pub poll_id: Id,
    pub voter_id: VoterId,
    /// The poll's own label for the chosen option, whatever casing was submitted.
    pub option: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Vote {
    /// Create a new vote with a fresh ID.
    pub fn new(
        poll_id: Id,
        voter_id: VoterId,
        option: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Id::new(),
            vote: VoteCore {
                poll_id,
                voter_id,
                option: option.into(),
                created_at,
            },
        }
    }
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}
