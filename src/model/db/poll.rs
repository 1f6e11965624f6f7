use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::voter::VoterId,
    mongodb::{optional_bson_datetime, Id},
};

/// Core poll data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCore {
    /// The voter who created the poll.
    pub owner_id: VoterId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Option labels, in declared order.
    pub options: Vec<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// Votes are refused at or after this instant.
    #[serde(default, with = "optional_bson_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PollCore {
    /// Has the poll expired as of `now`?
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expiry| expiry <= now)
    }

    /// Find the declared label matching `submitted`, ignoring case.
    pub fn canonical_option(&self, submitted: &str) -> Option<&str> {
        let wanted = normalize_option(submitted);
        self.options
            .iter()
            .find(|option| normalize_option(option) == wanted)
            .map(String::as_str)
    }
}

/// The comparison form of an option label.
pub fn normalize_option(option: &str) -> String {
    option.trim().to_lowercase()
}

/// A poll without an ID.
pub type NewPoll = PollCore;

/// A poll from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub poll: PollCore,
}

impl Poll {
    /// Assign a fresh ID to a new poll.
    pub fn new(poll: NewPoll) -> Self {
        Self {
            id: Id::new(),
            poll,
        }
    }
}

impl Deref for Poll {
    type Target = PollCore;

    fn deref(&self) -> &Self::Target {
        &self.poll
    }
}

impl DerefMut for Poll {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.poll
    }
}
