use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::ApiId,
    common::voter::VoterId,
    db::{normalize_option, NewPoll, Poll},
};

/// Maximum number of options a poll may offer.
pub const MAX_OPTIONS: usize = 10;

/// Maximum length of a title or option label, in characters.
pub const MAX_LABEL_LEN: usize = 255;

/// A poll that a voter wishes to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSpec {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub options: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PollSpec {
    /// Validate the spec and turn it into a poll owned by `owner`.
    ///
    /// Labels are trimmed; the title must be non-empty, there must be between
    /// one and [`MAX_OPTIONS`] distinct (ignoring case) non-empty options, and
    /// any expiry must lie after `now`.
    pub fn into_poll(self, owner: VoterId, now: DateTime<Utc>) -> Result<NewPoll> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::BadRequest("Poll title must not be empty".to_string()));
        }
        if title.chars().count() > MAX_LABEL_LEN {
            return Err(Error::BadRequest(format!(
                "Poll title exceeds {MAX_LABEL_LEN} characters"
            )));
        }

        if self.options.is_empty() || self.options.len() > MAX_OPTIONS {
            return Err(Error::BadRequest(format!(
                "A poll needs between 1 and {MAX_OPTIONS} options, got {}",
                self.options.len()
            )));
        }
        let mut seen = HashSet::new();
        let mut options = Vec::with_capacity(self.options.len());
        for option in self.options {
            let option = option.trim().to_string();
            if option.is_empty() {
                return Err(Error::BadRequest("Options must not be empty".to_string()));
            }
            if option.chars().count() > MAX_LABEL_LEN {
                return Err(Error::BadRequest(format!(
                    "Option '{option}' exceeds {MAX_LABEL_LEN} characters"
                )));
            }
            if !seen.insert(normalize_option(&option)) {
                return Err(Error::BadRequest(format!("Duplicate option '{option}'")));
            }
            options.push(option);
        }

        if let Some(expires_at) = self.expires_at {
            if expires_at <= now {
                return Err(Error::BadRequest(
                    "Expiry time must be in the future".to_string(),
                ));
            }
        }

        Ok(NewPoll {
            owner_id: owner,
            title,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            options,
            created_at: now,
            expires_at: self.expires_at,
        })
    }
}

/// API-friendly poll description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDescription {
    pub id: ApiId,
    pub owner_id: VoterId,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_expired: bool,
}

impl PollDescription {
    /// Describe the poll, evaluating expiry as of `now`.
    pub fn new(poll: Poll, now: DateTime<Utc>) -> Self {
        let is_expired = poll.is_expired_at(now);
        Self {
            id: poll.id.into(),
            owner_id: poll.poll.owner_id,
            title: poll.poll.title,
            description: poll.poll.description,
            options: poll.poll.options,
            created_at: poll.poll.created_at,
            expires_at: poll.poll.expires_at,
            is_expired,
        }
    }
}
