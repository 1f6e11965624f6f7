use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::ApiId, db::Poll};

/// The vote count for a single option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCount {
    pub option: String,
    pub count: u64,
}

/// Live results for a poll, computed on demand from the stored votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub poll_id: ApiId,
    pub title: String,
    /// Option labels, in declared order.
    pub options: Vec<String>,
    /// One entry per declared option, in declared order, including zero counts.
    pub results: Vec<OptionCount>,
    pub total_votes: u64,
    pub is_expired: bool,
}

impl Tally {
    /// Assemble the tally for `poll` from per-option counts.
    ///
    /// Options absent from `counts` are reported as zero. The total is the sum
    /// of every count supplied.
    pub fn assemble(poll: &Poll, counts: &HashMap<String, u64>, now: DateTime<Utc>) -> Self {
        let results = poll
            .options
            .iter()
            .map(|option| OptionCount {
                option: option.clone(),
                count: counts.get(option).copied().unwrap_or(0),
            })
            .collect();

        Self {
            poll_id: poll.id.into(),
            title: poll.title.clone(),
            options: poll.options.clone(),
            results,
            total_votes: counts.values().sum(),
            is_expired: poll.is_expired_at(now),
        }
    }

    /// The count for the given option label, if it is one of the poll's.
    pub fn count_for(&self, option: &str) -> Option<u64> {
        self.results
            .iter()
            .find(|result| result.option == option)
            .map(|result| result.count)
    }
}
