use std::fmt::{Display, Formatter};

use mongodb::bson::Bson;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Header carrying the authenticated voter's identity, set by the upstream
/// session layer once it has authenticated the request.
pub const VOTER_HEADER: &str = "X-Voter-Id";

/// An opaque, stable voter identity.
///
/// Identities are only ever compared for equality; this service never
/// authenticates them.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(String);

impl VoterId {
    /// Wrap a raw identity, trimming surrounding whitespace.
    /// Returns `None` for a blank identity.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VoterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&VoterId> for Bson {
    fn from(id: &VoterId) -> Self {
        Bson::String(id.0.clone())
    }
}

/// Pull the voter identity from the request headers.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterId {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.headers().get_one(VOTER_HEADER).and_then(VoterId::new) {
            Some(voter) => Outcome::Success(voter),
            None => Outcome::Error((
                Status::Unauthorized,
                Error::Unauthorized(format!("Missing or blank `{VOTER_HEADER}` header")),
            )),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterId {
        pub fn example() -> Self {
            Self("alice".to_string())
        }

        pub fn example2() -> Self {
            Self("bob".to_string())
        }

        /// The n-th of a family of distinct voters.
        pub fn numbered(n: usize) -> Self {
            Self(format!("voter-{n}"))
        }
    }
}
