use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{Poll, Vote};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Poll collection
const POLLS: &str = "polls";
impl MongoCollection for Poll {
    const NAME: &'static str = POLLS;
}

// Vote collection
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Vote collection: the one-vote-per-voter rule lives here and nowhere else.
    let one_vote_per_voter = IndexModel::builder()
        .keys(doc! {"poll_id": 1, "voter_id": 1})
        .options(unique)
        .build();
    let votes_by_time = IndexModel::builder()
        .keys(doc! {"poll_id": 1, "created_at": -1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_indexes([one_vote_per_voter, votes_by_time], None)
        .await?;

    // Poll collection.
    let polls_by_owner = IndexModel::builder()
        .keys(doc! {"owner_id": 1, "created_at": -1})
        .build();
    let polls_by_expiry = IndexModel::builder()
        .keys(doc! {"expires_at": 1})
        .build();
    Coll::<Poll>::from_db(db)
        .create_indexes([polls_by_owner, polls_by_expiry], None)
        .await?;

    Ok(())
}
