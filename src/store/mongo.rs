use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{self, doc},
    error::Error as DbError,
    options::{CountOptions, FindOptions},
    Client, Database,
};
use rocket::futures::{StreamExt, TryStreamExt};
use serde::Deserialize;

use super::{PollStore, StoreError, StoreResult, VoteStore};
use crate::model::{
    common::voter::VoterId,
    db::{NewPoll, Poll, Vote},
    mongodb::{at_db_precision, ensure_indexes_exist, is_duplicate_key_error, Coll, Id},
};

/// MongoDB backend.
///
/// One-vote-per-voter is the unique `{poll_id, voter_id}` index on the votes
/// collection. Poll deletion runs in a transaction, which needs a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    polls: Coll<Poll>,
    votes: Coll<Vote>,
}

impl MongoStore {
    /// Wrap the named database, making sure the required indexes exist.
    pub async fn new(client: Client, db_name: &str) -> Result<Self, DbError> {
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self::from_db(client, &db))
    }

    /// Wrap the given database as-is.
    pub fn from_db(client: Client, db: &Database) -> Self {
        Self {
            client,
            polls: Coll::from_db(db),
            votes: Coll::from_db(db),
        }
    }
}

/// One row of the grouped count aggregation.
#[derive(Deserialize)]
struct OptionCountRow {
    #[serde(rename = "_id")]
    option: String,
    count: u64,
}

#[rocket::async_trait]
impl VoteStore for MongoStore {
    async fn try_insert(
        &self,
        poll_id: Id,
        voter_id: &VoterId,
        option: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<Vote> {
        let vote = Vote::new(
            poll_id,
            voter_id.clone(),
            option,
            at_db_precision(timestamp),
        );
        match self.votes.insert_one(&vote, None).await {
            Ok(_) => Ok(vote),
            Err(err) if is_duplicate_key_error(&err) => Err(StoreError::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    async fn exists_vote(&self, poll_id: Id, voter_id: &VoterId) -> StoreResult<bool> {
        let filter = doc! {
            "poll_id": poll_id,
            "voter_id": voter_id,
        };
        let options = CountOptions::builder().limit(1).build();
        let count = self.votes.count_documents(filter, options).await?;
        Ok(count > 0)
    }

    async fn list_by_poll(&self, poll_id: Id) -> StoreResult<Vec<Vote>> {
        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1, "_id": -1})
            .build();
        let votes = self
            .votes
            .find(doc! {"poll_id": poll_id}, options)
            .await?
            .try_collect()
            .await?;
        Ok(votes)
    }

    async fn count_by_poll_grouped_by_option(
        &self,
        poll_id: Id,
    ) -> StoreResult<HashMap<String, u64>> {
        let pipeline = [
            doc! {"$match": {"poll_id": poll_id}},
            doc! {"$group": {"_id": "$option", "count": {"$sum": 1}}},
        ];
        let mut rows = self.votes.aggregate(pipeline, None).await?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next().await {
            // A count that doesn't fit a `u64` fails here rather than reading as zero.
            let row: OptionCountRow = bson::from_document(row?).map_err(DbError::from)?;
            counts.insert(row.option, row.count);
        }
        Ok(counts)
    }
}

#[rocket::async_trait]
impl PollStore for MongoStore {
    async fn insert_poll(&self, mut poll: NewPoll) -> StoreResult<Poll> {
        poll.created_at = at_db_precision(poll.created_at);
        poll.expires_at = poll.expires_at.map(at_db_precision);
        let poll = Poll::new(poll);
        self.polls.insert_one(&poll, None).await?;
        Ok(poll)
    }

    async fn find_poll(&self, poll_id: Id) -> StoreResult<Option<Poll>> {
        Ok(self.polls.find_one(poll_id.as_doc(), None).await?)
    }

    async fn list_polls(&self) -> StoreResult<Vec<Poll>> {
        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1, "_id": -1})
            .build();
        let polls = self.polls.find(None, options).await?.try_collect().await?;
        Ok(polls)
    }

    async fn delete_poll(&self, poll_id: Id) -> StoreResult<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let deleted = self
            .polls
            .delete_one_with_session(poll_id.as_doc(), None, &mut session)
            .await?;
        if deleted.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }

        let votes = self
            .votes
            .delete_many_with_session(doc! {"poll_id": poll_id}, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        debug!(
            "Deleted poll {poll_id} and its {} votes",
            votes.deleted_count
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use rocket::futures::future::join_all;
    use rocket::tokio;

    use super::*;
    use crate::model::db::PollCore;

    #[backend_test]
    async fn unique_index_rejects_second_vote(store: MongoStore) {
        let poll = store.insert_poll(PollCore::example()).await.unwrap();
        let voter = VoterId::example();

        store
            .try_insert(poll.id, &voter, "Yes", Utc::now())
            .await
            .unwrap();
        let again = store.try_insert(poll.id, &voter, "No", Utc::now()).await;
        assert!(matches!(again, Err(StoreError::Duplicate)));

        assert!(store.exists_vote(poll.id, &voter).await.unwrap());
        assert!(!store
            .exists_vote(poll.id, &VoterId::example2())
            .await
            .unwrap());
    }

    #[backend_test]
    async fn concurrent_inserts_admit_exactly_one(store: MongoStore) {
        const ATTEMPTS: usize = 16;

        let poll_id = store.insert_poll(PollCore::example_abc()).await.unwrap().id;
        let attempts = (0..ATTEMPTS).map(|i| {
            let store = store.clone();
            let option = ["A", "B", "C"][i % 3];
            tokio::spawn(async move {
                store
                    .try_insert(poll_id, &VoterId::example(), option, Utc::now())
                    .await
            })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(StoreError::Duplicate)))
                .count(),
            ATTEMPTS - 1
        );
        assert_eq!(store.list_by_poll(poll_id).await.unwrap().len(), 1);
    }

    #[backend_test]
    async fn grouped_counts_and_listing(store: MongoStore, votes: Coll<Vote>) {
        let poll = store.insert_poll(PollCore::example_abc()).await.unwrap();
        let start = Utc::now();
        for (i, option) in ["A", "B", "A"].into_iter().enumerate() {
            store
                .try_insert(
                    poll.id,
                    &VoterId::numbered(i),
                    option,
                    start + chrono::Duration::seconds(i as i64),
                )
                .await
                .unwrap();
        }

        let counts = store
            .count_by_poll_grouped_by_option(poll.id)
            .await
            .unwrap();
        assert_eq!(
            counts,
            HashMap::from([("A".to_string(), 2), ("B".to_string(), 1)])
        );

        let listed: Vec<_> = store
            .list_by_poll(poll.id)
            .await
            .unwrap()
            .into_iter()
            .map(|vote| vote.vote.voter_id)
            .collect();
        assert_eq!(
            listed,
            vec![
                VoterId::numbered(2),
                VoterId::numbered(1),
                VoterId::numbered(0)
            ]
        );
        assert_eq!(votes.count_documents(None, None).await.unwrap(), 3);
    }

    #[backend_test]
    async fn inserted_records_match_what_is_read_back(store: MongoStore) {
        let poll = store.insert_poll(PollCore::example()).await.unwrap();
        assert_eq!(store.find_poll(poll.id).await.unwrap(), Some(poll.clone()));

        let vote = store
            .try_insert(poll.id, &VoterId::example(), "Yes", Utc::now())
            .await
            .unwrap();
        assert_eq!(store.list_by_poll(poll.id).await.unwrap(), vec![vote]);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let row = doc! {"_id": "A", "count": -1_i64};
        assert!(bson::from_document::<OptionCountRow>(row).is_err());

        let row = doc! {"_id": "A", "count": 3_i32};
        let row: OptionCountRow = bson::from_document(row).unwrap();
        assert_eq!((row.option.as_str(), row.count), ("A", 3));
    }

    #[backend_test]
    async fn deleting_a_poll_cascades(store: MongoStore, votes: Coll<Vote>) {
        let doomed = store.insert_poll(PollCore::example()).await.unwrap();
        let kept = store.insert_poll(PollCore::example()).await.unwrap();
        let voter = VoterId::example();
        store
            .try_insert(doomed.id, &voter, "Yes", Utc::now())
            .await
            .unwrap();
        store
            .try_insert(kept.id, &voter, "No", Utc::now())
            .await
            .unwrap();

        assert!(store.delete_poll(doomed.id).await.unwrap());
        assert!(!store.delete_poll(doomed.id).await.unwrap());

        assert!(store.find_poll(doomed.id).await.unwrap().is_none());
        assert_eq!(votes.count_documents(None, None).await.unwrap(), 1);
        assert_eq!(
            store.list_polls().await.unwrap().into_iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![kept.id]
        );
    }
}
