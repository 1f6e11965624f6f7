use chrono::Utc;
use rocket::{http::Status, response::status, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{PollDescription, PollSpec},
    common::voter::VoterId,
    mongodb::Id,
};
use crate::store::{PollStore, Storage};

pub fn routes() -> Vec<Route> {
    routes![create_poll, list_polls, get_poll, delete_poll]
}

#[post("/polls", data = "<spec>", format = "json")]
async fn create_poll(
    owner: VoterId,
    spec: Json<PollSpec>,
    storage: Storage,
) -> Result<status::Created<Json<PollDescription>>> {
    let now = Utc::now();
    let new_poll = spec.into_inner().into_poll(owner, now)?;
    let poll = storage.insert_poll(new_poll).await?;
    info!(
        "Poll {} created by {} with {} options",
        poll.id,
        poll.owner_id,
        poll.options.len()
    );

    let location = uri!(get_poll(poll.id)).to_string();
    Ok(status::Created::new(location).body(Json(PollDescription::new(poll, now))))
}

#[get("/polls")]
async fn list_polls(storage: Storage) -> Result<Json<Vec<PollDescription>>> {
    let now = Utc::now();
    let polls = storage
        .list_polls()
        .await?
        .into_iter()
        .map(|poll| PollDescription::new(poll, now))
        .collect();
    Ok(Json(polls))
}

#[get("/polls/<poll_id>")]
async fn get_poll(poll_id: Id, storage: Storage) -> Result<Json<PollDescription>> {
    let poll = storage
        .find_poll(poll_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll with ID '{poll_id}'")))?;
    Ok(Json(PollDescription::new(poll, Utc::now())))
}

/// Delete a poll and all of its votes. Only the owner may do this.
#[delete("/polls/<poll_id>")]
async fn delete_poll(voter: VoterId, poll_id: Id, storage: Storage) -> Result<Status> {
    let poll = storage
        .find_poll(poll_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll with ID '{poll_id}'")))?;

    if poll.owner_id != voter {
        return Err(Error::Forbidden(format!(
            "Only the owner may delete poll '{poll_id}'"
        )));
    }

    // Someone else may have deleted it since we looked.
    if !storage.delete_poll(poll_id).await? {
        return Err(Error::not_found(format!("Poll with ID '{poll_id}'")));
    }
    info!("Poll {poll_id} deleted by {voter}");

    Ok(Status::NoContent)
}

#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Header};

    use super::*;
    use crate::error::ErrorBody;
    use crate::model::{
        api::{PollVotes, VoteSpec},
        common::voter::VOTER_HEADER,
    };

    fn as_voter(voter: &VoterId) -> Header<'static> {
        Header::new(VOTER_HEADER, voter.to_string())
    }

    #[rocket::async_test]
    async fn create_then_fetch_poll() {
        let (client, _) = crate::memory_client().await;

        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .header(as_voter(&VoterId::example()))
            .json(&PollSpec::example())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let location = response.headers().get_one("Location").unwrap().to_string();
        let created: PollDescription = response.into_json().await.unwrap();

        assert_eq!(created.owner_id, VoterId::example());
        assert_eq!(created.options, vec!["Vim", "Emacs", "Nano"]);
        assert!(!created.is_expired);
        assert_eq!(location, uri!(get_poll(*created.id)).to_string());

        let response = client.get(location.as_str()).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let fetched: PollDescription = response.into_json().await.unwrap();
        assert_eq!(fetched, created);
    }

    #[rocket::async_test]
    async fn create_requires_voter_identity() {
        let (client, storage) = crate::memory_client().await;

        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .json(&PollSpec::example())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
        let body: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(body.error, "unauthorized");

        assert!(storage.list_polls().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn invalid_spec_is_a_bad_request() {
        let (client, storage) = crate::memory_client().await;

        let spec = PollSpec {
            options: vec!["Same".to_string(), "same".to_string()],
            ..PollSpec::example()
        };
        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .header(as_voter(&VoterId::example()))
            .json(&spec)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(body.error, "badRequest");

        assert!(storage.list_polls().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn list_returns_newest_first() {
        let (client, _) = crate::memory_client().await;

        let mut created = Vec::new();
        for title in ["First", "Second"] {
            let spec = PollSpec {
                title: title.to_string(),
                ..PollSpec::example()
            };
            let response = client
                .post(uri!(create_poll))
                .header(ContentType::JSON)
                .header(as_voter(&VoterId::example()))
                .json(&spec)
                .dispatch()
                .await;
            let poll: PollDescription = response.into_json().await.unwrap();
            created.push(poll.id);
        }

        let response = client.get(uri!(list_polls)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let listed: Vec<PollDescription> = response.into_json().await.unwrap();
        let ids: Vec<_> = listed.into_iter().map(|poll| poll.id).collect();
        created.reverse();
        assert_eq!(ids, created);
    }

    #[rocket::async_test]
    async fn unknown_poll_is_not_found() {
        let (client, _) = crate::memory_client().await;

        let response = client.get(uri!(get_poll(Id::new()))).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let body: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(body.error, "notFound");
    }

    #[rocket::async_test]
    async fn only_owner_may_delete_and_votes_go_too() {
        let (client, storage) = crate::memory_client().await;

        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .header(as_voter(&VoterId::example()))
            .json(&PollSpec::example())
            .dispatch()
            .await;
        let poll: PollDescription = response.into_json().await.unwrap();
        let votes_uri = format!("/polls/{}/votes", poll.id);

        let response = client
            .post(votes_uri.as_str())
            .header(ContentType::JSON)
            .header(as_voter(&VoterId::example2()))
            .json(&VoteSpec {
                option: "vim".to_string(),
            })
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        // Not the owner.
        let response = client
            .delete(uri!(delete_poll(*poll.id)))
            .header(as_voter(&VoterId::example2()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
        let response = client
            .get(votes_uri.as_str())
            .dispatch()
            .await;
        let votes: PollVotes = response.into_json().await.unwrap();
        assert_eq!(votes.votes.len(), 1);

        // The owner.
        let response = client
            .delete(uri!(delete_poll(*poll.id)))
            .header(as_voter(&VoterId::example()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);

        assert!(storage.find_poll(*poll.id).await.unwrap().is_none());
        let response = client
            .get(votes_uri.as_str())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .delete(uri!(delete_poll(*poll.id)))
            .header(as_voter(&VoterId::example()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
