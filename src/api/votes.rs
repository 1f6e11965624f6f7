use rocket::{http::Status, serde::json::Json, Route};

use crate::engine::TallyEngine;
use crate::error::Result;
use crate::logging::RequestId;
use crate::model::{
    api::{CastVoteResponse, PollVotes, Tally, VoteSpec},
    common::voter::VoterId,
    mongodb::Id,
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, poll_votes, poll_results]
}

#[post("/polls/<poll_id>/votes", data = "<ballot>", format = "json")]
async fn cast_vote(
    voter: VoterId,
    poll_id: Id,
    ballot: Json<VoteSpec>,
    engine: TallyEngine,
    request: &RequestId,
) -> Result<(Status, Json<CastVoteResponse>)> {
    debug!("req{request}: {voter} voting '{}' on poll {poll_id}", ballot.option);
    let cast = engine.cast_vote(poll_id, &voter, &ballot.option).await?;
    Ok((Status::Created, Json(cast)))
}

/// Every vote on the poll, newest first, with the current tally.
#[get("/polls/<poll_id>/votes")]
async fn poll_votes(poll_id: Id, engine: TallyEngine) -> Result<Json<PollVotes>> {
    Ok(Json(engine.get_tally(poll_id).await?))
}

#[get("/polls/<poll_id>/results")]
async fn poll_results(poll_id: Id, engine: TallyEngine) -> Result<Json<Tally>> {
    Ok(Json(engine.results(poll_id).await?))
}
