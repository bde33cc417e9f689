// region:    --- Imports
use crate::auction::commands::{advance_phase, close_final_phase, open_first_phase};
use crate::auction::model::{AdvancePhaseCommand, CloseAuctionCommand};
use crate::auth::{AuthSubject, CurrentUser};
use crate::bidding::commands::place_bid;
use crate::bidding::model::PlaceBidCommand;
use crate::claim::commands::{
    accept_invitation, create_claim, decline_invitation, invite_contractor,
};
use crate::claim::model::{CreateClaimCommand, InviteContractorCommand};
use crate::error::{AppError, AppResult};
use crate::query;
use crate::state::AppState;
use crate::user::commands::upsert_profile;
use crate::user::model::{UpsertProfileCommand, UserType};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use tracing::info;

// endregion: --- Imports

/// Malformed or missing JSON bodies are client errors.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// Unparsable path ids get the same error body as every other rejection.
fn path_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

// region:    --- User Handlers

/// Create or update the caller's profile
pub async fn handle_upsert_profile(
    State(state): State<AppState>,
    AuthSubject(user_id): AuthSubject,
    payload: Result<Json<UpsertProfileCommand>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let cmd = json_body(payload)?;
    info!("{:<12} --> Upsert profile: {}", "Handler", user_id);
    let mut conn = state.db.pool().acquire().await?;
    let user = upsert_profile(&mut conn, &user_id, cmd).await?;
    Ok(Json(user))
}

/// Caller's profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    info!("{:<12} --> Profile: {}", "Handler", user.id);
    let profile = query::handlers::get_user(&state.db, &user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(profile))
}

// endregion: --- User Handlers

// region:    --- Claim Handlers

/// Claim intake
pub async fn handle_create_claim(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateClaimCommand>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    user.require(UserType::Homeowner)?;
    let cmd = json_body(payload)?;
    info!("{:<12} --> Create claim: {}", "Handler", cmd.title);
    let claim = create_claim(state.db.pool(), &user.id, cmd).await?;
    Ok((StatusCode::CREATED, Json(claim)))
}

/// Claims visible to the caller
pub async fn handle_get_claims(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    info!("{:<12} --> Claims", "Handler");
    let claims = query::handlers::list_claims(&state.db, &user.id, user.user_type).await?;
    Ok(Json(claims))
}

/// Single claim
pub async fn handle_get_claim(
    State(state): State<AppState>,
    user: CurrentUser,
    claim_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let claim_id = path_id(claim_id)?;
    info!("{:<12} --> Claim id: {}", "Handler", claim_id);
    let claim = query::handlers::get_claim(&state.db, &user.id, claim_id).await?;
    Ok(Json(claim))
}

/// Invite a contractor onto a claim
pub async fn handle_invite_contractor(
    State(state): State<AppState>,
    user: CurrentUser,
    claim_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<InviteContractorCommand>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let claim_id = path_id(claim_id)?;
    user.require(UserType::Homeowner)?;
    let cmd = json_body(payload)?;
    info!("{:<12} --> Invite to claim id: {}", "Handler", claim_id);
    let invitation = invite_contractor(state.db.pool(), &user.id, claim_id, cmd).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// Pending invitations for the calling contractor
pub async fn handle_get_invitations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(UserType::Contractor)?;
    info!("{:<12} --> Invitations", "Handler");
    let invitations = query::handlers::list_invitations(&state.db, &user.id).await?;
    Ok(Json(invitations))
}

/// Accept an invitation
pub async fn handle_accept_invitation(
    State(state): State<AppState>,
    user: CurrentUser,
    invitation_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let invitation_id = path_id(invitation_id)?;
    user.require(UserType::Contractor)?;
    info!("{:<12} --> Accept invitation id: {}", "Handler", invitation_id);
    let participant = accept_invitation(state.db.pool(), &user.id, invitation_id).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// Decline an invitation
pub async fn handle_decline_invitation(
    State(state): State<AppState>,
    user: CurrentUser,
    invitation_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let invitation_id = path_id(invitation_id)?;
    info!("{:<12} --> Decline invitation id: {}", "Handler", invitation_id);
    decline_invitation(state.db.pool(), &user.id, invitation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Claim Handlers

// region:    --- Auction Handlers

/// Active auctions for the caller
pub async fn handle_get_active_auctions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    info!("{:<12} --> Active auctions", "Handler");
    let auctions =
        query::handlers::list_active_auctions(&state.db, &user.id, user.user_type).await?;
    Ok(Json(auctions))
}

/// Auction detail
pub async fn handle_get_auction(
    State(state): State<AppState>,
    user: CurrentUser,
    auction_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let auction_id = path_id(auction_id)?;
    info!("{:<12} --> Auction id: {}", "Handler", auction_id);
    let detail = query::handlers::get_auction_detail(&state.db, &user.id, auction_id).await?;
    Ok(Json(detail))
}

/// Close phase 1 and open phase 2 with the selected contractors
pub async fn handle_advance_auction(
    State(state): State<AppState>,
    user: CurrentUser,
    auction_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AdvancePhaseCommand>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let auction_id = path_id(auction_id)?;
    let cmd = json_body(payload)?;
    info!("{:<12} --> Advance auction id: {}", "Handler", auction_id);
    let phase = advance_phase(
        state.db.pool(),
        &user.id,
        auction_id,
        &cmd.selected_participants,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(phase)))
}

/// Award the final phase
pub async fn handle_close_auction(
    State(state): State<AppState>,
    user: CurrentUser,
    auction_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CloseAuctionCommand>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let auction_id = path_id(auction_id)?;
    let cmd = json_body(payload)?;
    info!("{:<12} --> Close auction id: {}", "Handler", auction_id);
    let phase = close_final_phase(state.db.pool(), &user.id, auction_id, &cmd.winner_id).await?;
    Ok(Json(phase))
}

/// Contractor bid
pub async fn handle_place_bid(
    State(state): State<AppState>,
    user: CurrentUser,
    auction_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PlaceBidCommand>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let auction_id = path_id(auction_id)?;
    user.require(UserType::Contractor)?;
    let cmd = json_body(payload)?;
    info!("{:<12} --> Bid on auction id: {}", "Handler", auction_id);
    let bid = place_bid(state.db.pool(), &user.id, auction_id, cmd, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

/// Phases of a claim
pub async fn handle_get_claim_auctions(
    State(state): State<AppState>,
    user: CurrentUser,
    claim_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let claim_id = path_id(claim_id)?;
    info!("{:<12} --> Auctions of claim id: {}", "Handler", claim_id);
    let phases = query::handlers::list_claim_phases(&state.db, &user.id, claim_id).await?;
    Ok(Json(phases))
}

/// Open phase 1 for a claim
pub async fn handle_open_auction(
    State(state): State<AppState>,
    user: CurrentUser,
    claim_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let claim_id = path_id(claim_id)?;
    info!("{:<12} --> Open auction for claim id: {}", "Handler", claim_id);
    let phase = open_first_phase(state.db.pool(), &user.id, claim_id).await?;
    Ok((StatusCode::CREATED, Json(phase)))
}

// endregion: --- Auction Handlers
