//! Claim intake and contractor invitations
// region:    --- Imports
use super::model::{Claim, ClaimInvitation, ClaimStatus, CreateClaimCommand, InviteContractorCommand};
use crate::auction::model::{AuctionPhase, ClaimParticipant, ParticipantStatus, FINAL_PHASE};
use crate::error::{AppError, AppResult};
use crate::query::queries;
use crate::user::model::{User, UserType};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::info;

// endregion: --- Imports

fn check_window(
    label: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AppResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if start >= end => Err(AppError::bad_request(format!(
            "{label} must start before it ends"
        ))),
        _ => Ok(()),
    }
}

/// Field checks for a new claim.
pub fn validate_claim(cmd: &CreateClaimCommand) -> AppResult<()> {
    if cmd.title.trim().is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }
    if cmd.street.trim().is_empty() || cmd.city.trim().is_empty() {
        return Err(AppError::bad_request("Street and city are required"));
    }
    if matches!(cmd.insurance_estimate, Some(estimate) if estimate < 0) {
        return Err(AppError::bad_request("Insurance estimate cannot be negative"));
    }
    check_window("Phase 1", cmd.phase1_start, cmd.phase1_end)?;
    check_window("Phase 2", cmd.phase2_start, cmd.phase2_end)?;

    let phase1_close = cmd.phase1_end.or(cmd.phase1_start);
    if let (Some(phase1_close), Some(phase2_start)) = (phase1_close, cmd.phase2_start) {
        if phase2_start < phase1_close {
            return Err(AppError::bad_request(
                "Phase 2 cannot start before phase 1 ends",
            ));
        }
    }
    Ok(())
}

/// The claim's active phase, refusing newcomers once the final phase runs.
///
/// Phase 2 is reserved for the contractors advanced out of phase 1.
async fn phase_open_to_newcomers(
    conn: &mut PgConnection,
    claim_id: i64,
) -> AppResult<Option<AuctionPhase>> {
    let active_phase = sqlx::query_as::<_, AuctionPhase>(queries::GET_ACTIVE_CLAIM_PHASE)
        .bind(claim_id)
        .fetch_optional(&mut *conn)
        .await?;
    match active_phase {
        Some(phase) if phase.number == FINAL_PHASE => {
            Err(AppError::conflict("Auction is in its final phase"))
        }
        other => Ok(other),
    }
}

// region:    --- Commands

/// Create a draft claim owned by the calling homeowner.
pub async fn create_claim(
    pool: &PgPool,
    owner_id: &str,
    cmd: CreateClaimCommand,
) -> AppResult<Claim> {
    info!("{:<12} --> Create claim for: {}", "Command", owner_id);
    validate_claim(&cmd)?;

    let claim = sqlx::query_as::<_, Claim>(
        "INSERT INTO claims (user_id, title, description, street, city, state, zip_code,
                             insurance_company, insurance_estimate,
                             phase1_start, phase1_end, phase2_start, phase2_end, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         RETURNING id, user_id, title, description, street, city, state, zip_code,
                   insurance_company, insurance_estimate,
                   phase1_start, phase1_end, phase2_start, phase2_end, status, created_at",
    )
    .bind(owner_id)
    .bind(cmd.title.trim())
    .bind(&cmd.description)
    .bind(cmd.street.trim())
    .bind(cmd.city.trim())
    .bind(&cmd.state)
    .bind(&cmd.zip_code)
    .bind(&cmd.insurance_company)
    .bind(cmd.insurance_estimate)
    .bind(cmd.phase1_start)
    .bind(cmd.phase1_end)
    .bind(cmd.phase2_start)
    .bind(cmd.phase2_end)
    .bind(ClaimStatus::Draft.as_str())
    .fetch_one(pool)
    .await?;

    info!("{:<12} --> Claim id: {} created", "Command", claim.id);
    Ok(claim)
}

/// Invite a contractor onto a claim the caller owns.
pub async fn invite_contractor(
    pool: &PgPool,
    caller_id: &str,
    claim_id: i64,
    cmd: InviteContractorCommand,
) -> AppResult<ClaimInvitation> {
    info!(
        "{:<12} --> Invite {} to claim id: {}",
        "Command", cmd.contractor_id, claim_id
    );
    let mut tx = pool.begin().await?;

    let claim = sqlx::query_as::<_, Claim>(queries::GET_CLAIM_FOR_UPDATE)
        .bind(claim_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Claim not found"))?;
    if claim.user_id != caller_id {
        return Err(AppError::Forbidden);
    }
    if claim.status == ClaimStatus::Closed {
        return Err(AppError::conflict("Claim is closed"));
    }
    phase_open_to_newcomers(&mut tx, claim_id).await?;

    let contractor = sqlx::query_as::<_, User>(queries::GET_USER)
        .bind(&cmd.contractor_id)
        .fetch_optional(&mut *tx)
        .await?;
    match contractor {
        Some(user) if user.user_type == UserType::Contractor => {}
        _ => return Err(AppError::bad_request("Invitee must be a contractor")),
    }

    let already_participant = sqlx::query_scalar::<_, bool>(queries::IS_CLAIM_PARTICIPANT)
        .bind(claim_id)
        .bind(&cmd.contractor_id)
        .fetch_one(&mut *tx)
        .await?;
    if already_participant {
        return Err(AppError::conflict("Contractor already participates in this claim"));
    }

    let invitation = sqlx::query_as::<_, ClaimInvitation>(
        "INSERT INTO claim_invitations (claim_id, contractor_id, invited_by)
         VALUES ($1, $2, $3)
         ON CONFLICT (claim_id, contractor_id) DO NOTHING
         RETURNING id, claim_id, contractor_id, invited_by, created_at",
    )
    .bind(claim_id)
    .bind(&cmd.contractor_id)
    .bind(caller_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::conflict("Contractor already invited"))?;

    tx.commit().await?;
    Ok(invitation)
}

/// Accept an invitation: the contractor becomes an approved participant.
///
/// When the claim runs phase 1 the new row joins it. The claim row is locked
/// before the active phase is read so an advance cannot close that phase
/// underneath the insert.
pub async fn accept_invitation(
    pool: &PgPool,
    caller_id: &str,
    invitation_id: i64,
) -> AppResult<ClaimParticipant> {
    info!(
        "{:<12} --> Accept invitation id: {} by {}",
        "Command", invitation_id, caller_id
    );
    let mut tx = pool.begin().await?;

    let invitation = sqlx::query_as::<_, ClaimInvitation>(queries::GET_INVITATION)
        .bind(invitation_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|invitation| invitation.contractor_id == caller_id)
        .ok_or_else(|| AppError::not_found("Invitation not found"))?;

    let claim = sqlx::query_as::<_, Claim>(queries::GET_CLAIM_FOR_UPDATE)
        .bind(invitation.claim_id)
        .fetch_one(&mut *tx)
        .await?;
    if claim.status == ClaimStatus::Closed {
        return Err(AppError::conflict("Claim is closed"));
    }

    // Opening phase 1 clears invitations, so the row may be gone by now.
    let deleted = sqlx::query("DELETE FROM claim_invitations WHERE id = $1")
        .bind(invitation.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::not_found("Invitation not found"));
    }

    let active_phase = phase_open_to_newcomers(&mut tx, invitation.claim_id).await?;

    let participant = sqlx::query_as::<_, ClaimParticipant>(
        "INSERT INTO claim_participants (user_id, claim_id, auction_phase_id, status, invited_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, user_id, claim_id, auction_phase_id, status, invited_by, created_at",
    )
    .bind(caller_id)
    .bind(invitation.claim_id)
    .bind(active_phase.map(|phase| phase.id))
    .bind(ParticipantStatus::Approved.as_str())
    .bind(&invitation.invited_by)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(
        "{:<12} --> Participant id: {} approved on claim id: {}",
        "Command", participant.id, participant.claim_id
    );
    Ok(participant)
}

/// Decline an invitation addressed to the caller.
pub async fn decline_invitation(
    pool: &PgPool,
    caller_id: &str,
    invitation_id: i64,
) -> AppResult<()> {
    info!(
        "{:<12} --> Decline invitation id: {} by {}",
        "Command", invitation_id, caller_id
    );
    let deleted = sqlx::query("DELETE FROM claim_invitations WHERE id = $1 AND contractor_id = $2")
        .bind(invitation_id)
        .bind(caller_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::not_found("Invitation not found"));
    }
    Ok(())
}

// endregion: --- Commands
