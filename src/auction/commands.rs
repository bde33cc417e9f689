//! Auction phase commands
//! 1. Open phase 1 for a claim
//! 2. Advance phase 1 to phase 2
//! 3. Close the final phase with a winner
// region:    --- Imports
use super::model::{
    AuctionPhase, ClaimParticipant, ParticipantStatus, PhaseStatus, FINAL_PHASE, FIRST_PHASE,
};
use super::workflow::{normalize_selection, plan_advance};
use crate::claim::model::{Claim, ClaimStatus};
use crate::error::{AppError, AppResult};
use crate::query::queries;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

// endregion: --- Imports

/// Length of a phase whose claim leaves the end date open.
pub const DEFAULT_PHASE_DAYS: i64 = 7;

/// Resolve a phase window from the claim's optional dates.
pub fn phase_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start.unwrap_or(now);
    let end = end
        .filter(|end| *end > start)
        .unwrap_or(start + Duration::days(DEFAULT_PHASE_DAYS));
    (start, end)
}

// region:    --- Commands

/// 1. Open phase 1
///
/// Activates the claim, moves every approved contractor onto the new phase and
/// drops the claim's outstanding invitations.
pub async fn open_first_phase(
    pool: &PgPool,
    caller_id: &str,
    claim_id: i64,
) -> AppResult<AuctionPhase> {
    info!("{:<12} --> Open phase 1 for claim id: {}", "Command", claim_id);
    let mut tx = pool.begin().await?;

    let claim = sqlx::query_as::<_, Claim>(queries::GET_CLAIM_FOR_UPDATE)
        .bind(claim_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Claim not found"))?;

    if claim.user_id != caller_id {
        return Err(AppError::Forbidden);
    }

    let phases = sqlx::query_as::<_, AuctionPhase>(queries::GET_CLAIM_PHASES)
        .bind(claim_id)
        .fetch_all(&mut *tx)
        .await?;
    if phases.iter().any(|p| p.status == PhaseStatus::Active) {
        return Err(AppError::conflict("Auction already active"));
    }
    if !phases.is_empty() {
        return Err(AppError::conflict("Auction already exists"));
    }

    sqlx::query("UPDATE claims SET status = $1 WHERE id = $2")
        .bind(ClaimStatus::Active.as_str())
        .bind(claim_id)
        .execute(&mut *tx)
        .await?;

    let (start, end) = phase_window(claim.phase1_start, claim.phase1_end, Utc::now());
    let phase = insert_phase(&mut tx, claim_id, FIRST_PHASE, start, end).await?;

    let migrated = sqlx::query(
        "UPDATE claim_participants SET auction_phase_id = $1
         WHERE claim_id = $2 AND status = $3 AND auction_phase_id IS NULL",
    )
    .bind(phase.id)
    .bind(claim_id)
    .bind(ParticipantStatus::Approved.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let cleared = sqlx::query("DELETE FROM claim_invitations WHERE claim_id = $1")
        .bind(claim_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    info!(
        "{:<12} --> Phase 1 id: {} opened, {} participants migrated, {} invitations cleared",
        "Command", phase.id, migrated, cleared
    );
    Ok(phase)
}

/// 2. Advance to phase 2
///
/// Closes the active phase, opens the next one with the claim's phase-2
/// window and carries forward only the selected contractors. All writes share
/// one transaction.
pub async fn advance_phase(
    pool: &PgPool,
    caller_id: &str,
    auction_id: i64,
    selected_participants: &[String],
) -> AppResult<AuctionPhase> {
    info!(
        "{:<12} --> Advance auction id: {} selected: {:?}",
        "Command", auction_id, selected_participants
    );
    let selected = normalize_selection(selected_participants)?;

    let mut tx = pool.begin().await?;

    let phase = sqlx::query_as::<_, AuctionPhase>(queries::GET_PHASE_FOR_UPDATE)
        .bind(auction_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Auction not found"))?;

    if phase.status == PhaseStatus::Closed {
        return Err(AppError::conflict("Auction already closed"));
    }

    // Claim lock orders this against invitation accepts on the same claim.
    let claim = sqlx::query_as::<_, Claim>(queries::GET_CLAIM_FOR_UPDATE)
        .bind(phase.claim_id)
        .fetch_one(&mut *tx)
        .await?;

    if claim.user_id != caller_id {
        return Err(AppError::Forbidden);
    }

    let participants = sqlx::query_as::<_, ClaimParticipant>(queries::GET_PHASE_PARTICIPANTS)
        .bind(phase.id)
        .fetch_all(&mut *tx)
        .await?;

    let plan = plan_advance(&phase, &participants, &selected)?;

    close_phase(&mut tx, phase.id).await?;

    let (start, end) = phase_window(claim.phase2_start, claim.phase2_end, Utc::now());
    let next = insert_phase(&mut tx, claim.id, plan.next_number, start, end).await?;

    set_participant_status(&mut tx, &plan.advanced, ParticipantStatus::Advanced).await?;
    set_participant_status(&mut tx, &plan.rejected, ParticipantStatus::Rejected).await?;

    for user_id in &plan.carried_forward {
        sqlx::query(
            "INSERT INTO claim_participants (user_id, claim_id, auction_phase_id, status, invited_by)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(claim.id)
        .bind(next.id)
        .bind(ParticipantStatus::Approved.as_str())
        .bind(caller_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(
        "{:<12} --> Auction id: {} closed, phase {} id: {} opened ({} advanced, {} rejected)",
        "Command",
        phase.id,
        next.number,
        next.id,
        plan.advanced.len(),
        plan.rejected.len()
    );
    Ok(next)
}

/// 3. Close the final phase
///
/// The winner keeps its approved row; everyone else on the phase is rejected
/// and the claim is closed.
pub async fn close_final_phase(
    pool: &PgPool,
    caller_id: &str,
    auction_id: i64,
    winner_id: &str,
) -> AppResult<AuctionPhase> {
    info!(
        "{:<12} --> Close auction id: {} winner: {}",
        "Command", auction_id, winner_id
    );
    let mut tx = pool.begin().await?;

    let phase = sqlx::query_as::<_, AuctionPhase>(queries::GET_PHASE_FOR_UPDATE)
        .bind(auction_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Auction not found"))?;

    if phase.status == PhaseStatus::Closed {
        return Err(AppError::conflict("Auction already closed"));
    }

    let claim = sqlx::query_as::<_, Claim>(queries::GET_CLAIM_FOR_UPDATE)
        .bind(phase.claim_id)
        .fetch_one(&mut *tx)
        .await?;

    if claim.user_id != caller_id {
        return Err(AppError::Forbidden);
    }
    if phase.number != FINAL_PHASE {
        return Err(AppError::conflict("Auction is not in its final phase"));
    }

    let winner_bid = sqlx::query_scalar::<_, Option<i64>>(queries::GET_LOWEST_BID_BY_USER)
        .bind(phase.id)
        .bind(winner_id)
        .fetch_one(&mut *tx)
        .await?;
    if winner_bid.is_none() {
        return Err(AppError::bad_request("Winner must have bid in this auction"));
    }

    let closed = close_phase(&mut tx, phase.id).await?;

    sqlx::query(
        "UPDATE claim_participants SET status = $1
         WHERE auction_phase_id = $2 AND user_id <> $3",
    )
    .bind(ParticipantStatus::Rejected.as_str())
    .bind(phase.id)
    .bind(winner_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE claims SET status = $1 WHERE id = $2")
        .bind(ClaimStatus::Closed.as_str())
        .bind(claim.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(
        "{:<12} --> Auction id: {} awarded to {} at {:?}",
        "Command", closed.id, winner_id, winner_bid
    );
    Ok(closed)
}

// endregion: --- Commands

// region:    --- Writes

async fn insert_phase(
    conn: &mut PgConnection,
    claim_id: i64,
    number: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<AuctionPhase> {
    sqlx::query_as::<_, AuctionPhase>(
        "INSERT INTO auction_phases (claim_id, number, status, start_date, end_date)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, claim_id, number, status, start_date, end_date, created_at",
    )
    .bind(claim_id)
    .bind(number)
    .bind(PhaseStatus::Active.as_str())
    .bind(start)
    .bind(end)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            warn!(
                "{:<12} --> Phase {} already exists for claim id: {}",
                "Command", number, claim_id
            );
            AppError::conflict("Auction phase already exists")
        }
        other => AppError::from(other),
    })
}

/// Conditional close: a phase some other request already closed affects no row.
async fn close_phase(conn: &mut PgConnection, phase_id: i64) -> AppResult<AuctionPhase> {
    sqlx::query_as::<_, AuctionPhase>(
        "UPDATE auction_phases SET status = $1
         WHERE id = $2 AND status = $3
         RETURNING id, claim_id, number, status, start_date, end_date, created_at",
    )
    .bind(PhaseStatus::Closed.as_str())
    .bind(phase_id)
    .bind(PhaseStatus::Active.as_str())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::conflict("Auction already closed"))
}

async fn set_participant_status(
    conn: &mut PgConnection,
    participant_ids: &[i64],
    status: ParticipantStatus,
) -> AppResult<()> {
    if participant_ids.is_empty() {
        return Ok(());
    }
    sqlx::query("UPDATE claim_participants SET status = $1 WHERE id = ANY($2)")
        .bind(status.as_str())
        .bind(participant_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// endregion: --- Writes
