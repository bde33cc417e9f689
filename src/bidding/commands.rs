//! Bid placement
//!
//! Phase 1 is sealed: contractors cannot see each other and may only revise
//! their own offer downward. Phase 2 is a reverse auction: every bid has to
//! undercut the lowest offer on the phase.
// region:    --- Imports
use super::model::{Bid, PlaceBidCommand};
use crate::auction::model::{AuctionPhase, ParticipantStatus, PhaseStatus, FIRST_PHASE};
use crate::error::{AppError, AppResult};
use crate::query::queries;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

// endregion: --- Imports

/// Check an amount against the reference price of its phase.
///
/// `floor` is the caller's own lowest bid in phase 1 and the phase's lowest
/// bid in phase 2.
pub fn check_bid_amount(phase_number: i32, amount: i64, floor: Option<i64>) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::bad_request("Bid amount must be positive"));
    }
    match floor {
        Some(floor) if amount >= floor && phase_number == FIRST_PHASE => Err(
            AppError::bad_request("Bid must be lower than your previous bid"),
        ),
        Some(floor) if amount >= floor => Err(AppError::bad_request(
            "Bid must be lower than the current lowest bid",
        )),
        _ => Ok(()),
    }
}

/// Place a bid on an active phase.
pub async fn place_bid(
    pool: &PgPool,
    caller_id: &str,
    auction_id: i64,
    cmd: PlaceBidCommand,
    now: DateTime<Utc>,
) -> AppResult<Bid> {
    info!(
        "{:<12} --> Bid on auction id: {} by {}: {:?}",
        "Command", auction_id, caller_id, cmd
    );
    let mut tx = pool.begin().await?;

    // The lock serializes bids on one phase so the floor read below stays current.
    let phase = sqlx::query_as::<_, AuctionPhase>(queries::GET_PHASE_FOR_UPDATE)
        .bind(auction_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Auction not found"))?;

    if phase.status == PhaseStatus::Closed {
        return Err(AppError::conflict("Auction already closed"));
    }
    if !phase.is_open_at(now) {
        return Err(AppError::conflict("Auction is not open for bidding"));
    }

    let approved = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
             SELECT 1 FROM claim_participants
             WHERE auction_phase_id = $1 AND user_id = $2 AND status = $3
         )",
    )
    .bind(phase.id)
    .bind(caller_id)
    .bind(ParticipantStatus::Approved.as_str())
    .fetch_one(&mut *tx)
    .await?;
    if !approved {
        return Err(AppError::Forbidden);
    }

    let floor = if phase.number == FIRST_PHASE {
        sqlx::query_scalar::<_, Option<i64>>(queries::GET_LOWEST_BID_BY_USER)
            .bind(phase.id)
            .bind(caller_id)
            .fetch_one(&mut *tx)
            .await?
    } else {
        sqlx::query_scalar::<_, Option<i64>>(queries::GET_LOWEST_BID)
            .bind(phase.id)
            .fetch_one(&mut *tx)
            .await?
    };
    check_bid_amount(phase.number, cmd.amount, floor)?;

    let bid = sqlx::query_as::<_, Bid>(
        "INSERT INTO bids (auction_phase_id, user_id, amount, created_at)
         VALUES ($1, $2, $3, $4)
         RETURNING id, auction_phase_id, user_id, amount, created_at",
    )
    .bind(phase.id)
    .bind(caller_id)
    .bind(cmd.amount)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(
        "{:<12} --> Bid id: {} accepted at {} (previous floor {:?})",
        "Command", bid.id, bid.amount, floor
    );
    Ok(bid)
}
