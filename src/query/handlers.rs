// region:    --- Imports
use super::queries;
use super::views::{AuctionDetail, AuctionSummary, ExpandedBid, ParticipantView};
use crate::auction::model::{AuctionPhase, PhaseStatus, FINAL_PHASE, FIRST_PHASE};
use crate::claim::model::{Claim, ClaimInvitation};
use crate::database::DatabaseManager;
use crate::error::{AppError, AppResult};
use crate::user::model::{User, UserType};
use sqlx::Error as SqlxError;
use sqlx::PgConnection;
use tracing::info;

// endregion: --- Imports

// region:    --- Access

/// Owner or participant of the claim; anyone else is forbidden.
/// Returns whether the viewer owns the claim.
async fn ensure_claim_access(
    conn: &mut PgConnection,
    claim: &Claim,
    viewer_id: &str,
) -> AppResult<bool> {
    if claim.user_id == viewer_id {
        return Ok(true);
    }
    let participant = sqlx::query_scalar::<_, bool>(queries::IS_CLAIM_PARTICIPANT)
        .bind(claim.id)
        .bind(viewer_id)
        .fetch_one(&mut *conn)
        .await?;
    if participant {
        Ok(false)
    } else {
        Err(AppError::Forbidden)
    }
}

/// Bids a viewer may see. A sealed phase only shows the viewer's own offers.
pub fn visible_bids(bids: Vec<ExpandedBid>, viewer_id: &str, sealed: bool) -> Vec<ExpandedBid> {
    if !sealed {
        return bids;
    }
    bids.into_iter()
        .filter(|bid| bid.bidder_id == viewer_id)
        .collect()
}

// endregion: --- Access

// region:    --- Query Handlers

/// User lookup
pub async fn get_user(
    db_manager: &DatabaseManager,
    user_id: &str,
) -> Result<Option<User>, SqlxError> {
    sqlx::query_as::<_, User>(queries::GET_USER)
        .bind(user_id)
        .fetch_optional(db_manager.pool())
        .await
}

/// Claims visible to the viewer
pub async fn list_claims(
    db_manager: &DatabaseManager,
    viewer_id: &str,
    viewer_type: UserType,
) -> Result<Vec<Claim>, SqlxError> {
    info!("{:<12} --> Claims for {} ({})", "Query", viewer_id, viewer_type);
    let sql = match viewer_type {
        UserType::Homeowner => queries::GET_CLAIMS_BY_OWNER,
        UserType::Contractor => queries::GET_CLAIMS_BY_PARTICIPANT,
    };
    sqlx::query_as::<_, Claim>(sql)
        .bind(viewer_id)
        .fetch_all(db_manager.pool())
        .await
}

/// Single claim
pub async fn get_claim(
    db_manager: &DatabaseManager,
    viewer_id: &str,
    claim_id: i64,
) -> AppResult<Claim> {
    info!("{:<12} --> Claim id: {}", "Query", claim_id);
    let viewer_id = viewer_id.to_string();
    db_manager
        .transaction(move |tx| {
            Box::pin(async move {
                let claim = sqlx::query_as::<_, Claim>(queries::GET_CLAIM)
                    .bind(claim_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or_else(|| AppError::not_found("Claim not found"))?;
                ensure_claim_access(&mut **tx, &claim, &viewer_id).await?;
                Ok::<_, AppError>(claim)
            })
        })
        .await
}

/// Pending invitations for a contractor
pub async fn list_invitations(
    db_manager: &DatabaseManager,
    contractor_id: &str,
) -> Result<Vec<ClaimInvitation>, SqlxError> {
    info!("{:<12} --> Invitations for {}", "Query", contractor_id);
    sqlx::query_as::<_, ClaimInvitation>(queries::GET_INVITATIONS_FOR_CONTRACTOR)
        .bind(contractor_id)
        .fetch_all(db_manager.pool())
        .await
}

/// Active auctions for the viewer: a homeowner sees the auctions on claims
/// they own, a contractor the auctions listing them as participant.
pub async fn list_active_auctions(
    db_manager: &DatabaseManager,
    viewer_id: &str,
    viewer_type: UserType,
) -> Result<Vec<AuctionSummary>, SqlxError> {
    info!(
        "{:<12} --> Active auctions for {} ({})",
        "Query", viewer_id, viewer_type
    );
    let sql = match viewer_type {
        UserType::Homeowner => queries::GET_ACTIVE_AUCTIONS_FOR_OWNER,
        UserType::Contractor => queries::GET_ACTIVE_AUCTIONS_FOR_PARTICIPANT,
    };
    sqlx::query_as::<_, AuctionSummary>(sql)
        .bind(viewer_id)
        .fetch_all(db_manager.pool())
        .await
}

/// Auction detail with flattened bids and, on phase 2, the phase-1 bids
pub async fn get_auction_detail(
    db_manager: &DatabaseManager,
    viewer_id: &str,
    auction_id: i64,
) -> AppResult<AuctionDetail> {
    info!("{:<12} --> Auction detail id: {}", "Query", auction_id);
    let viewer_id = viewer_id.to_string();
    db_manager
        .transaction(move |tx| {
            Box::pin(async move { load_auction_detail(&mut **tx, &viewer_id, auction_id).await })
        })
        .await
}

/// Phases of a claim
pub async fn list_claim_phases(
    db_manager: &DatabaseManager,
    viewer_id: &str,
    claim_id: i64,
) -> AppResult<Vec<AuctionPhase>> {
    info!("{:<12} --> Phases of claim id: {}", "Query", claim_id);
    let viewer_id = viewer_id.to_string();
    db_manager
        .transaction(move |tx| {
            Box::pin(async move {
                let claim = sqlx::query_as::<_, Claim>(queries::GET_CLAIM)
                    .bind(claim_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or_else(|| AppError::not_found("Claim not found"))?;
                ensure_claim_access(&mut **tx, &claim, &viewer_id).await?;

                let phases = sqlx::query_as::<_, AuctionPhase>(queries::GET_CLAIM_PHASES)
                    .bind(claim_id)
                    .fetch_all(&mut **tx)
                    .await?;
                Ok::<_, AppError>(phases)
            })
        })
        .await
}

// endregion: --- Query Handlers

// region:    --- Loaders

async fn fetch_expanded_bids(
    conn: &mut PgConnection,
    phase_id: i64,
) -> Result<Vec<ExpandedBid>, SqlxError> {
    sqlx::query_as::<_, ExpandedBid>(queries::GET_EXPANDED_BIDS)
        .bind(phase_id)
        .fetch_all(&mut *conn)
        .await
}

async fn load_auction_detail(
    conn: &mut PgConnection,
    viewer_id: &str,
    auction_id: i64,
) -> AppResult<AuctionDetail> {
    let auction = sqlx::query_as::<_, AuctionPhase>(queries::GET_PHASE)
        .bind(auction_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Auction not found"))?;

    let claim = sqlx::query_as::<_, Claim>(queries::GET_CLAIM)
        .bind(auction.claim_id)
        .fetch_one(&mut *conn)
        .await?;
    let is_owner = ensure_claim_access(&mut *conn, &claim, viewer_id).await?;

    let participants = sqlx::query_as::<_, ParticipantView>(queries::GET_PHASE_PARTICIPANT_VIEWS)
        .bind(auction.id)
        .fetch_all(&mut *conn)
        .await?;

    let sealed =
        !is_owner && auction.number == FIRST_PHASE && auction.status == PhaseStatus::Active;
    let expanded_bids = visible_bids(
        fetch_expanded_bids(&mut *conn, auction.id).await?,
        viewer_id,
        sealed,
    );
    let lowest_bid = expanded_bids.iter().map(|bid| bid.amount).min();

    let phase1_bids = if auction.number == FINAL_PHASE {
        let first = sqlx::query_as::<_, AuctionPhase>(queries::GET_CLAIM_PHASE_BY_NUMBER)
            .bind(claim.id)
            .bind(FIRST_PHASE)
            .fetch_optional(&mut *conn)
            .await?;
        match first {
            // Phase-1 offers stay sealed for contractors after the round closes.
            Some(first) => Some(visible_bids(
                fetch_expanded_bids(&mut *conn, first.id).await?,
                viewer_id,
                !is_owner,
            )),
            None => Some(Vec::new()),
        }
    } else {
        None
    };

    Ok(AuctionDetail {
        auction,
        claim,
        participants,
        expanded_bids,
        lowest_bid,
        phase1_bids,
    })
}

// endregion: --- Loaders
