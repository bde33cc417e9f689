use crate::macros::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum!(
    /// Whether a phase still accepts bids.
    PhaseStatus, "auction phase status" {
        Active => "ACTIVE",
        Closed => "CLOSED",
    }
);

text_enum!(
    /// Approval lifecycle of a contractor within a claim.
    ParticipantStatus, "participant status" {
        Approved => "APPROVED",
        Advanced => "ADVANCED",
        Rejected => "REJECTED",
    }
);

/// Phase 1 is the broad sealed round; phase 2 the narrowed reverse auction.
pub const FIRST_PHASE: i32 = 1;
pub const FINAL_PHASE: i32 = 2;

// Auction phase model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuctionPhase {
    pub id: i64,
    pub claim_id: i64,
    pub number: i32,
    #[sqlx(try_from = "String")]
    pub status: PhaseStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuctionPhase {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PhaseStatus::Active && self.start_date <= now && now <= self.end_date
    }
}

// Claim participant model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClaimParticipant {
    pub id: i64,
    pub user_id: String,
    pub claim_id: i64,
    pub auction_phase_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: ParticipantStatus,
    pub invited_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body for `PUT /auction/:auctionId`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancePhaseCommand {
    #[serde(default)]
    pub selected_participants: Vec<String>,
}

/// Body for `POST /auction/:auctionId/close`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseAuctionCommand {
    pub winner_id: String,
}
