use crate::auction::model::{AuctionPhase, ParticipantStatus, PhaseStatus};
use crate::claim::model::Claim;
use chrono::{DateTime, Utc};
use serde::Serialize;

// Active auction list row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSummary {
    pub id: i64,
    pub claim_id: i64,
    pub number: i32,
    #[sqlx(try_from = "String")]
    pub status: PhaseStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub claim_title: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub bid_count: i64,
}

/// A bid flattened with its bidder's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedBid {
    pub bid_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub bidder_id: String,
    pub bidder_name: String,
    pub bidder_email: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    #[sqlx(try_from = "String")]
    pub status: ParticipantStatus,
    pub invited_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDetail {
    pub auction: AuctionPhase,
    pub claim: Claim,
    pub participants: Vec<ParticipantView>,
    pub expanded_bids: Vec<ExpandedBid>,
    pub lowest_bid: Option<i64>,
    /// Present only on phase 2, for comparison with the sealed round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase1_bids: Option<Vec<ExpandedBid>>,
}
