use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Bid model, amounts in cents
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: i64,
    pub auction_phase_id: i64,
    pub user_id: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Body for `POST /auction/:auctionId/bids`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidCommand {
    pub amount: i64,
}
