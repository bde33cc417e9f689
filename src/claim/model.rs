use crate::macros::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum!(
    /// Lifecycle of a homeowner's claim.
    ClaimStatus, "claim status" {
        Draft => "draft",
        Active => "active",
        Closed => "closed",
    }
);

// Claim model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub insurance_company: Option<String>,
    pub insurance_estimate: Option<i64>,
    pub phase1_start: Option<DateTime<Utc>>,
    pub phase1_end: Option<DateTime<Utc>>,
    pub phase2_start: Option<DateTime<Utc>>,
    pub phase2_end: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
}

// Invitation model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClaimInvitation {
    pub id: i64,
    pub claim_id: i64,
    pub contractor_id: String,
    pub invited_by: String,
    pub created_at: DateTime<Utc>,
}

/// Body for `POST /claims`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClaimCommand {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    pub insurance_company: Option<String>,
    pub insurance_estimate: Option<i64>,
    pub phase1_start: Option<DateTime<Utc>>,
    pub phase1_end: Option<DateTime<Utc>>,
    pub phase2_start: Option<DateTime<Utc>>,
    pub phase2_end: Option<DateTime<Utc>>,
}

/// Body for `POST /claims/:claimId/invitations`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteContractorCommand {
    pub contractor_id: String,
}
