//! Pure decisions behind the phase transition.
//!
//! Everything here works on rows already loaded inside the transaction, so the
//! command layer only has to apply the resulting plan.

use super::model::{AuctionPhase, ClaimParticipant, PhaseStatus, FINAL_PHASE};
use crate::error::{AppError, AppResult};
use std::collections::HashSet;

/// What closing a phase and opening the next one writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancePlan {
    pub next_number: i32,
    /// Participant row ids of the closing phase that move to `ADVANCED`.
    pub advanced: Vec<i64>,
    /// Participant row ids of the closing phase that move to `REJECTED`.
    pub rejected: Vec<i64>,
    /// Contractor user ids that get a fresh `APPROVED` row on the next phase.
    pub carried_forward: Vec<String>,
}

/// Reject an empty or blank selection before anything touches the database.
pub fn normalize_selection(selected: &[String]) -> AppResult<Vec<String>> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = selected
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect();

    if ids.is_empty() {
        return Err(AppError::bad_request(
            "selectedParticipants must be a non-empty array",
        ));
    }
    Ok(ids)
}

/// Partition the closing phase's participants by the homeowner's selection.
pub fn plan_advance(
    phase: &AuctionPhase,
    participants: &[ClaimParticipant],
    selected: &[String],
) -> AppResult<AdvancePlan> {
    if phase.status == PhaseStatus::Closed {
        return Err(AppError::conflict("Auction already closed"));
    }
    if phase.number >= FINAL_PHASE {
        return Err(AppError::conflict("Auction already in final phase"));
    }

    let selected_set: HashSet<&str> = selected.iter().map(String::as_str).collect();
    let present: HashSet<&str> = participants.iter().map(|p| p.user_id.as_str()).collect();
    if let Some(missing) = selected.iter().find(|id| !present.contains(id.as_str())) {
        return Err(AppError::bad_request(format!(
            "Selected participant is not in this auction: {missing}"
        )));
    }

    let (advanced, rejected): (Vec<&ClaimParticipant>, Vec<&ClaimParticipant>) = participants
        .iter()
        .partition(|p| selected_set.contains(p.user_id.as_str()));

    let mut carried = HashSet::new();
    let carried_forward = advanced
        .iter()
        .filter(|p| carried.insert(p.user_id.as_str()))
        .map(|p| p.user_id.clone())
        .collect();

    Ok(AdvancePlan {
        next_number: phase.number + 1,
        advanced: advanced.iter().map(|p| p.id).collect(),
        rejected: rejected.iter().map(|p| p.id).collect(),
        carried_forward,
    })
}
