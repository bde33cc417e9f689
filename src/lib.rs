//! Restoration auction service.
//!
//! Homeowners file damage claims and invite contractors; approved contractors
//! compete in a two-phase auction. Phase 1 is a sealed round, after which the
//! homeowner advances a shortlist into phase 2, a descending reverse auction.

mod macros;

pub mod auction;
pub mod auth;
pub mod bidding;
pub mod claim;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod query;
pub mod routes;
pub mod state;
pub mod user;
