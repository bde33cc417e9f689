use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Build the HTTP router over the shared state.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route(
            "/users/me",
            get(handlers::handle_get_profile).put(handlers::handle_upsert_profile),
        )
        .route(
            "/claims",
            get(handlers::handle_get_claims).post(handlers::handle_create_claim),
        )
        .route("/claims/:claim_id", get(handlers::handle_get_claim))
        .route(
            "/claims/:claim_id/invitations",
            post(handlers::handle_invite_contractor),
        )
        .route(
            "/claims/:claim_id/auction",
            get(handlers::handle_get_claim_auctions).post(handlers::handle_open_auction),
        )
        .route("/invitations", get(handlers::handle_get_invitations))
        .route(
            "/invitations/:invitation_id/accept",
            post(handlers::handle_accept_invitation),
        )
        .route(
            "/invitations/:invitation_id/decline",
            post(handlers::handle_decline_invitation),
        )
        .route("/auction", get(handlers::handle_get_active_auctions))
        .route(
            "/auction/:auction_id",
            get(handlers::handle_get_auction).put(handlers::handle_advance_auction),
        )
        .route(
            "/auction/:auction_id/bids",
            post(handlers::handle_place_bid),
        )
        .route(
            "/auction/:auction_id/close",
            post(handlers::handle_close_auction),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
