use chrono::{Duration, Utc};
use std::time::Duration as StdDuration;
use reqwest::{Client, StatusCode};
use restoration_auction::auction::model::{ClaimParticipant, ParticipantStatus, PhaseStatus};
use restoration_auction::auth::issue_token;
use restoration_auction::config::Config;
use restoration_auction::database::DatabaseManager;
use restoration_auction::routes;
use restoration_auction::state::AppState;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::info;

const SECRET: &str = "integration-test-secret";

static SCHEMA: OnceCell<()> = OnceCell::const_new();
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

struct TestApp {
    base_url: String,
    client: Client,
    pool: Arc<PgPool>,
}

struct TestUser {
    id: String,
    token: String,
}

/// Tracing for debugging failed runs
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Serve the router on an ephemeral port. `None` when no database is configured.
async fn setup() -> Option<TestApp> {
    init_tracing();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping integration test");
            return None;
        }
    };

    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(database_url.clone()),
        "JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .expect("test configuration");

    let db_manager = DatabaseManager::connect(&config)
        .await
        .expect("database connection");
    SCHEMA
        .get_or_init(|| async {
            db_manager
                .initialize_database(false)
                .await
                .expect("schema initialization");
        })
        .await;
    let pool = db_manager.get_pool();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = routes::app(AppState::new(db_manager, config));
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .expect("server");
    });

    Some(TestApp {
        base_url: format!("http://{addr}"),
        client: Client::new(),
        pool,
    })
}

fn unique(prefix: &str) -> String {
    let n = SEQUENCE.fetch_add(1, Ordering::SeqCst);
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}-{nanos}-{n}")
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create_user(&self, user_type: &str) -> TestUser {
        let id = unique(user_type);
        let token = issue_token(SECRET, &id, Duration::hours(1)).unwrap();
        let response = self
            .client
            .put(self.url("/users/me"))
            .bearer_auth(&token)
            .json(&json!({
                "userType": user_type,
                "name": format!("{user_type} {id}"),
                "email": format!("{id}@example.com"),
            }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::OK);
        TestUser { id, token }
    }

    async fn create_claim(&self, homeowner: &TestUser) -> i64 {
        let response = self
            .client
            .post(self.url("/claims"))
            .bearer_auth(&homeowner.token)
            .json(&json!({
                "title": "Water damage after flood",
                "street": "400 River Rd",
                "city": "Baton Rouge",
                "state": "LA",
                "zipCode": "70801",
                "insuranceCompany": "Gulf Mutual",
                "insuranceEstimate": 3_200_000,
            }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::CREATED);
        let claim: Value = response.json().await.unwrap();
        assert_eq!(claim["status"], "draft");
        claim["id"].as_i64().unwrap()
    }

    async fn invite(&self, homeowner: &TestUser, claim_id: i64, contractor: &TestUser) -> i64 {
        let response = self
            .client
            .post(self.url(&format!("/claims/{claim_id}/invitations")))
            .bearer_auth(&homeowner.token)
            .json(&json!({ "contractorId": contractor.id }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::CREATED);
        let invitation: Value = response.json().await.unwrap();
        invitation["id"].as_i64().unwrap()
    }

    async fn accept(&self, contractor: &TestUser, invitation_id: i64) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/invitations/{invitation_id}/accept")))
            .bearer_auth(&contractor.token)
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn approve(&self, homeowner: &TestUser, claim_id: i64, contractor: &TestUser) {
        let invitation_id = self.invite(homeowner, claim_id, contractor).await;
        let response = self.accept(contractor, invitation_id).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(!self.invitation_exists(invitation_id).await);
    }

    async fn invitation_exists(&self, invitation_id: i64) -> bool {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM claim_invitations WHERE id = $1)")
            .bind(invitation_id)
            .fetch_one(&*self.pool)
            .await
            .unwrap()
    }

    async fn open_auction(&self, homeowner: &TestUser, claim_id: i64) -> i64 {
        let response = self
            .client
            .post(self.url(&format!("/claims/{claim_id}/auction")))
            .bearer_auth(&homeowner.token)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::CREATED);
        let phase: Value = response.json().await.unwrap();
        assert_eq!(phase["number"], 1);
        assert_eq!(phase["status"], "ACTIVE");
        phase["id"].as_i64().unwrap()
    }

    async fn bid(&self, contractor: &TestUser, auction_id: i64, amount: i64) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/auction/{auction_id}/bids")))
            .bearer_auth(&contractor.token)
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn advance(
        &self,
        homeowner: &TestUser,
        auction_id: i64,
        selected: &[&TestUser],
    ) -> reqwest::Response {
        let ids: Vec<&str> = selected.iter().map(|u| u.id.as_str()).collect();
        self.client
            .put(self.url(&format!("/auction/{auction_id}")))
            .bearer_auth(&homeowner.token)
            .json(&json!({ "selectedParticipants": ids }))
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn participants(&self, claim_id: i64) -> Vec<ClaimParticipant> {
        sqlx::query_as::<_, ClaimParticipant>(
            "SELECT id, user_id, claim_id, auction_phase_id, status, invited_by, created_at
             FROM claim_participants WHERE claim_id = $1 ORDER BY id",
        )
        .bind(claim_id)
        .fetch_all(&*self.pool)
        .await
        .unwrap()
    }

    async fn phase_statuses(&self, claim_id: i64) -> Vec<(i32, String)> {
        sqlx::query_as::<_, (i32, String)>(
            "SELECT number, status FROM auction_phases WHERE claim_id = $1 ORDER BY number",
        )
        .bind(claim_id)
        .fetch_all(&*self.pool)
        .await
        .unwrap()
    }
}

/// Homeowner, three approved contractors and an open phase 1.
async fn auction_with_three_contractors(
    app: &TestApp,
) -> (TestUser, [TestUser; 3], i64, i64) {
    let homeowner = app.create_user("homeowner").await;
    let a = app.create_user("contractor").await;
    let b = app.create_user("contractor").await;
    let c = app.create_user("contractor").await;

    let claim_id = app.create_claim(&homeowner).await;
    for contractor in [&a, &b, &c] {
        app.approve(&homeowner, claim_id, contractor).await;
    }
    let auction_id = app.open_auction(&homeowner, claim_id).await;
    (homeowner, [a, b, c], claim_id, auction_id)
}

/// Phase 1 advance: selected contractors move on, the rest are rejected
#[tokio::test]
async fn test_advance_to_second_phase() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, b, c], claim_id, p1) = auction_with_three_contractors(&app).await;

    for (contractor, amount) in [(&a, 2_900_000), (&b, 3_100_000), (&c, 3_400_000)] {
        assert_eq!(app.bid(contractor, p1, amount).await.status(), StatusCode::CREATED);
    }

    let response = app.advance(&homeowner, p1, &[&a, &b]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let p2: Value = response.json().await.unwrap();
    assert_eq!(p2["number"], 2);
    assert_eq!(p2["status"], "ACTIVE");
    let p2_id = p2["id"].as_i64().unwrap();

    assert_eq!(
        app.phase_statuses(claim_id).await,
        vec![(1, "CLOSED".to_string()), (2, "ACTIVE".to_string())]
    );

    let participants = app.participants(claim_id).await;
    let on_p1: Vec<_> = participants
        .iter()
        .filter(|p| p.auction_phase_id == Some(p1))
        .collect();
    let status_of = |user: &TestUser| {
        on_p1
            .iter()
            .find(|p| p.user_id == user.id)
            .map(|p| p.status)
            .unwrap()
    };
    assert_eq!(status_of(&a), ParticipantStatus::Advanced);
    assert_eq!(status_of(&b), ParticipantStatus::Advanced);
    assert_eq!(status_of(&c), ParticipantStatus::Rejected);

    let mut on_p2: Vec<_> = participants
        .iter()
        .filter(|p| p.auction_phase_id == Some(p2_id))
        .collect();
    on_p2.sort_by(|x, y| x.user_id.cmp(&y.user_id));
    assert_eq!(on_p2.len(), 2);
    assert!(on_p2.iter().all(|p| p.status == ParticipantStatus::Approved));
    let mut expected = vec![a.id.clone(), b.id.clone()];
    expected.sort();
    let carried: Vec<String> = on_p2.iter().map(|p| p.user_id.clone()).collect();
    assert_eq!(carried, expected);

    // Phase 2 detail carries the phase-1 bids for comparison
    let detail: Value = app
        .client
        .get(app.url(&format!("/auction/{p2_id}")))
        .bearer_auth(&homeowner.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["phase1Bids"].as_array().unwrap().len(), 3);
    assert!(detail["expandedBids"].as_array().unwrap().is_empty());
}

/// A closed phase cannot be advanced twice
#[tokio::test]
async fn test_advance_closed_auction() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, _b, _c], claim_id, p1) = auction_with_three_contractors(&app).await;

    assert_eq!(app.advance(&homeowner, p1, &[&a]).await.status(), StatusCode::CREATED);
    let before = app.participants(claim_id).await.len();

    let response = app.advance(&homeowner, p1, &[&a]).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Auction already closed");

    assert_eq!(app.phase_statuses(claim_id).await.len(), 2);
    assert_eq!(app.participants(claim_id).await.len(), before);
}

/// Only the claim's homeowner may advance
#[tokio::test]
async fn test_advance_by_other_homeowner() {
    let Some(app) = setup().await else { return };
    let (_homeowner, [a, _b, _c], claim_id, p1) = auction_with_three_contractors(&app).await;
    let stranger = app.create_user("homeowner").await;

    let response = app.advance(&stranger, p1, &[&a]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden");

    assert_eq!(
        app.phase_statuses(claim_id).await,
        vec![(1, PhaseStatus::Active.to_string())]
    );
    assert!(app
        .participants(claim_id)
        .await
        .iter()
        .all(|p| p.status == ParticipantStatus::Approved));
}

/// Empty selections never reach the database
#[tokio::test]
async fn test_advance_with_empty_selection() {
    let Some(app) = setup().await else { return };
    let (homeowner, _, claim_id, p1) = auction_with_three_contractors(&app).await;

    let response = app.advance(&homeowner, p1, &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .put(app.url(&format!("/auction/{p1}")))
        .bearer_auth(&homeowner.token)
        .json(&json!({ "selectedParticipants": "not-an-array" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(
        app.phase_statuses(claim_id).await,
        vec![(1, "ACTIVE".to_string())]
    );
}

/// Missing tokens are rejected before anything else
#[tokio::test]
async fn test_unauthenticated_requests() {
    let Some(app) = setup().await else { return };

    let response = app
        .client
        .put(app.url("/auction/1"))
        .json(&json!({ "selectedParticipants": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.client.get(app.url("/auction")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Opening phase 1 activates the claim, migrates approved contractors and clears invitations
#[tokio::test]
async fn test_open_auction_migrates_participants() {
    let Some(app) = setup().await else { return };
    let homeowner = app.create_user("homeowner").await;
    let approved = app.create_user("contractor").await;
    let invited = app.create_user("contractor").await;

    let claim_id = app.create_claim(&homeowner).await;
    app.approve(&homeowner, claim_id, &approved).await;
    app.invite(&homeowner, claim_id, &invited).await;

    let p1 = app.open_auction(&homeowner, claim_id).await;

    let claim: Value = app
        .client
        .get(app.url(&format!("/claims/{claim_id}")))
        .bearer_auth(&homeowner.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(claim["status"], "active");

    let participants = app.participants(claim_id).await;
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].user_id, approved.id);
    assert_eq!(participants[0].auction_phase_id, Some(p1));
    assert_eq!(participants[0].status, ParticipantStatus::Approved);

    let invitations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM claim_invitations WHERE claim_id = $1")
            .bind(claim_id)
            .fetch_one(&*app.pool)
            .await
            .unwrap();
    assert_eq!(invitations, 0);

    // A second open is refused
    let response = app
        .client
        .post(app.url(&format!("/claims/{claim_id}/auction")))
        .bearer_auth(&homeowner.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// Phase 1 is sealed, phase 2 is a descending reverse auction
#[tokio::test]
async fn test_bidding_rules() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, b, c], _claim_id, p1) = auction_with_three_contractors(&app).await;

    assert_eq!(app.bid(&a, p1, 3_000_000).await.status(), StatusCode::CREATED);
    assert_eq!(app.bid(&b, p1, 3_500_000).await.status(), StatusCode::CREATED);
    // Revising upward is refused
    assert_eq!(app.bid(&a, p1, 3_100_000).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.bid(&a, p1, 2_950_000).await.status(), StatusCode::CREATED);

    // Sealed: a contractor only sees their own offers
    let detail: Value = app
        .client
        .get(app.url(&format!("/auction/{p1}")))
        .bearer_auth(&b.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let bids = detail["expandedBids"].as_array().unwrap();
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0]["bidderId"], b.id.as_str());

    let response = app.advance(&homeowner, p1, &[&a, &b]).await;
    let p2 = response.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    assert_eq!(app.bid(&a, p2, 2_800_000).await.status(), StatusCode::CREATED);
    let response = app.bid(&b, p2, 2_850_000).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Bid must be lower than the current lowest bid");
    assert_eq!(app.bid(&b, p2, 2_700_000).await.status(), StatusCode::CREATED);

    // Rejected contractors are out of phase 2
    assert_eq!(app.bid(&c, p2, 1_000_000).await.status(), StatusCode::FORBIDDEN);
    // Phase 1 no longer takes bids
    assert_eq!(app.bid(&a, p1, 1_000_000).await.status(), StatusCode::CONFLICT);

    let response = app
        .client
        .post(app.url(&format!("/auction/{p2}/close")))
        .bearer_auth(&homeowner.token)
        .json(&json!({ "winnerId": b.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let closed: Value = response.json().await.unwrap();
    assert_eq!(closed["status"], "CLOSED");
}

/// Concurrent closers: exactly one wins
#[tokio::test]
async fn test_concurrent_advance() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, b, _c], claim_id, p1) = auction_with_three_contractors(&app).await;

    let (only_a, only_b) = ([&a], [&b]);
    let (first, second) = tokio::join!(
        app.advance(&homeowner, p1, &only_a),
        app.advance(&homeowner, p1, &only_b)
    );
    let mut statuses = vec![first.status(), second.status()];
    statuses.sort();
    info!("concurrent advance statuses: {:?}", statuses);
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    assert_eq!(
        app.phase_statuses(claim_id).await,
        vec![(1, "CLOSED".to_string()), (2, "ACTIVE".to_string())]
    );
    let carried = app
        .participants(claim_id)
        .await
        .into_iter()
        .filter(|p| p.auction_phase_id != Some(p1))
        .count();
    assert_eq!(carried, 1);
}

/// Active auction lists depend on the caller's role
#[tokio::test]
async fn test_active_auction_lists() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, _b, _c], _claim_id, p1) = auction_with_three_contractors(&app).await;
    let outsider = app.create_user("contractor").await;

    for (user, expected) in [(&homeowner, true), (&a, true), (&outsider, false)] {
        let list: Vec<Value> = app
            .client
            .get(app.url("/auction"))
            .bearer_auth(&user.token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            list.iter().any(|item| item["id"].as_i64() == Some(p1)),
            expected
        );
    }

    let response = app
        .client
        .get(app.url(&format!("/auction/{p1}")))
        .bearer_auth(&outsider.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// An accept racing an advance waits for it and then finds phase 2 running
#[tokio::test]
async fn test_accept_during_advance() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, b, c], claim_id, p1) = auction_with_three_contractors(&app).await;
    let late = app.create_user("contractor").await;
    let invitation_id = app.invite(&homeowner, claim_id, &late).await;

    let c_row = app
        .participants(claim_id)
        .await
        .into_iter()
        .find(|p| p.user_id == c.id)
        .map(|p| p.id)
        .unwrap();

    // Holding C's row parks the advance right before it rejects C.
    let mut blocker = app.pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM claim_participants WHERE id = $1 FOR UPDATE")
        .bind(c_row)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let selection = [&a, &b];
    let accept = async {
        sleep(StdDuration::from_millis(300)).await;
        app.accept(&late, invitation_id).await
    };
    let release = async move {
        sleep(StdDuration::from_millis(900)).await;
        blocker.rollback().await.unwrap();
    };
    let (advanced, accepted, ()) =
        tokio::join!(app.advance(&homeowner, p1, &selection), accept, release);

    assert_eq!(advanced.status(), StatusCode::CREATED);
    assert_eq!(accepted.status(), StatusCode::CONFLICT);
    let body: Value = accepted.json().await.unwrap();
    assert_eq!(body["error"], "Auction is in its final phase");

    assert_eq!(
        app.phase_statuses(claim_id).await,
        vec![(1, "CLOSED".to_string()), (2, "ACTIVE".to_string())]
    );
    let participants = app.participants(claim_id).await;
    assert!(participants
        .iter()
        .filter(|p| p.auction_phase_id == Some(p1))
        .all(|p| p.status != ParticipantStatus::Approved));
    assert!(participants.iter().all(|p| p.user_id != late.id));
    assert!(app.invitation_exists(invitation_id).await);
}

/// Phase 2 only admits contractors advanced out of phase 1
#[tokio::test]
async fn test_final_phase_refuses_newcomers() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, b, _c], claim_id, p1) = auction_with_three_contractors(&app).await;
    let pending = app.create_user("contractor").await;
    let newcomer = app.create_user("contractor").await;
    let invitation_id = app.invite(&homeowner, claim_id, &pending).await;

    let response = app.advance(&homeowner, p1, &[&a, &b]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let p2 = response.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let response = app
        .client
        .post(app.url(&format!("/claims/{claim_id}/invitations")))
        .bearer_auth(&homeowner.token)
        .json(&json!({ "contractorId": newcomer.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Auction is in its final phase");

    let response = app.accept(&pending, invitation_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let on_p2 = app
        .participants(claim_id)
        .await
        .into_iter()
        .filter(|p| p.auction_phase_id == Some(p2))
        .count();
    assert_eq!(on_p2, 2);
    assert_eq!(app.bid(&pending, p2, 1_000_000).await.status(), StatusCode::FORBIDDEN);
}

/// Declining removes the invitation; a second decline finds nothing
#[tokio::test]
async fn test_decline_invitation() {
    let Some(app) = setup().await else { return };
    let homeowner = app.create_user("homeowner").await;
    let contractor = app.create_user("contractor").await;
    let claim_id = app.create_claim(&homeowner).await;
    let invitation_id = app.invite(&homeowner, claim_id, &contractor).await;

    let decline = || {
        app.client
            .post(app.url(&format!("/invitations/{invitation_id}/decline")))
            .bearer_auth(&contractor.token)
            .send()
    };
    assert_eq!(decline().await.unwrap().status(), StatusCode::NO_CONTENT);
    assert!(!app.invitation_exists(invitation_id).await);

    let response = decline().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invitation not found");

    assert_eq!(
        app.accept(&contractor, invitation_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert!(app.participants(claim_id).await.is_empty());
}

/// Duplicate invitations and invitations for participants are conflicts
#[tokio::test]
async fn test_duplicate_invitations() {
    let Some(app) = setup().await else { return };
    let homeowner = app.create_user("homeowner").await;
    let invited = app.create_user("contractor").await;
    let approved = app.create_user("contractor").await;
    let claim_id = app.create_claim(&homeowner).await;

    app.invite(&homeowner, claim_id, &invited).await;
    app.approve(&homeowner, claim_id, &approved).await;

    for (contractor, message) in [
        (&invited, "Contractor already invited"),
        (&approved, "Contractor already participates in this claim"),
    ] {
        let response = app
            .client
            .post(app.url(&format!("/claims/{claim_id}/invitations")))
            .bearer_auth(&homeowner.token)
            .json(&json!({ "contractorId": contractor.id }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], message);
    }
}

/// A claim's phases come back in order, and only to those on the claim
#[tokio::test]
async fn test_claim_phases() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, _b, _c], claim_id, p1) = auction_with_three_contractors(&app).await;
    let outsider = app.create_user("contractor").await;
    assert_eq!(app.advance(&homeowner, p1, &[&a]).await.status(), StatusCode::CREATED);

    let phases: Vec<Value> = app
        .client
        .get(app.url(&format!("/claims/{claim_id}/auction")))
        .bearer_auth(&a.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let summary: Vec<(i64, &str)> = phases
        .iter()
        .map(|p| (p["number"].as_i64().unwrap(), p["status"].as_str().unwrap()))
        .collect();
    assert_eq!(summary, vec![(1, "CLOSED"), (2, "ACTIVE")]);

    let response = app
        .client
        .get(app.url(&format!("/claims/{claim_id}/auction")))
        .bearer_auth(&outsider.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Awarding needs the final phase, its owner and a winner who bid
#[tokio::test]
async fn test_close_auction_rejections() {
    let Some(app) = setup().await else { return };
    let (homeowner, [a, b, _c], claim_id, p1) = auction_with_three_contractors(&app).await;
    let stranger = app.create_user("homeowner").await;

    let close = |user: &TestUser, auction_id: i64, winner: &TestUser| {
        app.client
            .post(app.url(&format!("/auction/{auction_id}/close")))
            .bearer_auth(&user.token)
            .json(&json!({ "winnerId": winner.id }))
            .send()
    };

    assert_eq!(app.bid(&a, p1, 2_000_000).await.status(), StatusCode::CREATED);
    let response = close(&homeowner, p1, &a).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Auction is not in its final phase");

    let response = app.advance(&homeowner, p1, &[&a, &b]).await;
    let p2 = response.json::<Value>().await.unwrap()["id"].as_i64().unwrap();
    assert_eq!(app.bid(&a, p2, 1_900_000).await.status(), StatusCode::CREATED);

    let response = close(&stranger, p2, &a).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = close(&homeowner, p2, &b).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Winner must have bid in this auction");

    assert_eq!(
        app.phase_statuses(claim_id).await,
        vec![(1, "CLOSED".to_string()), (2, "ACTIVE".to_string())]
    );
    assert_eq!(close(&homeowner, p2, &a).await.unwrap().status(), StatusCode::OK);
}

/// Unparsable path ids get a JSON error body
#[tokio::test]
async fn test_malformed_path_ids() {
    let Some(app) = setup().await else { return };
    let contractor = app.create_user("contractor").await;

    for path in ["/auction/abc", "/claims/abc/auction"] {
        let response = app
            .client
            .get(app.url(path))
            .bearer_auth(&contractor.token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}
