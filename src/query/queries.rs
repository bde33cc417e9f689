/// User lookup
pub const GET_USER: &str =
    "SELECT id, user_type, name, email, created_at FROM users WHERE id = $1";

/// Claim lookup
pub const GET_CLAIM: &str = r#"
    SELECT id, user_id, title, description, street, city, state, zip_code,
           insurance_company, insurance_estimate,
           phase1_start, phase1_end, phase2_start, phase2_end, status, created_at
    FROM claims
    WHERE id = $1
"#;

/// Claim lookup, row locked for the rest of the transaction
pub const GET_CLAIM_FOR_UPDATE: &str = r#"
    SELECT id, user_id, title, description, street, city, state, zip_code,
           insurance_company, insurance_estimate,
           phase1_start, phase1_end, phase2_start, phase2_end, status, created_at
    FROM claims
    WHERE id = $1
    FOR UPDATE
"#;

/// Claims owned by a homeowner
pub const GET_CLAIMS_BY_OWNER: &str = r#"
    SELECT id, user_id, title, description, street, city, state, zip_code,
           insurance_company, insurance_estimate,
           phase1_start, phase1_end, phase2_start, phase2_end, status, created_at
    FROM claims
    WHERE user_id = $1
    ORDER BY created_at DESC
"#;

/// Claims a contractor participates in
pub const GET_CLAIMS_BY_PARTICIPANT: &str = r#"
    SELECT c.id, c.user_id, c.title, c.description, c.street, c.city, c.state, c.zip_code,
           c.insurance_company, c.insurance_estimate,
           c.phase1_start, c.phase1_end, c.phase2_start, c.phase2_end, c.status, c.created_at
    FROM claims c
    WHERE EXISTS (
        SELECT 1 FROM claim_participants p WHERE p.claim_id = c.id AND p.user_id = $1
    )
    ORDER BY c.created_at DESC
"#;

/// Whether a user holds any participant row on a claim
pub const IS_CLAIM_PARTICIPANT: &str =
    "SELECT EXISTS (SELECT 1 FROM claim_participants WHERE claim_id = $1 AND user_id = $2)";

/// Auction phase lookup
pub const GET_PHASE: &str = r#"
    SELECT id, claim_id, number, status, start_date, end_date, created_at
    FROM auction_phases
    WHERE id = $1
"#;

/// Auction phase lookup, row locked for the rest of the transaction
pub const GET_PHASE_FOR_UPDATE: &str = r#"
    SELECT id, claim_id, number, status, start_date, end_date, created_at
    FROM auction_phases
    WHERE id = $1
    FOR UPDATE
"#;

/// Phases of a claim
pub const GET_CLAIM_PHASES: &str = r#"
    SELECT id, claim_id, number, status, start_date, end_date, created_at
    FROM auction_phases
    WHERE claim_id = $1
    ORDER BY number ASC
"#;

/// A claim's phase by number
pub const GET_CLAIM_PHASE_BY_NUMBER: &str = r#"
    SELECT id, claim_id, number, status, start_date, end_date, created_at
    FROM auction_phases
    WHERE claim_id = $1 AND number = $2
"#;

/// The claim's active phase, if any
pub const GET_ACTIVE_CLAIM_PHASE: &str = r#"
    SELECT id, claim_id, number, status, start_date, end_date, created_at
    FROM auction_phases
    WHERE claim_id = $1 AND status = 'ACTIVE'
"#;

/// Participant rows of a phase
pub const GET_PHASE_PARTICIPANTS: &str = r#"
    SELECT id, user_id, claim_id, auction_phase_id, status, invited_by, created_at
    FROM claim_participants
    WHERE auction_phase_id = $1
    ORDER BY id ASC
"#;

/// Participant rows of a phase joined with the contractor's profile
pub const GET_PHASE_PARTICIPANT_VIEWS: &str = r#"
    SELECT p.id, p.user_id, u.name AS user_name, u.email AS user_email, p.status, p.invited_by
    FROM claim_participants p
    JOIN users u ON u.id = p.user_id
    WHERE p.auction_phase_id = $1
    ORDER BY p.id ASC
"#;

/// Active phases on claims owned by a homeowner
pub const GET_ACTIVE_AUCTIONS_FOR_OWNER: &str = r#"
    SELECT a.id, a.claim_id, a.number, a.status, a.start_date, a.end_date,
           c.title AS claim_title, c.street, c.city, c.state,
           (SELECT COUNT(*) FROM bids b WHERE b.auction_phase_id = a.id) AS bid_count
    FROM auction_phases a
    JOIN claims c ON c.id = a.claim_id
    WHERE a.status = 'ACTIVE' AND c.user_id = $1
    ORDER BY a.end_date ASC
"#;

/// Active phases listing a contractor as participant
pub const GET_ACTIVE_AUCTIONS_FOR_PARTICIPANT: &str = r#"
    SELECT a.id, a.claim_id, a.number, a.status, a.start_date, a.end_date,
           c.title AS claim_title, c.street, c.city, c.state,
           (SELECT COUNT(*) FROM bids b WHERE b.auction_phase_id = a.id) AS bid_count
    FROM auction_phases a
    JOIN claims c ON c.id = a.claim_id
    WHERE a.status = 'ACTIVE'
      AND EXISTS (
          SELECT 1 FROM claim_participants p
          WHERE p.auction_phase_id = a.id AND p.user_id = $1
      )
    ORDER BY a.end_date ASC
"#;

/// Bids of a phase flattened with the bidder's profile
pub const GET_EXPANDED_BIDS: &str = r#"
    SELECT b.id AS bid_id, b.amount, b.created_at, b.user_id AS bidder_id,
           u.name AS bidder_name, u.email AS bidder_email
    FROM bids b
    JOIN users u ON u.id = b.user_id
    WHERE b.auction_phase_id = $1
    ORDER BY b.amount ASC, b.created_at ASC
"#;

/// Lowest bid of a phase
pub const GET_LOWEST_BID: &str = "SELECT MIN(amount) FROM bids WHERE auction_phase_id = $1";

/// Lowest bid a single contractor placed in a phase
pub const GET_LOWEST_BID_BY_USER: &str =
    "SELECT MIN(amount) FROM bids WHERE auction_phase_id = $1 AND user_id = $2";

/// Invitation lookup
pub const GET_INVITATION: &str =
    "SELECT id, claim_id, contractor_id, invited_by, created_at FROM claim_invitations WHERE id = $1";

/// Pending invitations addressed to a contractor
pub const GET_INVITATIONS_FOR_CONTRACTOR: &str = r#"
    SELECT id, claim_id, contractor_id, invited_by, created_at
    FROM claim_invitations
    WHERE contractor_id = $1
    ORDER BY created_at DESC
"#;
