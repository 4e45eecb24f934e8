//! Integration tests for marginalia-protocol.
//!
//! All tests use deterministic keys (fixed secrets) and fixed
//! timestamps. The expected event id below was computed independently
//! from the NIP-01 preimage.

use marginalia_crypto::signing::{Keys, PublicKey};
use marginalia_types::{Kind, MarginaliaError, Timestamp};

use marginalia_protocol::canonical::{compute_event_id, to_canonical_json};
use marginalia_protocol::event::{Event, UnsignedEvent};
use marginalia_protocol::highlight::{build_highlight, BookMetadata};
use marginalia_protocol::metadata::{latest_metadata, parse_metadata, UserProfile};
use marginalia_protocol::nip46::{parse_signed_event, Nip46Request, Nip46Response};
use marginalia_protocol::signing::{sign_event, verify_event};
use marginalia_protocol::validation::validate_created_at;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// BIP-340 test vector 0 secret; its x-only public key is
/// `f9308a01...36f9`.
const SECRET_THREE: &str = "0000000000000000000000000000000000000000000000000000000000000003";

const EXPECTED_HIGHLIGHT_ID: &str =
    "e2bfe837928c50f8a1b6509608e3f4730d8fdfcb85ed9578a06e962c7f0dd01e";

fn test_keys() -> Keys {
    Keys::from_secret_hex(SECRET_THREE).unwrap_or_else(|_| Keys::generate())
}

fn other_keys() -> Keys {
    Keys::from_secret_bytes(&[0x99u8; 32]).unwrap_or_else(|_| Keys::generate())
}

fn fixed_timestamp() -> Timestamp {
    Timestamp::from_secs(1_700_000_000)
}

fn dune() -> BookMetadata {
    BookMetadata::new("Dune", "Frank Herbert")
}

/// Highlight used by most tests; deterministic apart from the signature.
fn build_test_highlight(keys: &Keys) -> std::result::Result<UnsignedEvent, MarginaliaError> {
    Ok(build_highlight(
        keys.public_key(),
        "Fear is the mind-killer.",
        &dune(),
        "Before. [Fear is the mind-killer.] After.",
        None,
    )?
    .with_created_at(fixed_timestamp()))
}

// ---------------------------------------------------------------------------
// 1. Canonical id
// ---------------------------------------------------------------------------

#[test]
fn highlight_id_matches_known_value() -> std::result::Result<(), MarginaliaError> {
    let unsigned = build_test_highlight(&test_keys())?;
    assert_eq!(compute_event_id(&unsigned)?.to_hex(), EXPECTED_HIGHLIGHT_ID);
    Ok(())
}

#[test]
fn canonical_preimage_is_compact() -> std::result::Result<(), MarginaliaError> {
    let json = to_canonical_json(&build_test_highlight(&test_keys())?)?;
    assert!(json.starts_with("[0,\"f9308a01"));
    assert!(!json.contains(", "));
    assert!(json.ends_with(",\"Fear is the mind-killer.\"]"));
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Signing and verification
// ---------------------------------------------------------------------------

#[test]
fn signed_highlight_verifies_and_keeps_id() -> std::result::Result<(), MarginaliaError> {
    let keys = test_keys();
    let event = sign_event(&keys, build_test_highlight(&keys)?)?;
    verify_event(&event)?;
    assert_eq!(event.id.to_hex(), EXPECTED_HIGHLIGHT_ID);
    assert_eq!(event.tag_value("title"), Some("Dune"));
    assert_eq!(event.tag_value("author"), Some("Frank Herbert"));
    Ok(())
}

#[test]
fn signing_for_another_author_fails() -> std::result::Result<(), MarginaliaError> {
    let unsigned = build_test_highlight(&test_keys())?;
    let result = sign_event(&other_keys(), unsigned);
    assert!(matches!(result, Err(MarginaliaError::SignerError { .. })));
    Ok(())
}

#[test]
fn swapped_pubkey_fails_verification() -> std::result::Result<(), MarginaliaError> {
    let keys = test_keys();
    let mut event = sign_event(&keys, build_test_highlight(&keys)?)?;
    event.pubkey = other_keys().public_key();
    assert!(verify_event(&event).is_err());
    Ok(())
}

#[test]
fn tampered_tag_fails_verification() -> std::result::Result<(), MarginaliaError> {
    let keys = test_keys();
    let mut event = sign_event(&keys, build_test_highlight(&keys)?)?;
    event.tags[1][1] = "Children of Dune".into();
    assert!(verify_event(&event).is_err());
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. JSON wire shape
// ---------------------------------------------------------------------------

#[test]
fn event_json_uses_nip01_field_names() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let keys = test_keys();
    let event = sign_event(&keys, build_test_highlight(&keys)?)?;
    let value = serde_json::to_value(&event)?;

    assert_eq!(value["id"], EXPECTED_HIGHLIGHT_ID);
    assert_eq!(value["kind"], 9802);
    assert_eq!(value["created_at"], 1_700_000_000u64);
    assert_eq!(value["pubkey"], keys.public_key().to_hex());
    assert_eq!(value["sig"].as_str().map(str::len), Some(128));

    let decoded: Event = serde_json::from_value(value)?;
    verify_event(&decoded)?;
    Ok(())
}

#[test]
fn uppercase_hex_pubkey_accepted() {
    let pk: std::result::Result<PublicKey, _> =
        "F9308A019258C31049344F85F89D5229B531C845836F99B08601F113BCE036F9".parse();
    assert_eq!(pk.ok(), Some(test_keys().public_key()));
}

// ---------------------------------------------------------------------------
// 4. Metadata
// ---------------------------------------------------------------------------

#[test]
fn profile_from_newest_metadata() -> std::result::Result<(), MarginaliaError> {
    let keys = test_keys();
    let older = sign_event(
        &keys,
        UnsignedEvent::new(keys.public_key(), Kind::METADATA, r#"{"name":"old"}"#, Vec::new())
            .with_created_at(Timestamp::from_secs(100)),
    )?;
    let newer = sign_event(
        &keys,
        UnsignedEvent::new(
            keys.public_key(),
            Kind::METADATA,
            r#"{"name":"reader","image":"https://img/x.png"}"#,
            Vec::new(),
        )
        .with_created_at(Timestamp::from_secs(200)),
    )?;

    let events = [newer, older];
    let latest = latest_metadata(&events, &keys.public_key());
    let profile = match latest {
        Some(ev) => parse_metadata(ev)?,
        None => UserProfile::bare(keys.public_key()),
    };
    assert_eq!(profile.name.as_deref(), Some("reader"));
    assert_eq!(profile.picture.as_deref(), Some("https://img/x.png"));
    Ok(())
}

// ---------------------------------------------------------------------------
// 5. NIP-46 exchange
// ---------------------------------------------------------------------------

#[test]
fn remote_signer_roundtrip_verifies() -> std::result::Result<(), MarginaliaError> {
    let keys = test_keys();
    let unsigned = build_test_highlight(&keys)?;
    let request = Nip46Request::sign_event(&unsigned)?;

    // Simulated signer: sign the same template with the user's key.
    let signed = sign_event(&keys, unsigned)?;
    let result_json = serde_json::to_string(&signed).map_err(|e| MarginaliaError::ProtocolError {
        reason: e.to_string(),
    })?;
    let response = Nip46Response::ok(request.id.clone(), result_json);

    let event = parse_signed_event(&response.into_result(&request.id)?)?;
    verify_event(&event)?;
    assert_eq!(event.id.to_hex(), EXPECTED_HIGHLIGHT_ID);
    Ok(())
}

#[test]
fn malformed_signed_event_rejected() {
    assert!(matches!(
        parse_signed_event("{\"id\":\"zz\"}"),
        Err(MarginaliaError::ProtocolError { .. })
    ));
}

// ---------------------------------------------------------------------------
// 6. Clock skew
// ---------------------------------------------------------------------------

#[test]
fn future_dated_event_flagged() {
    let now = fixed_timestamp();
    let future = Timestamp::from_secs(now.as_secs() + 3_600);
    assert!(validate_created_at(future, now, 900).is_err());
    assert!(validate_created_at(now, now, 0).is_ok());
}
