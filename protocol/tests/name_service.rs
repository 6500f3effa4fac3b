//! End-to-end tests for the CruxID name service.
//!
//! Every test drives `CruxNameService` through its public API against a
//! scripted transport (canned answers keyed by method and URL, every call
//! recorded) and the in-memory storage hub. Nothing touches the network.
//!
//! Fixtures follow a `devcoinswitch` deployment with the two default naming
//! nodes and the default registrar.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use serde_json::{json, Value};
use tokio::sync::Semaphore;

use cruxpay_protocol::config::EngineConfig;
use cruxpay_protocol::crypto::derive_identity_keypair;
use cruxpay_protocol::identity::{CruxId, IdentityClaim, IdentityCouple};
use cruxpay_protocol::naming::RegistrationState;
use cruxpay_protocol::network::{
    HubError, HubSession, JsonResponse, MemoryHub, StorageHub, UploadableFile,
};
use cruxpay_protocol::payment::ClientAssetMap;
use cruxpay_protocol::testing::{Method, RecordedCall, ScriptedTransport};
use cruxpay_protocol::{CruxError, CruxNameService, ErrorCategory};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const NODE_A: &str = "https://core.blockstack.org";
const NODE_B: &str = "https://bns.cruxpay.com";
const REGISTRAR: &str = "https://registrar.coinswitch.co:3000";
const HUB: &str = "https://hub.cruxpay.com";

const JELLY: &str = "jelly level auction pluck system record unique huge text fold galaxy home";
const JELLY_ADDRESS: &str = "1HtFkbXFWHFW5Kd4GLfiRqkffS5KLZ91eJ";
const MINUTE: &str = "minute furnace room favorite hunt auto scrap angry tribe wait foam drive";
const MINUTE_ADDRESS: &str = "1FnntbZKRLB7rZFvng9PDgvMMEXMek1jrv";

const BTC_ID: &str = "1d6e1a99-1e77-41e1-9ebb-0e216faa166a";
const XRP_ID: &str = "abe0030a-d8e3-4518-879f-cd9939b7d8ab";

/// The claim format wallets store, private key in the 66-hex form.
fn stored_minute_claim() -> IdentityClaim {
    serde_json::from_value(json!({
        "secrets": {
            "identityKeyPair": {
                "address": MINUTE_ADDRESS,
                "privKey": "d4f1d65bbe0a89a91506828f4e62639b99558aeffda06b6f66961dccec5e301b01",
                "pubKey": "03d2b5b73bd06b624ccd24d05d0ffc259e7b9180d85b29f61e16404866fe344e60"
            },
            "mnemonic": MINUTE
        }
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Scripted naming nodes and registrar
// ---------------------------------------------------------------------------

/// Both default nodes answer the same for `name`.
fn name_on_both_nodes(transport: &ScriptedTransport, name: &str, response: JsonResponse) {
    transport.on_get(format!("{NODE_A}/v1/names/{name}"), response.clone());
    transport.on_get(format!("{NODE_B}/v1/names/{name}"), response);
}

fn registrar_status(transport: &ScriptedTransport, subdomain: &str, status: &str) {
    transport.on_get(
        format!("{REGISTRAR}/status/{subdomain}"),
        JsonResponse::ok(json!({ "status": status })),
    );
}

fn posts(transport: &ScriptedTransport) -> Vec<RecordedCall> {
    transport
        .calls()
        .into_iter()
        .filter(|c| c.method == Method::Post)
        .collect()
}

fn registered(address: &str) -> JsonResponse {
    JsonResponse::ok(json!({
        "status": "registered_subdomain",
        "address": address,
        "blockchain": "bitcoin",
        "zonefile": "$ORIGIN cs1\n$TTL 3600\n_https._tcp URI 10 1 https://hub.cruxpay.com"
    }))
}

fn not_found() -> JsonResponse {
    JsonResponse::new(404, Some(json!({"error": "Name not found"})))
}

fn setup() -> (Arc<ScriptedTransport>, Arc<MemoryHub>, CruxNameService) {
    let transport = Arc::new(ScriptedTransport::new());
    let hub = Arc::new(MemoryHub::new(HUB));
    let config = EngineConfig {
        domain: "devcoinswitch".into(),
        ..EngineConfig::default()
    };
    let service = CruxNameService::new(config, transport.clone(), hub.clone());
    (transport, hub, service)
}

/// Memory hub whose uploads wait for a permit, counting how many are inside
/// `upload` at once.
struct GatedHub {
    inner: MemoryHub,
    gate: Semaphore,
    entered: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl GatedHub {
    fn new() -> Self {
        Self {
            inner: MemoryHub::new(HUB),
            gate: Semaphore::new(0),
            entered: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn release_one(&self) {
        self.gate.add_permits(1);
    }

    fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageHub for GatedHub {
    async fn connect(&self, private_key_hex: &str) -> Result<HubSession, HubError> {
        self.inner.connect(private_key_hex).await
    }

    async fn upload(
        &self,
        session: &HubSession,
        file: UploadableFile,
        content: &Value,
    ) -> Result<String, HubError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.gate.acquire().await.unwrap().forget();
        let result = self.inner.upload(session, file, content).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn fetch(
        &self,
        owner_address: &str,
        file: UploadableFile,
    ) -> Result<Option<Value>, HubError> {
        self.inner.fetch(owner_address, file).await
    }

    fn write_url(&self) -> &str {
        self.inner.write_url()
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_bob_end_to_end() {
    let (transport, hub, service) = setup();
    transport.on_post(format!("{REGISTRAR}/register"), JsonResponse::ok(json!({"status": true})));

    let session = service
        .register_name(&IdentityClaim::from_mnemonic(JELLY), "bob")
        .await
        .unwrap();

    assert_eq!(session.couple.crux_id.to_string(), "bob@devcoinswitch.crux");
    assert_eq!(session.couple.bs_id.to_string(), "bob.devcoinswitch.id");
    assert_eq!(session.claim.address(), Some(JELLY_ADDRESS));

    let submitted = posts(&transport);
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted[0].body,
        Some(json!({
            "name": "bob",
            "owner_address": JELLY_ADDRESS,
            "zonefile": "$ORIGIN bob\n$TTL 3600\n_https._tcp URI 10 1 https://hub.cruxpay.com"
        }))
    );

    let profile = hub.get(JELLY_ADDRESS, UploadableFile::Profile).unwrap();
    assert_eq!(
        profile["issuer"]["publicKey"],
        "02bc9c3f8e924b7de9212cebd0129f1be2e6c3f2904e911b30698bde77be4878b8"
    );
}

#[tokio::test]
async fn register_requires_mnemonic() {
    let (transport, hub, service) = setup();
    let claim = IdentityClaim {
        secrets: cruxpay_protocol::identity::IdentitySecrets {
            mnemonic: None,
            identity_key_pair: Some(derive_identity_keypair(JELLY).unwrap()),
        },
    };
    let err = service.register_name(&claim, "bob").await.unwrap_err();
    assert!(matches!(err, CruxError::MissingMnemonic));
    assert_eq!(transport.call_count(), 0);
    assert!(hub.is_empty());
}

#[tokio::test]
async fn profile_upload_failure_stops_registration() {
    let (transport, hub, service) = setup();
    hub.fail_uploads_of(UploadableFile::Profile);

    let err = service
        .register_name(&IdentityClaim::from_mnemonic(JELLY), "bob")
        .await
        .unwrap_err();

    assert!(matches!(err, CruxError::ProfileUploadFailed(_)));
    assert_eq!(transport.posts_to(&format!("{REGISTRAR}/register")).len(), 0);
}

#[tokio::test]
async fn registrar_negative_acknowledgement() {
    let (transport, _, service) = setup();
    transport.on_post(
        format!("{REGISTRAR}/register"),
        JsonResponse::ok(json!({"status": false, "message": "subdomain taken"})),
    );

    let err = service
        .register_name(&IdentityClaim::from_mnemonic(JELLY), "bob")
        .await
        .unwrap_err();

    match &err {
        CruxError::RegistrationAcknowledgementFailed { response } => {
            assert!(response.contains("subdomain taken"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Rejected);
}

#[tokio::test]
async fn registrar_unreachable() {
    let (transport, _, service) = setup();
    transport.fail_post(format!("{REGISTRAR}/register"), "connection refused");

    let err = service
        .register_name(&IdentityClaim::from_mnemonic(JELLY), "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::RegistrarUnreachable(_)));
    assert_eq!(err.category(), ErrorCategory::Infrastructure);
}

#[tokio::test]
async fn retrying_registration_submits_identical_zonefile() {
    let (transport, _, service) = setup();
    transport.fail_post(format!("{REGISTRAR}/register"), "connection refused");
    let claim = IdentityClaim::from_mnemonic(JELLY);
    assert!(service.register_name(&claim, "bob").await.is_err());

    transport.on_post(format!("{REGISTRAR}/register"), JsonResponse::ok(json!({"status": true})));
    service.register_name(&claim, "bob").await.unwrap();

    let bodies: Vec<Value> = posts(&transport).into_iter().filter_map(|c| c.body).collect();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn concurrent_registrations_both_complete() {
    let (transport, _, service) = setup();
    transport.on_post(format!("{REGISTRAR}/register"), JsonResponse::ok(json!({"status": true})));
    let service = Arc::new(service);

    let a = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .register_name(&IdentityClaim::from_mnemonic(JELLY), "alice")
                .await
        })
    };
    let b = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .register_name(&IdentityClaim::from_mnemonic(MINUTE), "carol")
                .await
        })
    };

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    assert_eq!(transport.posts_to(&format!("{REGISTRAR}/register")).len(), 2);
}

#[tokio::test]
async fn registrations_run_one_at_a_time() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_post(format!("{REGISTRAR}/register"), JsonResponse::ok(json!({"status": true})));
    let hub = Arc::new(GatedHub::new());
    let config = EngineConfig {
        domain: "devcoinswitch".into(),
        ..EngineConfig::default()
    };
    let service = Arc::new(CruxNameService::new(config, transport.clone(), hub.clone()));

    let spawn_registration = |phrase: &'static str, subdomain: &'static str| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .register_name(&IdentityClaim::from_mnemonic(phrase), subdomain)
                .await
        })
    };
    let a = spawn_registration(JELLY, "alice");
    let b = spawn_registration(MINUTE, "carol");

    while hub.entered() == 0 {
        tokio::task::yield_now().await;
    }
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
    // The second registration waits outside the hub until the first is done.
    assert_eq!(hub.entered(), 1);
    assert_eq!(transport.posts_to(&format!("{REGISTRAR}/register")).len(), 0);

    hub.release_one();
    while hub.entered() < 2 {
        tokio::task::yield_now().await;
    }
    assert_eq!(transport.posts_to(&format!("{REGISTRAR}/register")).len(), 1);

    hub.release_one();
    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    assert_eq!(hub.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(transport.posts_to(&format!("{REGISTRAR}/register")).len(), 2);
}

#[tokio::test]
async fn registrar_http_error_on_submission_is_infrastructure() {
    let (transport, _, service) = setup();
    transport.on_post(
        format!("{REGISTRAR}/register"),
        JsonResponse::new(502, Some(json!({"error": "bad gateway"}))),
    );

    let err = service
        .register_name(&IdentityClaim::from_mnemonic(JELLY), "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::RegistrarUnreachable(_)));
    assert_eq!(err.category(), ErrorCategory::Infrastructure);
}

#[tokio::test]
async fn registrar_http_error_is_not_unavailability() {
    let (transport, _, service) = setup();
    transport.on_get(
        format!("{REGISTRAR}/status/bob"),
        JsonResponse::new(503, Some(json!({"error": "maintenance"}))),
    );

    let err = service.get_name_availability("bob").await.unwrap_err();
    match &err {
        CruxError::RegistrarUnreachable(reason) => assert!(reason.contains("maintenance")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Infrastructure);
}

#[tokio::test]
async fn availability_follows_registrar_sentinel() {
    let (transport, _, service) = setup();
    registrar_status(&transport, "free", "Subdomain not registered with this registrar");
    registrar_status(&transport, "cs1", "Subdomain propagated");

    assert!(service.get_name_availability("free").await.unwrap());
    assert!(!service.get_name_availability("cs1").await.unwrap());
}

// ---------------------------------------------------------------------------
// Restore and status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restore_then_status_done() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(JELLY_ADDRESS));

    let claim = IdentityClaim::from_mnemonic(JELLY);
    let session = service.restore_identity("cs1@devcoinswitch.crux", &claim).await.unwrap();
    let status = service
        .get_registration_status(Some(&session.couple), &session.claim)
        .await
        .unwrap();

    assert_eq!(status.status, RegistrationState::Done);
    assert_eq!(status.status_detail, "Subdomain propagated.");
    // Two nodes for restore, two for status, registrar never asked.
    assert_eq!(transport.call_count(), 4);
    assert_eq!(transport.gets_of(&format!("{REGISTRAR}/status/cs1")), 0);
}

#[tokio::test]
async fn restore_is_idempotent() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(JELLY_ADDRESS));

    let claim = IdentityClaim::from_mnemonic(JELLY);
    let first = service.restore_identity("cs1@devcoinswitch.crux", &claim).await.unwrap();
    let second = service.restore_identity("cs1@devcoinswitch.crux", &claim).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first.claim).unwrap(),
        serde_json::to_string(&second.claim).unwrap()
    );
}

#[tokio::test]
async fn restore_detects_identity_mismatch() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(MINUTE_ADDRESS));

    let err = service
        .restore_identity("cs1@devcoinswitch.crux", &IdentityClaim::from_mnemonic(JELLY))
        .await
        .unwrap_err();
    match err {
        CruxError::IdentityMismatch { claimed, on_chain } => {
            assert_eq!(claimed, JELLY_ADDRESS);
            assert_eq!(on_chain, MINUTE_ADDRESS);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn restore_detects_mismatch_while_a_node_lags() {
    let (transport, _, service) = setup();
    transport.on_get(format!("{NODE_A}/v1/names/cs1.devcoinswitch.id"), registered(MINUTE_ADDRESS));
    transport.on_get(format!("{NODE_B}/v1/names/cs1.devcoinswitch.id"), not_found());

    let err = service
        .restore_identity("cs1@devcoinswitch.crux", &IdentityClaim::from_mnemonic(JELLY))
        .await
        .unwrap_err();
    match err {
        CruxError::IdentityMismatch { claimed, on_chain } => {
            assert_eq!(claimed, JELLY_ADDRESS);
            assert_eq!(on_chain, MINUTE_ADDRESS);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The rightful owner restores through the same split.
    let session = service
        .restore_identity("cs1@devcoinswitch.crux", &IdentityClaim::from_mnemonic(MINUTE))
        .await
        .unwrap();
    assert_eq!(session.claim.address(), Some(MINUTE_ADDRESS));
}

#[tokio::test]
async fn restore_with_conflicting_owners_fails_integrity_check() {
    let (transport, _, service) = setup();
    transport.on_get(format!("{NODE_A}/v1/names/cs1.devcoinswitch.id"), registered(JELLY_ADDRESS));
    transport.on_get(format!("{NODE_B}/v1/names/cs1.devcoinswitch.id"), registered(MINUTE_ADDRESS));

    let err = service
        .restore_identity("cs1@devcoinswitch.crux", &IdentityClaim::from_mnemonic(JELLY))
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::NameIntegrityCheckFailed(_)));
    assert_eq!(err.category(), ErrorCategory::Identity);
}

#[tokio::test]
async fn restore_normalizes_stored_private_key() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "carol.devcoinswitch.id", not_found());

    let session = service
        .restore_identity("carol@devcoinswitch.crux", &stored_minute_claim())
        .await
        .unwrap();
    assert_eq!(
        session.claim.key_pair().unwrap().private_key_hex(),
        "d4f1d65bbe0a89a91506828f4e62639b99558aeffda06b6f66961dccec5e301b"
    );
}

#[tokio::test]
async fn restore_rejects_malformed_identifier() {
    let (transport, _, service) = setup();
    let err = service
        .restore_identity("carol.devcoinswitch.crux", &IdentityClaim::from_mnemonic(MINUTE))
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::InvalidIdentifier(_)));
    assert_eq!(transport.call_count(), 0);
}

async fn status_for(subdomain: &str, registrar_says: &str) -> (Arc<ScriptedTransport>, RegistrationState, String) {
    let (transport, _, service) = setup();
    let name = format!("{subdomain}.devcoinswitch.id");
    name_on_both_nodes(&transport, &name, not_found());
    registrar_status(&transport, subdomain, registrar_says);

    let claim = stored_minute_claim();
    let session = service
        .restore_identity(&format!("{subdomain}@devcoinswitch.crux"), &claim)
        .await
        .unwrap();
    let status = service
        .get_registration_status(Some(&session.couple), &claim)
        .await
        .unwrap();
    (transport, status.status, status.status_detail)
}

#[tokio::test]
async fn status_pending_on_blockchain() {
    let (transport, state, detail) = status_for(
        "carol",
        "Subdomain is queued for update and should be announced within the next few blocks.",
    )
    .await;
    assert_eq!(state, RegistrationState::Pending);
    assert_eq!(detail, "Subdomain registration pending on blockchain.");
    assert_eq!(transport.call_count(), 5);
    assert_eq!(transport.gets_of(&format!("{REGISTRAR}/status/carol")), 1);
}

#[tokio::test]
async fn status_pending_on_registrar() {
    let (_, state, detail) = status_for(
        "carol3",
        "Your subdomain was registered in transaction 4f1a... -- it should propagate on the network once it has 6 confirmations.",
    )
    .await;
    assert_eq!(state, RegistrationState::Pending);
    assert_eq!(detail, "Subdomain registration pending on registrar.");
}

#[tokio::test]
async fn status_not_registered() {
    let (_, state, detail) =
        status_for("carol2", "Subdomain not registered with this registrar").await;
    assert_eq!(state, RegistrationState::None);
    assert_eq!(detail, "Subdomain not registered with this registrar.");
}

#[tokio::test]
async fn status_unrecognized_registrar_text() {
    let (_, state, detail) = status_for("carol1", "Subdomain propagated").await;
    assert_eq!(state, RegistrationState::None);
    assert_eq!(detail, "");
}

#[tokio::test]
async fn status_surfaces_registrar_http_error() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "carol.devcoinswitch.id", not_found());
    transport.on_get(
        format!("{REGISTRAR}/status/carol"),
        JsonResponse::new(503, Some(json!({"error": "maintenance"}))),
    );

    let couple = IdentityCouple::from(CruxId::parse("carol@devcoinswitch.crux").unwrap());
    let err = service
        .get_registration_status(Some(&couple), &stored_minute_claim())
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::RegistrarUnreachable(_)));
}

#[tokio::test]
async fn status_reject_on_owner_mismatch() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "carol4.devcoinswitch.id", registered(MINUTE_ADDRESS));

    let session = service
        .restore_identity("carol4@devcoinswitch.crux", &stored_minute_claim())
        .await
        .unwrap();

    let mut other = stored_minute_claim();
    let kp = other.secrets.identity_key_pair.take().unwrap();
    other.secrets.identity_key_pair = Some(cruxpay_protocol::crypto::IdentityKeyPair::new(
        format!("{}_something", kp.address),
        kp.public_key.clone(),
        kp.private_key_hex(),
    ));

    let status = service
        .get_registration_status(Some(&session.couple), &other)
        .await
        .unwrap();
    assert_eq!(status.status, RegistrationState::Reject);
    assert_eq!(status.status_detail, "");
    assert_eq!(transport.call_count(), 4);
}

#[tokio::test]
async fn status_without_session_is_none_and_silent() {
    let (transport, _, service) = setup();
    let status = service
        .get_registration_status(None, &stored_minute_claim())
        .await
        .unwrap();
    assert_eq!(status.status, RegistrationState::None);
    assert_eq!(status.status_detail, "");
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn one_node_down_is_tolerated() {
    let (transport, _, service) = setup();
    transport.on_get(format!("{NODE_A}/v1/names/cs1.devcoinswitch.id"), registered(JELLY_ADDRESS));
    transport.fail_get(format!("{NODE_B}/v1/names/cs1.devcoinswitch.id"), "connection refused");

    let session = service
        .restore_identity("cs1@devcoinswitch.crux", &IdentityClaim::from_mnemonic(JELLY))
        .await
        .unwrap();
    let status = service
        .get_registration_status(Some(&session.couple), &session.claim)
        .await
        .unwrap();
    assert_eq!(status.status, RegistrationState::Done);
}

#[tokio::test]
async fn all_nodes_down_is_infrastructure_failure() {
    let (_, _, service) = setup();
    let err = service
        .restore_identity("cs1@devcoinswitch.crux", &IdentityClaim::from_mnemonic(JELLY))
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::NamingSystemUnreachable(_)));
    assert_eq!(err.category(), ErrorCategory::Infrastructure);
}

// ---------------------------------------------------------------------------
// Address mappings
// ---------------------------------------------------------------------------

fn published_mapping() -> Value {
    json!({
        BTC_ID: {"addressHash": "1HX4bzHHDZ8HCuD5V6hHnSEeBVqZ8FhJV1"},
        XRP_ID: {"addressHash": "rpfKAA2Ezqoq5wWo3XENdLYdZ8YGziz48h", "secIdentifier": "12345"}
    })
}

#[tokio::test]
async fn publish_then_resolve() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(JELLY_ADDRESS));

    service
        .put_address_mapping(&IdentityClaim::from_mnemonic(JELLY), &published_mapping())
        .await
        .unwrap();

    let client: ClientAssetMap = [("BTC", BTC_ID), ("XRP", XRP_ID)].into_iter().collect();
    let xrp = service
        .resolve_address("cs1@devcoinswitch.crux", "xrp", &client)
        .await
        .unwrap();
    assert_eq!(xrp.address_hash, "rpfKAA2Ezqoq5wWo3XENdLYdZ8YGziz48h");
    assert_eq!(xrp.tag.as_deref(), Some("12345"));

    let mapping = service.get_address_mapping("cs1@devcoinswitch.crux").await.unwrap();
    assert_eq!(mapping.len(), 2);
}

#[tokio::test]
async fn unlisted_currency_fails_independent_of_published_data() {
    let (transport, hub, service) = setup();
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(JELLY_ADDRESS));
    hub.insert(
        JELLY_ADDRESS,
        UploadableFile::CruxPay,
        json!({"eth-id": {"addressHash": "0xabc"}}),
    );

    let client: ClientAssetMap = [("BTC", BTC_ID)].into_iter().collect();
    let err = service
        .resolve_address("cs1@devcoinswitch.crux", "ETH", &client)
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::AssetNotListedByClient(_)));
}

#[tokio::test]
async fn listed_currency_not_published_by_owner() {
    let (transport, hub, service) = setup();
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(JELLY_ADDRESS));
    hub.insert(JELLY_ADDRESS, UploadableFile::CruxPay, published_mapping());

    let client: ClientAssetMap = [("ETH", "508b8f73-4b06-453e-8151-78cb8cfc3bc9")].into_iter().collect();
    let err = service
        .resolve_address("cs1@devcoinswitch.crux", "ETH", &client)
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::AssetNotSupportedByUser(_)));
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn unknown_user_versus_unpublished_user() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "nobody.devcoinswitch.id", not_found());
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(JELLY_ADDRESS));

    let missing = service.get_address_mapping("nobody@devcoinswitch.crux").await.unwrap_err();
    assert!(matches!(missing, CruxError::UserDoesNotExist(_)));

    let unpublished = service.get_address_mapping("cs1@devcoinswitch.crux").await.unwrap_err();
    match unpublished {
        CruxError::StorageEmptyResponse { owner, file } => {
            assert_eq!(owner, JELLY_ADDRESS);
            assert_eq!(file, UploadableFile::CruxPay);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn conflicting_owners_fail_integrity_check() {
    let (transport, _, service) = setup();
    transport.on_get(format!("{NODE_A}/v1/names/cs1.devcoinswitch.id"), registered(JELLY_ADDRESS));
    transport.on_get(format!("{NODE_B}/v1/names/cs1.devcoinswitch.id"), registered(MINUTE_ADDRESS));

    let err = service.get_address_mapping("cs1@devcoinswitch.crux").await.unwrap_err();
    assert!(matches!(err, CruxError::NameIntegrityCheckFailed(_)));
}

#[tokio::test]
async fn malformed_mapping_is_never_uploaded() {
    let (_, hub, service) = setup();
    let err = service
        .put_address_mapping(
            &IdentityClaim::from_mnemonic(JELLY),
            &json!({
                BTC_ID: {"addressHash": "1HX4bzHHDZ8HCuD5V6hHnSEeBVqZ8FhJV1"},
                XRP_ID: {"secIdentifier": "12345"}
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CruxError::AddressMappingDecodingFailure { .. }));
    assert!(hub.get(JELLY_ADDRESS, UploadableFile::CruxPay).is_none());
}

#[tokio::test]
async fn mapping_upload_failure_carries_file_reason() {
    let (_, hub, service) = setup();
    hub.fail_uploads_of(UploadableFile::CruxPay);
    let err = service
        .put_address_mapping(&IdentityClaim::from_mnemonic(JELLY), &published_mapping())
        .await
        .unwrap_err();
    match err {
        CruxError::StorageUploadFailed { file, kind, .. } => {
            assert_eq!(file, UploadableFile::CruxPay);
            assert_eq!(kind, cruxpay_protocol::error::UploadFailure::CruxPay);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Public profile
// ---------------------------------------------------------------------------

#[tokio::test]
async fn crux_user_after_registration_and_publish() {
    let (transport, _, service) = setup();
    transport.on_post(format!("{REGISTRAR}/register"), JsonResponse::ok(json!({"status": true})));
    name_on_both_nodes(&transport, "bob.devcoinswitch.id", registered(JELLY_ADDRESS));

    let claim = IdentityClaim::from_mnemonic(JELLY);
    service.register_name(&claim, "bob").await.unwrap();
    service.put_address_mapping(&claim, &published_mapping()).await.unwrap();

    let user = service.get_crux_user("bob@devcoinswitch.crux").await.unwrap();
    assert_eq!(user.crux_id, CruxId::parse("bob@devcoinswitch.crux").unwrap());
    assert_eq!(
        user.public_key.as_deref(),
        Some("02bc9c3f8e924b7de9212cebd0129f1be2e6c3f2904e911b30698bde77be4878b8")
    );
    assert_eq!(user.addresses.len(), 2);
    assert_eq!(
        user.address_for(XRP_ID).unwrap().tag.as_deref(),
        Some("12345")
    );
}

#[tokio::test]
async fn crux_user_without_profile() {
    let (transport, hub, service) = setup();
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(JELLY_ADDRESS));
    hub.insert(JELLY_ADDRESS, UploadableFile::CruxPay, published_mapping());

    let err = service.get_crux_user("cs1@devcoinswitch.crux").await.unwrap_err();
    assert!(matches!(
        err,
        CruxError::StorageEmptyResponse { file: UploadableFile::Profile, .. }
    ));
}

#[tokio::test]
async fn session_couple_is_caller_owned() {
    let (transport, _, service) = setup();
    name_on_both_nodes(&transport, "cs1.devcoinswitch.id", registered(JELLY_ADDRESS));
    name_on_both_nodes(&transport, "carol.devcoinswitch.id", not_found());
    registrar_status(&transport, "carol", "Subdomain not registered with this registrar");

    let jelly = service
        .restore_identity("cs1@devcoinswitch.crux", &IdentityClaim::from_mnemonic(JELLY))
        .await
        .unwrap();
    let minute = service
        .restore_identity("carol@devcoinswitch.crux", &stored_minute_claim())
        .await
        .unwrap();

    // Each session keeps its own identity regardless of restore order.
    let a = service
        .get_registration_status(Some(&jelly.couple), &jelly.claim)
        .await
        .unwrap();
    let b = service
        .get_registration_status(Some(&minute.couple), &minute.claim)
        .await
        .unwrap();
    assert_eq!(a.status, RegistrationState::Done);
    assert_eq!(b.status, RegistrationState::None);
    assert_eq!(
        jelly.couple,
        IdentityCouple::from(CruxId::parse("cs1@devcoinswitch.crux").unwrap())
    );
}
