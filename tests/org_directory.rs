//! Organization context tests with the request client as directory

use std::sync::{Arc, Mutex};

use posture_client::org::{LogStatusSink, OrgDirectory, OrgPhase};
use posture_client::platform::{MemoryStore, NoCsrf, PersistentStore, RecordingNavigator};
use posture_client::{
    AppContext, ClientConfig, MemorySession, OrgRole, OrgType, Platform, RequestClient,
    SelectOptions, SessionInfo, SessionUser,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const MEMBERSHIPS: &str = r#"{
    "Success": true,
    "Data": {
        "User": {"Email": "user@example.com", "UserType": "Owner"},
        "DefaultOrgId": "org-b",
        "Organizations": [
            {"OrgId": "org-a", "Name": "Alpha", "Type": "Business", "Role": "ReadWrite",
             "TotalSeats": 5, "RemainingCredits": 300},
            {"OrgId": "org-b", "Name": "Beta", "Type": "Business", "Role": "Owner",
             "TotalSeats": 10, "RemainingCredits": 40},
            {"OrgId": "org-a", "Name": "Alpha (dup)", "Role": "Owner"}
        ]
    }
}"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn signed_in() -> Arc<MemorySession> {
    let session = Arc::new(MemorySession::new());
    session.sign_in(
        "tok-123",
        SessionUser::new("user@example.com"),
        SessionInfo {
            org_id: Some("org-a".to_string()),
        },
    );
    session
}

fn app(base_url: &str, session: Arc<MemorySession>, store: Arc<MemoryStore>) -> AppContext {
    let platform = Platform {
        session,
        store,
        navigator: Arc::new(RecordingNavigator::new()),
        csrf: Arc::new(NoCsrf),
        status_sink: Arc::new(LogStatusSink),
    };
    AppContext::new(ClientConfig::new(base_url), platform).expect("valid config")
}

#[tokio::test]
async fn request_client_lists_memberships() -> TestResult {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/orgs/memberships")
        .match_header("authorization", "Bearer tok-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(MEMBERSHIPS)
        .expect(2)
        .create_async()
        .await;

    let client = RequestClient::new(ClientConfig::new(server.url()), signed_in())?;
    let listing = client.list_memberships().await?;
    // Membership listings bypass the cache
    client.list_memberships().await?;

    mock.assert_async().await;
    assert_eq!(listing.orgs.len(), 2);
    assert_eq!(listing.orgs[0].org_id, "org-a");
    assert_eq!(listing.orgs[0].role, OrgRole::ReadWrite);
    assert_eq!(listing.orgs[1].total_seats, 10);
    assert_eq!(listing.default_org_id.as_deref(), Some("org-b"));
    assert_eq!(
        listing.user.and_then(|u| u.email).as_deref(),
        Some("user@example.com")
    );
    assert_eq!(client.cache_len(), 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_initialization_fetches_once() -> TestResult {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/orgs/memberships")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(MEMBERSHIPS)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let ctx = app(&server.url(), signed_in(), store.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let _sub = {
        let seen = Arc::clone(&seen);
        ctx.orgs.on_change(move |org| {
            seen.lock().unwrap().push(org.map(|o| o.org_id.clone()));
        })
    };

    tokio::join!(ctx.orgs.initialize(), ctx.orgs.initialize());

    mock.assert_async().await;
    assert_eq!(ctx.orgs.phase(), OrgPhase::Ready);
    assert_eq!(*seen.lock().unwrap(), vec![Some("org-b".to_string())]);
    assert_eq!(store.get("selectedOrgId").as_deref(), Some("org-b"));
    assert!(ctx.orgs.has_multiple_orgs());
    assert_eq!(ctx.orgs.current_role(), OrgRole::Owner);
    assert!(!ctx.orgs.default_org_missing());
    Ok(())
}

#[tokio::test]
async fn server_failure_falls_back_to_session_org() -> TestResult {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v1/orgs/memberships")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "boom"}"#)
        .create_async()
        .await;

    let session = signed_in();
    let ctx = app(&server.url(), session.clone(), Arc::new(MemoryStore::new()));
    ctx.orgs.initialize().await;

    let current = ctx.orgs.current_org().expect("fallback org");
    assert_eq!(current.org_id, "org-a");
    assert_eq!(current.org_type, OrgType::Business);
    assert_eq!(current.role, OrgRole::Owner);
    assert_eq!(ctx.orgs.available_orgs().len(), 1);
    // Ordinary failures keep the user signed in
    assert!(session.is_signed_in());
    Ok(())
}

#[tokio::test]
async fn expired_session_during_initialization_clears_orgs() -> TestResult {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v1/orgs/memberships")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "error": "SESSION_EXPIRED"}"#)
        .create_async()
        .await;

    let session = signed_in();
    let ctx = app(&server.url(), session.clone(), Arc::new(MemoryStore::new()));
    ctx.start().await;

    assert!(!session.is_signed_in());
    assert_eq!(ctx.orgs.phase(), OrgPhase::Cleared);
    assert!(ctx.orgs.current_org().is_none());
    Ok(())
}

#[tokio::test]
async fn selection_survives_a_new_context() -> TestResult {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v1/orgs/memberships")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(MEMBERSHIPS)
        .expect(2)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let first = app(&server.url(), signed_in(), store.clone());
    first.orgs.initialize().await;
    assert!(first.orgs.select_org("org-a", SelectOptions::default()));

    let second = app(&server.url(), signed_in(), store);
    second.orgs.initialize().await;
    let current = second.orgs.current_org().expect("selected org");
    assert_eq!(current.org_id, "org-a");
    assert_eq!(current.name, "Alpha");
    Ok(())
}
