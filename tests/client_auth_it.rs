// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use usergate::{
	api::SignInCredentials,
	client::{ApiRequest, Client, RuntimeContext},
	error::Error,
	guard::{self, GuardOutcome},
	session::{SESSION_TTL, SIGN_IN_ROUTE, Session},
	store::{MemoryStore, SessionStore},
};

const IDENTITY_BODY: &str = r#"{
	"username": "ops",
	"email": "ops@example.com",
	"roles": ["administrator"],
	"permissions": ["users.list", "users.create"]
}"#;

fn base_url(server: &MockServer) -> Url {
	Url::parse(&server.base_url()).expect("Mock server URL should parse.")
}

async fn empty_client(server: &MockServer, context: RuntimeContext) -> (Client, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::new());
	let client = Client::build(base_url(server), store.clone(), context)
		.await
		.expect("Client build should succeed.");

	(client, store)
}

async fn seeded_client(
	server: &MockServer,
	context: RuntimeContext,
) -> (Client, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::new());

	store
		.save(Session::new("bearer", "access-1", "refresh-1"), SESSION_TTL)
		.await
		.expect("Seeding the session should succeed.");

	let client = Client::build(base_url(server), store.clone(), context)
		.await
		.expect("Client build should succeed.");

	(client, store)
}

#[tokio::test]
async fn stored_credentials_are_attached_to_every_request() {
	let server = MockServer::start_async().await;
	let (client, _store) = seeded_client(&server, RuntimeContext::Interactive).await;
	let authenticated = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/me").header("authorization", "bearer access-1");
			then.status(200).header("content-type", "application/json").body(IDENTITY_BODY);
		})
		.await;
	let identity = client.who_am_i().await.expect("Who-am-I should succeed.");

	authenticated.assert_async().await;

	assert_eq!(identity.username.as_deref(), Some("ops"));
	assert_eq!(identity.email.as_deref(), Some("ops@example.com"));
	assert_eq!(identity.roles, ["administrator"]);
	assert_eq!(identity.permissions, ["users.list", "users.create"]);
}

#[tokio::test]
async fn a_client_without_stored_credentials_sends_no_credential_header() {
	let server = MockServer::start_async().await;
	let (client, _store) = empty_client(&server, RuntimeContext::Interactive).await;
	let anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/me").header_missing("authorization");
			then.status(200).header("content-type", "application/json").body(IDENTITY_BODY);
		})
		.await;

	assert!(client.credential().is_none());

	client.who_am_i().await.expect("The anonymous request should reach the backend.");

	anonymous.assert_async().await;
}

#[tokio::test]
async fn a_non_expiry_denial_terminates_the_interactive_session() {
	let server = MockServer::start_async().await;
	let (client, store) = seeded_client(&server, RuntimeContext::Interactive).await;
	let _denied = server
		.mock_async(|when, then| {
			when.method(GET).path("/users");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"code":"token.invalid"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refreshtoken");
			then.status(200).body("{}");
		})
		.await;
	let error = client
		.execute(&ApiRequest::get("users"))
		.await
		.expect_err("A non-expiry denial should fail the request.");

	assert!(error.is_auth_token_error());

	// No refresh is attempted and the session ends immediately.
	refresh.assert_calls_async(0).await;

	assert!(store.load().await.expect("Load should succeed.").is_none());
	assert!(client.credential().is_none());
}

#[tokio::test]
async fn a_non_expiry_denial_only_signals_on_server_renders() {
	let server = MockServer::start_async().await;
	let (client, store) = seeded_client(&server, RuntimeContext::ServerRender).await;
	let _denied = server
		.mock_async(|when, then| {
			when.method(GET).path("/users");
			then.status(401).header("content-type", "application/json").body("{}");
		})
		.await;
	let error = client
		.execute(&ApiRequest::get("users"))
		.await
		.expect_err("The denial should fail the request.");

	assert!(error.is_auth_token_error());
	// The server-rendered caller owns the redirect; its store is left for the guard layer.
	assert!(store.load().await.expect("Load should succeed.").is_some());

	let recovered = guard::recover_token_error(store.as_ref(), &error)
		.await
		.expect("Recovery should succeed.");

	assert_eq!(
		recovered,
		Some(GuardOutcome::Redirect { destination: SIGN_IN_ROUTE.into() })
	);
	assert!(store.load().await.expect("Load should succeed.").is_none());
}

#[tokio::test]
async fn sign_in_persists_the_session_and_installs_the_credential() {
	let server = MockServer::start_async().await;
	let (client, store) = empty_client(&server, RuntimeContext::Interactive).await;
	let sign_in = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/signin")
				.json_body(serde_json::json!({ "username": "ops", "password": "hunter22" }));
			then.status(200).header("content-type", "application/json").body(
				r#"{
					"email": "ops@example.com",
					"tokenType": "bearer",
					"accessToken": "access-new",
					"refreshToken": "refresh-new",
					"roles": ["administrator"],
					"permissions": ["users.list"]
				}"#,
			);
		})
		.await;
	let identity = client
		.sign_in(&SignInCredentials::new("ops", "hunter22"))
		.await
		.expect("Sign-in should succeed.");

	sign_in.assert_async().await;

	// The backend omitted the username echo; the submitted name fills the gap.
	assert_eq!(identity.username.as_deref(), Some("ops"));
	assert_eq!(identity.roles, ["administrator"]);

	let session = store
		.load()
		.await
		.expect("Load should succeed.")
		.expect("Sign-in should persist the session.");

	assert_eq!(session.token_type, "bearer");
	assert_eq!(session.access_token.expose(), "access-new");
	assert_eq!(session.refresh_token.expose(), "refresh-new");
	assert_eq!(
		client.credential().expect("Credential should be installed.").header_value(),
		"bearer access-new"
	);
}

#[tokio::test]
async fn sign_in_denials_propagate_without_touching_the_store() {
	let server = MockServer::start_async().await;
	let (client, store) = empty_client(&server, RuntimeContext::Interactive).await;
	let _denied = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/signin");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"message":"bad credentials"}"#);
		})
		.await;
	let error = client
		.sign_in(&SignInCredentials::new("ops", "wrong"))
		.await
		.expect_err("Bad credentials should fail the sign-in.");

	match error {
		Error::Api(api) => {
			assert_eq!(api.status, 401);
			assert_eq!(api.message, "bad credentials");
		},
		other => panic!("Expected an API error, got {other:?}."),
	}

	assert!(store.load().await.expect("Load should succeed.").is_none());
	assert!(client.credential().is_none());
}

#[tokio::test]
async fn transport_failures_propagate_unchanged() {
	let store = Arc::new(MemoryStore::new());
	// Nothing listens on this port; the dispatch itself must fail.
	let unreachable = Url::parse("http://127.0.0.1:9/").expect("Fixture URL should parse.");
	let client = Client::build(unreachable, store, RuntimeContext::Interactive)
		.await
		.expect("Client build should succeed.");
	let error = client
		.execute(&ApiRequest::get("users"))
		.await
		.expect_err("An unreachable backend should fail the request.");

	assert!(matches!(error, Error::Transport(_)));
}
