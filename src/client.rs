//! Authenticated request client: credential attachment, failure classification, and the
//! session-refresh protocol.
//!
//! The client wraps every outbound call with the session's credential header and intercepts
//! every response. A 401 carrying the backend's `token.expired` code is recovered in place:
//! the failing caller enlists with the refresh coordinator, exactly one refresh call runs per
//! cycle, and every caller queued on the cycle is replayed once with the new credential, in
//! the order it failed. Any other 401 ends the session (interactive contexts) or surfaces the
//! [`AuthTokenError`] sentinel (server renders).

mod refresh;

pub use refresh::RefreshMetrics;

use refresh::RefreshCoordinator;

// crates.io
use reqwest::{Method, StatusCode, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	access::Identity,
	api::{self, DeniedBody, RefreshRequest, RefreshResponse, SignInCredentials, SignInResponse},
	error::{ApiError, AuthTokenError, ConfigError, TransportError},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{self, Credential, SESSION_TTL, Session},
	store::SessionStore,
};

/// Default bound applied to every outbound call, including the refresh call itself.
///
/// Bounding the refresh call keeps queued continuations from waiting forever on a hung cycle.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);

/// Execution context a client is built for.
///
/// Selects what happens on a non-refreshable authentication denial: an interactive process
/// owns the durable session and terminates it in place, while a server render only signals
/// [`AuthTokenError`] upward so the rendering layer can clear its request-scoped store and
/// issue its own redirect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeContext {
	/// Long-lived interactive process owning the durable session.
	Interactive,
	/// Short-lived server-rendered request scoped to its own store.
	ServerRender,
}

/// Replayable description of one backend request.
///
/// Requests are kept as data (method, path, query, JSON body) rather than transport builders
/// so a request that failed on an expired token can be dispatched again unchanged.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	method: Method,
	path: String,
	query: Vec<(String, String)>,
	body: Option<serde_json::Value>,
}
impl ApiRequest {
	fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None }
	}

	/// GET request for the provided path, relative to the client's base URL.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// POST request for the provided path.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// PUT request for the provided path.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// DELETE request for the provided path.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends one query pair.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Attaches a JSON body.
	pub fn json<T>(mut self, body: &T) -> Result<Self>
	where
		T: Serialize,
	{
		self.body =
			Some(serde_json::to_value(body).map_err(|source| ConfigError::RequestEncode { source })?);

		Ok(self)
	}

	fn url_on(&self, base: &Url) -> Result<Url> {
		let mut url = base.join(&self.path).map_err(|source| ConfigError::InvalidUrl { source })?;

		if !self.query.is_empty() {
			url.query_pairs_mut()
				.extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		Ok(url)
	}
}

/// Buffered backend response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: StatusCode,
	body: Vec<u8>,
}
impl ApiResponse {
	/// HTTP status code.
	pub fn status(&self) -> u16 {
		self.status.as_u16()
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Decodes the body, naming the offending JSON path on failure.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			ConfigError::ResponseDecode { source, status: Some(self.status.as_u16()) }.into()
		})
	}
}

/// Authenticated request client for the administration backend.
///
/// Build one per execution context: a fresh instance (with a fresh store) per server-rendered
/// request, a long-lived instance per interactive process. The client reads the store once at
/// construction and keeps the credential header in memory afterwards; refresh cycles update
/// both together.
pub struct Client {
	http: ReqwestClient,
	base_url: Url,
	store: Arc<dyn SessionStore>,
	context: RuntimeContext,
	credential: RwLock<Option<Credential>>,
	coordinator: RefreshCoordinator,
	metrics: Arc<RefreshMetrics>,
}
impl Client {
	/// Builds a client bound to `base_url`, attaching the stored credential when one exists.
	pub async fn build(
		base_url: Url,
		store: Arc<dyn SessionStore>,
		context: RuntimeContext,
	) -> Result<Self> {
		Self::build_with_timeout(base_url, store, context, DEFAULT_REQUEST_TIMEOUT).await
	}

	/// Same as [`Client::build`] with an explicit per-request timeout bound.
	pub async fn build_with_timeout(
		base_url: Url,
		store: Arc<dyn SessionStore>,
		context: RuntimeContext,
		timeout: Duration,
	) -> Result<Self> {
		let http = ReqwestClient::builder()
			.timeout(timeout.unsigned_abs())
			.build()
			.map_err(ConfigError::from)?;
		let credential = store.load().await?.as_ref().map(Session::credential);

		Ok(Self {
			http,
			base_url,
			store,
			context,
			credential: RwLock::new(credential),
			coordinator: RefreshCoordinator::default(),
			metrics: Arc::default(),
		})
	}

	/// Context the client was built for.
	pub fn context(&self) -> RuntimeContext {
		self.context
	}

	/// Store backing this client's session.
	pub fn store(&self) -> &Arc<dyn SessionStore> {
		&self.store
	}

	/// Snapshot of the default credential header, if any.
	pub fn credential(&self) -> Option<Credential> {
		self.credential.read().clone()
	}

	/// Refresh counters recorded by this client.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Issues `request`, transparently refreshing the session when the backend reports an
	/// expired access token.
	///
	/// A request denied with `token.expired` is retried exactly once, with the credential
	/// produced by the refresh cycle it was queued on; concurrent failures share one refresh
	/// call and are replayed in the order they failed. A second denial of the same request is
	/// treated as non-refreshable.
	pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "execute");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let response = self.dispatch(request, self.credential().as_ref()).await?;

				if response.status != StatusCode::UNAUTHORIZED {
					return Self::classify(response);
				}
				if !DeniedBody::parse(&response.body).is_token_expired() {
					return Err(self.deny_session().await);
				}

				let waiter = self.coordinator.enlist();

				if waiter.leads() {
					let outcome = self.run_refresh_cycle().await;

					self.coordinator.settle(outcome);
				}

				match waiter.wait().await {
					Ok(credential) => {
						let replay = self.dispatch(request, Some(&credential)).await?;

						if replay.status == StatusCode::UNAUTHORIZED {
							return Err(self.deny_session().await);
						}

						Self::classify(replay)
					},
					Err(refresh_error) => Err(refresh_error.into()),
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Exchanges credentials for a session, persists it, and installs the credential header.
	///
	/// Runs outside the refresh protocol: there is no session to refresh yet, so any denial
	/// propagates as a plain API error.
	pub async fn sign_in(&self, credentials: &SignInCredentials) -> Result<Identity> {
		const KIND: FlowKind = FlowKind::SignIn;

		let span = FlowSpan::new(KIND, "sign_in");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(api::SIGN_IN_ENDPOINT).json(credentials)?;
				let response = Self::classify(self.dispatch(&request, None).await?)?;
				let SignInResponse {
					username,
					email,
					token_type,
					access_token,
					refresh_token,
					roles,
					permissions,
				} = response.json()?;
				let session =
					Session::new(token_type, access_token.expose(), refresh_token.expose());

				self.store.save(session.clone(), SESSION_TTL).await?;
				self.set_credential(Some(session.credential()));

				Ok(Identity {
					// Some backend versions omit the echo; the submitted name is authoritative
					// enough for display purposes.
					username: username.or_else(|| Some(credentials.username.clone())),
					email: Some(email),
					roles,
					permissions,
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Fetches the caller's identity from the backend.
	pub async fn who_am_i(&self) -> Result<Identity> {
		self.execute(&ApiRequest::get(api::ME_ENDPOINT)).await?.json()
	}

	fn set_credential(&self, credential: Option<Credential>) {
		*self.credential.write() = credential;
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		credential: Option<&Credential>,
	) -> Result<ApiResponse> {
		let url = request.url_on(&self.base_url)?;
		let mut builder = self.http.request(request.method.clone(), url);

		if let Some(credential) = credential {
			builder = builder.header(AUTHORIZATION, credential.header_value());
		}
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(TransportError::from)?;
		let status = response.status();
		let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

		Ok(ApiResponse { status, body })
	}

	fn classify(response: ApiResponse) -> Result<ApiResponse> {
		if response.status.is_success() {
			return Ok(response);
		}

		let denial = DeniedBody::parse(&response.body);
		let message = denial.message.unwrap_or_else(|| {
			response.status.canonical_reason().unwrap_or("request failed").to_owned()
		});

		Err(ApiError { status: response.status.as_u16(), code: denial.code, message }.into())
	}

	/// Ends the session on a non-refreshable denial and produces the sentinel.
	async fn deny_session(&self) -> Error {
		if self.context == RuntimeContext::Interactive {
			if let Err(e) = session::terminate(self.store.as_ref()).await {
				return e;
			}
		}

		self.set_credential(None);

		AuthTokenError.into()
	}

	async fn run_refresh_cycle(&self) -> Result<Credential, crate::error::RefreshError> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "run_refresh_cycle");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		match span.instrument(async move { self.refresh_once().await }).await {
			Ok(credential) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				self.metrics.record_success();

				Ok(credential)
			},
			Err(error) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.metrics.record_failure();

				if self.context == RuntimeContext::Interactive {
					// The refresh failure is what queued callers need; a store clear failure
					// here must not mask it.
					let _ = session::terminate(self.store.as_ref()).await;
				}

				self.set_credential(None);

				Err(crate::error::RefreshError::new(error))
			},
		}
	}

	async fn refresh_once(&self) -> Result<Credential> {
		let session = self.store.load().await?.ok_or(AuthTokenError)?;
		let request = ApiRequest::post(api::REFRESH_ENDPOINT)
			.json(&RefreshRequest { refresh_token: session.refresh_token.clone() })?;
		let response = Self::classify(self.dispatch(&request, None).await?)?;
		let RefreshResponse { access_token, refresh_token, token_type } = response.json()?;
		let renewed = Session::new(token_type, access_token.expose(), refresh_token.expose());
		let credential = renewed.credential();

		self.store.save(renewed, SESSION_TTL).await?;
		self.set_credential(Some(credential.clone()));

		Ok(credential)
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.base_url)
			.field("context", &self.context)
			.field("credential_set", &self.credential.read().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_urls_join_base_path_and_query() {
		let base = Url::parse("http://127.0.0.1:8080/").expect("Base URL fixture should parse.");
		let request = ApiRequest::get("users").query("page", "0").query("size", "5");
		let url = request.url_on(&base).expect("Request URL should assemble.");

		assert_eq!(url.as_str(), "http://127.0.0.1:8080/users?page=0&size=5");
	}

	#[test]
	fn classify_passes_success_and_maps_denials() {
		let ok = ApiResponse { status: StatusCode::OK, body: b"{}".to_vec() };

		assert!(Client::classify(ok).is_ok());

		let denied = ApiResponse {
			status: StatusCode::FORBIDDEN,
			body: br#"{"code":"users.locked","message":"Account locked"}"#.to_vec(),
		};

		match Client::classify(denied).expect_err("Denials should map to API errors.") {
			Error::Api(api) => {
				assert_eq!(api.status, 403);
				assert_eq!(api.code.as_deref(), Some("users.locked"));
				assert_eq!(api.message, "Account locked");
			},
			other => panic!("Expected an API error, got {other:?}."),
		}
	}

	#[test]
	fn classify_falls_back_to_the_status_reason() {
		let denied = ApiResponse { status: StatusCode::BAD_GATEWAY, body: Vec::new() };

		match Client::classify(denied).expect_err("Denials should map to API errors.") {
			Error::Api(api) => {
				assert_eq!(api.status, 502);
				assert_eq!(api.code, None);
				assert_eq!(api.message, "Bad Gateway");
			},
			other => panic!("Expected an API error, got {other:?}."),
		}
	}

	#[test]
	fn response_json_reports_the_failing_path() {
		let response =
			ApiResponse { status: StatusCode::OK, body: br#"{"users": 5}"#.to_vec() };
		let error = response
			.json::<crate::api::users::UserPage>()
			.expect_err("Mismatched shape should fail to decode.");

		assert!(matches!(error, Error::Config(ConfigError::ResponseDecode { .. })));
	}
}
