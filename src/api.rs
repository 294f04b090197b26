//! Wire contract shared with the administration backend.

pub mod users;

// self
use crate::{_prelude::*, session::Secret};

/// Sign-in endpoint path.
pub const SIGN_IN_ENDPOINT: &str = "auth/signin";
/// Refresh endpoint path.
pub const REFRESH_ENDPOINT: &str = "auth/refreshtoken";
/// Who-am-I endpoint path.
pub const ME_ENDPOINT: &str = "auth/me";

/// Sign-in form credentials.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInCredentials {
	/// Account name.
	pub username: String,
	/// Account password; redacted in debug output.
	pub password: Secret,
}
impl SignInCredentials {
	/// Builds the credential pair.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: Secret::new(password) }
	}
}

/// Successful sign-in payload.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
	/// Account name, echoed by the backend when available.
	#[serde(default)]
	pub username: Option<String>,
	/// Account email.
	pub email: String,
	/// Credential scheme prefix.
	pub token_type: String,
	/// Newly minted access token.
	pub access_token: Secret,
	/// Newly minted refresh token.
	pub refresh_token: Secret,
	/// Roles granted to the account.
	#[serde(default)]
	pub roles: Vec<String>,
	/// Permissions granted to the account.
	#[serde(default)]
	pub permissions: Vec<String>,
}

/// Body of the refresh call.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
	/// Refresh token currently stored for the session.
	pub refresh_token: Secret,
}

/// Refresh payload returned by the backend.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
	/// Replacement access token.
	pub access_token: Secret,
	/// Replacement refresh token.
	pub refresh_token: Secret,
	/// Credential scheme prefix.
	pub token_type: String,
}

/// Application-level failure body attached to denied responses.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeniedBody {
	/// Machine-readable denial code.
	#[serde(default)]
	pub code: Option<String>,
	/// Human-readable denial message.
	#[serde(default)]
	pub message: Option<String>,
}
impl DeniedBody {
	/// Denial code marking an expired (and therefore refreshable) access token.
	pub const TOKEN_EXPIRED: &'static str = "token.expired";

	/// Best-effort parse; denial bodies are advisory and may be absent or non-JSON.
	pub fn parse(body: &[u8]) -> Self {
		serde_json::from_slice(body).unwrap_or_default()
	}

	/// Returns `true` when the denial can be recovered by a token refresh.
	pub fn is_token_expired(&self) -> bool {
		self.code.as_deref() == Some(Self::TOKEN_EXPIRED)
	}
}
