//! Session model, credential material, and the session terminator.

// self
use crate::{_prelude::*, store::SessionStore};

/// Time-to-live applied to every persisted session entry.
pub const SESSION_TTL: Duration = Duration::days(30);
/// Route presented to unauthenticated visitors.
pub const SIGN_IN_ROUTE: &str = "/";
/// Route presented after a successful sign-in.
pub const DASHBOARD_ROUTE: &str = "/dashboard";

/// Redacted secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Complete set of session artifacts persisted between visits.
///
/// The three fields are written to and cleared from the store together; a session with an
/// access token but no token type must never exist.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
	/// Credential scheme prefix (e.g. `bearer`).
	pub token_type: String,
	/// Short-lived credential authorizing requests.
	pub access_token: Secret,
	/// Longer-lived credential used only to mint a new access token.
	pub refresh_token: Secret,
}
impl Session {
	/// Builds a session from its three artifacts.
	pub fn new(
		token_type: impl Into<String>,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Self {
		Self {
			token_type: token_type.into(),
			access_token: Secret::new(access_token),
			refresh_token: Secret::new(refresh_token),
		}
	}

	/// Builds the credential header value, `{token_type} {access_token}`.
	pub fn credential(&self) -> Credential {
		Credential(format!("{} {}", self.token_type, self.access_token.expose()))
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("token_type", &self.token_type)
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token)
			.finish()
	}
}

/// Ready-to-send `Authorization` header value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);
impl Credential {
	/// Returns the header value. Callers must avoid logging this string.
	pub fn header_value(&self) -> &str {
		&self.0
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Credential").field(&"<redacted>").finish()
	}
}

/// Outcome of terminating a session; the caller performs the navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Termination {
	/// Route the caller should navigate to.
	pub redirect_to: &'static str,
}

/// Clears every persisted session artifact and yields the sign-in redirect.
///
/// Idempotent: terminating with nothing stored is a no-op apart from the returned redirect.
pub async fn terminate(store: &dyn SessionStore) -> Result<Termination> {
	store.clear().await?;

	Ok(Termination { redirect_to: SIGN_IN_ROUTE })
}
