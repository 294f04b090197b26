//! Fail-closed access evaluation over session claims.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Claims associated with a session.
///
/// Produced either by decoding the access token locally (roles and permissions only) or by the
/// who-am-I endpoint (all four fields). Read-only to the rest of the system and never persisted
/// independently of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
	/// Account name, when known.
	pub username: Option<String>,
	/// Account email, when known.
	pub email: Option<String>,
	/// Roles granted to the account.
	pub roles: Vec<String>,
	/// Permissions granted to the account.
	pub permissions: Vec<String>,
}

/// Claim subset carried in the access token payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TokenClaims {
	/// Permission claims.
	pub permissions: Vec<String>,
	/// Role claims.
	pub roles: Vec<String>,
}
impl TokenClaims {
	/// Extracts the claims from a JWT access token without verifying its signature.
	///
	/// The backend owns signature verification; this decode only feeds local access checks, so
	/// a forged token buys nothing beyond a page the backend will still deny.
	pub fn decode(access_token: &str) -> Result<Self, ClaimsError> {
		let mut segments = access_token.split('.');
		let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_), None) => payload,
			_ => return Err(ClaimsError::MalformedToken),
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload)?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		Ok(serde_path_to_error::deserialize(&mut deserializer)?)
	}
}
impl From<TokenClaims> for Identity {
	fn from(claims: TokenClaims) -> Self {
		Self { username: None, email: None, roles: claims.roles, permissions: claims.permissions }
	}
}

/// Errors raised while extracting claims from an access token.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// Token is not a three-segment JWT.
	#[error("Access token is not a three-segment JWT.")]
	MalformedToken,
	/// Payload segment is not valid base64url.
	#[error("Access token payload is not valid base64url.")]
	PayloadEncoding(#[from] base64::DecodeError),
	/// Payload JSON does not match the expected claim shape.
	#[error("Access token payload JSON is malformed.")]
	PayloadDecode(#[from] serde_path_to_error::Error<serde_json::Error>),
}

/// Requirement pair consumed by render guards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessRequirements {
	/// Permissions that must all be held.
	pub permissions: Vec<String>,
	/// Roles of which at least one must be held.
	pub roles: Vec<String>,
}
impl AccessRequirements {
	/// Creates an empty requirement pair, satisfied by any present identity.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds one required permission.
	pub fn permission(mut self, permission: impl Into<String>) -> Self {
		self.permissions.push(permission.into());

		self
	}

	/// Adds one accepted role.
	pub fn role(mut self, role: impl Into<String>) -> Self {
		self.roles.push(role.into());

		self
	}

	/// Evaluates the pair against an identity; see [`evaluate`].
	pub fn satisfied_by(&self, identity: Option<&Identity>) -> bool {
		evaluate(identity, &self.permissions, &self.roles)
	}
}

/// Returns whether `identity` satisfies the required permission and role sets.
///
/// The two lists are intentionally asymmetric, matching the backend's authorization model:
/// every listed permission must be held (AND over `permissions`), while holding any single
/// listed role suffices (OR over `roles`). An absent identity satisfies nothing; two empty
/// lists are satisfied by any present identity. Pure function of its inputs.
pub fn evaluate<P, R>(identity: Option<&Identity>, permissions: &[P], roles: &[R]) -> bool
where
	P: AsRef<str>,
	R: AsRef<str>,
{
	let Some(identity) = identity else {
		return false;
	};

	if !permissions.iter().all(|p| identity.permissions.iter().any(|held| held == p.as_ref())) {
		return false;
	}
	if !roles.is_empty() && !roles.iter().any(|r| identity.roles.iter().any(|held| held == r.as_ref())) {
		return false;
	}

	true
}
