//! Render guards evaluated before a page is produced.
//!
//! Guards return their decision as data; the rendering layer owns navigation. This keeps the
//! core free of any UI-framework primitive while every page still calls the same predicates.

// self
use crate::{
	_prelude::*,
	access::{AccessRequirements, Identity, TokenClaims},
	session::{DASHBOARD_ROUTE, SIGN_IN_ROUTE},
	store::SessionStore,
};

/// Decision returned by a guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
	/// Render the requested page.
	Proceed,
	/// Navigate to `destination` instead of rendering.
	Redirect {
		/// Route to navigate to.
		destination: String,
	},
}
impl GuardOutcome {
	/// Returns `true` when the guard decided against rendering.
	pub fn is_redirect(&self) -> bool {
		matches!(self, Self::Redirect { .. })
	}

	fn redirect(destination: &str) -> Self {
		Self::Redirect { destination: destination.to_owned() }
	}
}

/// Requires a stored session, optionally holding the given access requirements.
///
/// Requirements are checked against claims decoded locally from the access token; a token
/// that fails to decode counts as unauthenticated rather than surfacing an error, keeping the
/// guard fail-closed.
pub async fn require_auth(
	store: &dyn SessionStore,
	requirements: Option<&AccessRequirements>,
) -> Result<GuardOutcome> {
	let Some(session) = store.load().await? else {
		return Ok(GuardOutcome::redirect(SIGN_IN_ROUTE));
	};

	if let Some(requirements) = requirements {
		let identity =
			TokenClaims::decode(session.access_token.expose()).ok().map(Identity::from);

		if !requirements.satisfied_by(identity.as_ref()) {
			return Ok(GuardOutcome::redirect(SIGN_IN_ROUTE));
		}
	}

	Ok(GuardOutcome::Proceed)
}

/// Keeps authenticated visitors away from guest-only pages (sign-in, registration).
pub async fn require_guest(store: &dyn SessionStore) -> Result<GuardOutcome> {
	if store.load().await?.is_some() {
		return Ok(GuardOutcome::redirect(DASHBOARD_ROUTE));
	}

	Ok(GuardOutcome::Proceed)
}

/// Maps a request error raised while rendering into a guard outcome.
///
/// Only the authentication-token sentinel is recovered: the stored session is cleared and the
/// visitor is sent to sign-in. Every other error is left for the caller to surface.
pub async fn recover_token_error(
	store: &dyn SessionStore,
	error: &Error,
) -> Result<Option<GuardOutcome>> {
	if !error.is_auth_token_error() {
		return Ok(None);
	}

	store.clear().await?;

	Ok(Some(GuardOutcome::redirect(SIGN_IN_ROUTE)))
}
