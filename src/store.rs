//! Storage contracts and built-in session store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, session::Session};

/// Fixed entry key for the credential scheme.
pub const TOKEN_TYPE_KEY: &str = "usergate.tokenType";
/// Fixed entry key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "usergate.accessToken";
/// Fixed entry key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "usergate.refreshToken";
/// Path scope applied to every session entry.
pub const ENTRY_PATH: &str = "/";

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for the three session artifacts.
///
/// Implementations must write and clear the three entries as a set, so partial states (an
/// access token without a token type) are never produced. `load` reports `None` whenever the
/// set is incomplete or expired; callers treat that as unauthenticated.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the persisted session, if a complete unexpired set is present.
	fn load(&self) -> StoreFuture<'_, Option<Session>>;

	/// Persists all three session entries with the provided time-to-live.
	fn save(&self, session: Session, ttl: Duration) -> StoreFuture<'_, ()>;

	/// Removes every session entry. Clearing an empty store is a no-op.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Single durable entry holding one session artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
	/// Entry value.
	pub value: String,
	/// Path scope the entry applies to.
	pub path: String,
	/// Expiry instant after which the entry is treated as absent.
	pub expires_at: OffsetDateTime,
}
impl StoredEntry {
	/// Builds an entry under the standard path scope.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: value.into(), path: ENTRY_PATH.into(), expires_at }
	}

	/// Returns `true` when the entry is still live at `instant`.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}

pub(crate) fn session_entries(session: &Session, ttl: Duration) -> [(String, StoredEntry); 3] {
	let expires_at = OffsetDateTime::now_utc() + ttl;

	[
		(TOKEN_TYPE_KEY.into(), StoredEntry::new(&session.token_type, expires_at)),
		(ACCESS_TOKEN_KEY.into(), StoredEntry::new(session.access_token.expose(), expires_at)),
		(REFRESH_TOKEN_KEY.into(), StoredEntry::new(session.refresh_token.expose(), expires_at)),
	]
}

pub(crate) fn assemble_session(entries: &HashMap<String, StoredEntry>) -> Option<Session> {
	let now = OffsetDateTime::now_utc();
	let live = |key: &str| {
		entries.get(key).filter(|entry| entry.is_live_at(now)).map(|entry| entry.value.clone())
	};
	// Any missing or expired entry makes the whole set unauthenticated.
	let token_type = live(TOKEN_TYPE_KEY)?;
	let access_token = live(ACCESS_TOKEN_KEY)?;
	let refresh_token = live(REFRESH_TOKEN_KEY)?;

	Some(Session::new(token_type, access_token, refresh_token))
}
