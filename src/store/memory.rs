//! Thread-safe in-memory [`SessionStore`] for server-rendered requests and tests.
//!
//! A server render builds one `MemoryStore` per incoming request (seeded from that request's
//! cookies by the embedding layer), so session state never leaks across unrelated requests.

// self
use crate::{
	_prelude::*,
	session::Session,
	store::{self, SessionStore, StoreFuture, StoredEntry},
};

type EntryMap = Arc<RwLock<HashMap<String, StoredEntry>>>;

/// Thread-safe storage backend that keeps entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(EntryMap);
impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds the store with pre-existing entries (e.g. parsed from a request's cookies).
	pub fn with_entries(entries: impl IntoIterator<Item = (String, StoredEntry)>) -> Self {
		Self(Arc::new(RwLock::new(entries.into_iter().collect())))
	}

	fn load_now(map: EntryMap) -> Option<Session> {
		store::assemble_session(&map.read())
	}

	fn save_now(map: EntryMap, session: Session, ttl: Duration) {
		let mut guard = map.write();

		for (key, entry) in store::session_entries(&session, ttl) {
			guard.insert(key, entry);
		}
	}

	fn clear_now(map: EntryMap) {
		map.write().clear();
	}
}
impl SessionStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<Session>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::load_now(map)) })
	}

	fn save(&self, session: Session, ttl: Duration) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::save_now(map, session, ttl);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::clear_now(map);

			Ok(())
		})
	}
}
