// std
use std::{env, process, sync::Arc};
// crates.io
use time::{Duration, OffsetDateTime};
// self
use usergate::{
	session::{SESSION_TTL, Session},
	store::{FileStore, MemoryStore, SessionStore},
};

fn fixture() -> Session {
	Session::new("bearer", "access-it", "refresh-it")
}

#[tokio::test]
async fn trait_object_stores_round_trip_all_three_fields() {
	let path = temp_path("roundtrip");
	let backends: Vec<Arc<dyn SessionStore>> = vec![
		Arc::new(MemoryStore::new()),
		Arc::new(FileStore::open(&path).expect("File store open should succeed.")),
	];

	for store in backends {
		store.save(fixture(), SESSION_TTL).await.expect("Save should succeed.");

		let loaded = store
			.load()
			.await
			.expect("Load should succeed.")
			.expect("Saved session should be present.");

		assert_eq!(loaded, fixture());

		store.clear().await.expect("Clear should succeed.");

		assert!(store.load().await.expect("Load should succeed.").is_none());
	}

	std::fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary snapshot {}: {e}", path.display())
	});
}

#[tokio::test]
async fn sessions_expire_with_their_entries() {
	let store = MemoryStore::new();

	store.save(fixture(), Duration::seconds(-1)).await.expect("Save should succeed.");

	assert!(store.load().await.expect("Load should succeed.").is_none());

	// A fresh save with the standard TTL replaces the expired set wholesale.
	store.save(fixture(), SESSION_TTL).await.expect("Save should succeed.");

	assert!(store.load().await.expect("Load should succeed.").is_some());
}

#[tokio::test]
async fn file_store_survives_a_reopen() {
	let path = temp_path("reopen");
	let store = FileStore::open(&path).expect("File store open should succeed.");

	store.save(fixture(), SESSION_TTL).await.expect("Save should succeed.");
	drop(store);

	let reopened = FileStore::open(&path).expect("File store reopen should succeed.");
	let loaded = reopened
		.load()
		.await
		.expect("Load should succeed.")
		.expect("Session should survive the reopen.");

	assert_eq!(loaded, fixture());

	std::fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary snapshot {}: {e}", path.display())
	});
}

fn temp_path(tag: &str) -> std::path::PathBuf {
	let unique = format!(
		"usergate_store_it_{tag}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	);

	env::temp_dir().join(unique)
}
