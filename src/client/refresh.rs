//! Singleflight refresh coordination: at most one refresh call per cycle, FIFO replay of every
//! caller queued on it.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, error::RefreshError, session::Credential};

/// Message delivered to each queued caller when a refresh cycle settles.
pub(crate) type CycleResult = Result<Credential, RefreshError>;

/// Continuation for one caller blocked on the in-flight refresh.
struct PendingRequest {
	tx: oneshot::Sender<CycleResult>,
}

#[derive(Default)]
struct CycleState {
	refreshing: bool,
	queue: Vec<PendingRequest>,
}

/// Per-client singleflight coordinator.
///
/// The in-flight flag and the pending queue live behind one synchronous lock that is held only
/// for check-and-set and drain, never across an await point, so the flag can never be observed
/// true for two concurrent cycles.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
	state: Mutex<CycleState>,
}
impl RefreshCoordinator {
	/// Queues the caller on the current cycle, starting one if none is running.
	///
	/// Exactly one caller per cycle observes the Idle → Refreshing transition; that caller
	/// drives the refresh call and settles the cycle for everyone queued behind it.
	pub(crate) fn enlist(&self) -> Waiter {
		let (tx, rx) = oneshot::channel();
		let mut state = self.state.lock();
		let leader = !state.refreshing;

		state.refreshing = true;
		state.queue.push(PendingRequest { tx });

		Waiter { rx, leader }
	}

	/// Ends the cycle: clears the flag, then replays the drained queue in FIFO order.
	pub(crate) fn settle(&self, result: CycleResult) {
		let drained = {
			let mut state = self.state.lock();

			state.refreshing = false;

			std::mem::take(&mut state.queue)
		};

		for pending in drained {
			// A dropped waiter only skips its own delivery.
			let _ = pending.tx.send(result.clone());
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &state.refreshing)
			.field("queued", &state.queue.len())
			.finish()
	}
}

/// Caller handle for one refresh cycle.
pub(crate) struct Waiter {
	rx: oneshot::Receiver<CycleResult>,
	leader: bool,
}
impl Waiter {
	/// `true` for the caller that must drive the refresh call and settle the cycle.
	pub(crate) fn leads(&self) -> bool {
		self.leader
	}

	/// Waits for the cycle to settle.
	pub(crate) async fn wait(self) -> CycleResult {
		match self.rx.await {
			Ok(result) => result,
			// The coordinator settles every cycle it starts; a closed channel means the client
			// was dropped mid-cycle.
			Err(_) => Err(RefreshError::new(crate::error::AuthTokenError.into())),
		}
	}
}

/// Thread-safe counters for refresh cycles driven by one client.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of refresh cycles started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that produced a new credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{error::AuthTokenError, session::Session};

	#[test]
	fn only_the_first_enlistee_leads_until_the_cycle_settles() {
		let coordinator = RefreshCoordinator::default();
		let first = coordinator.enlist();
		let second = coordinator.enlist();
		let third = coordinator.enlist();

		assert!(first.leads());
		assert!(!second.leads());
		assert!(!third.leads());

		coordinator.settle(Err(RefreshError::new(AuthTokenError.into())));

		assert!(coordinator.enlist().leads());
	}

	#[tokio::test]
	async fn settle_replays_every_queued_caller_with_the_shared_result() {
		let coordinator = RefreshCoordinator::default();
		let waiters: Vec<_> = (0..3).map(|_| coordinator.enlist()).collect();
		let failure = RefreshError::new(AuthTokenError.into());

		coordinator.settle(Err(failure.clone()));

		let mut sources = Vec::new();

		for waiter in waiters {
			match waiter.wait().await {
				Err(error) => sources.push(Arc::as_ptr(&error.source)),
				Ok(_) => panic!("Every queued caller should receive the shared failure."),
			}
		}

		assert_eq!(sources.len(), 3);
		assert!(sources.iter().all(|ptr| *ptr == Arc::as_ptr(&failure.source)));
	}

	#[tokio::test]
	async fn settle_delivers_the_new_credential_to_every_waiter() {
		let coordinator = RefreshCoordinator::default();
		let first = coordinator.enlist();
		let second = coordinator.enlist();
		let credential = Session::new("bearer", "access-new", "refresh-new").credential();

		coordinator.settle(Ok(credential.clone()));

		assert_eq!(first.wait().await.expect("Leader should receive the credential."), credential);
		assert_eq!(
			second.wait().await.expect("Follower should receive the credential."),
			credential
		);
	}

	#[tokio::test]
	async fn dropped_waiters_do_not_disturb_the_rest() {
		let coordinator = RefreshCoordinator::default();
		let first = coordinator.enlist();
		let dropped = coordinator.enlist();
		let last = coordinator.enlist();

		drop(dropped);
		coordinator.settle(Ok(Session::new("bearer", "a", "r").credential()));

		assert!(first.wait().await.is_ok());
		assert!(last.wait().await.is_ok());
	}
}
