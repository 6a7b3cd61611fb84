//! Refresh coordination
//!
//! A [`RefreshCoordinator`] is either `Idle` or `Refreshing`. The first request
//! to see a 401 while idle becomes the leader and performs the refresh; every
//! request arriving while a refresh is in flight becomes a follower and waits
//! for the leader's outcome. The state lock is never held across an await.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

use crate::error::ClientError;

/// New access token, or the error every waiter fails with
pub type RefreshOutcome = Result<String, ClientError>;

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

/// Role handed out by [`RefreshCoordinator::begin`]
pub enum Ticket<'a> {
    /// Perform the refresh and settle the lease
    Leader(RefreshLease<'a>),
    /// Await the leader's outcome
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current refresh, or start one if none is running
    pub fn begin(&self) -> Ticket<'_> {
        let mut state = self.lock();

        if let State::Refreshing { waiters } = &mut *state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            return Ticket::Follower(rx);
        }

        *state = State::Refreshing {
            waiters: Vec::new(),
        };
        Ticket::Leader(RefreshLease {
            coordinator: self,
            settled: false,
        })
    }

    /// Wait out any refresh in flight, then hold the coordinator so no new
    /// one starts until the returned lease settles
    pub async fn acquire(&self) -> RefreshLease<'_> {
        loop {
            match self.begin() {
                Ticket::Leader(lease) => return lease,
                Ticket::Follower(outcome) => {
                    let _ = outcome.await;
                }
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), State::Refreshing { .. })
    }

    fn settle(&self, outcome: RefreshOutcome) {
        let waiters = match std::mem::take(&mut *self.lock()) {
            State::Refreshing { waiters } => waiters,
            State::Idle => Vec::new(),
        };

        tracing::debug!(waiters = waiters.len(), ok = outcome.is_ok(), "Refresh settled");
        for waiter in waiters {
            // A waiter whose request was cancelled has dropped its receiver
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Leadership of one refresh
///
/// Dropping an unsettled lease rejects the waiters with
/// [`ClientError::RefreshAbandoned`] and returns the coordinator to idle.
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    pub fn resolve(mut self, access_token: String) {
        self.settled = true;
        self.coordinator.settle(Ok(access_token));
    }

    pub fn reject(mut self, error: ClientError) {
        self.settled = true;
        self.coordinator.settle(Err(error));
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh abandoned by its leader");
            self.coordinator.settle(Err(ClientError::RefreshAbandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader(coordinator: &RefreshCoordinator) -> RefreshLease<'_> {
        match coordinator.begin() {
            Ticket::Leader(lease) => lease,
            Ticket::Follower(_) => panic!("expected to lead"),
        }
    }

    fn follower(coordinator: &RefreshCoordinator) -> oneshot::Receiver<RefreshOutcome> {
        match coordinator.begin() {
            Ticket::Follower(rx) => rx,
            Ticket::Leader(_) => panic!("expected to follow"),
        }
    }

    #[tokio::test]
    async fn test_followers_share_the_leaders_token() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let first = follower(&coordinator);
        let second = follower(&coordinator);
        assert!(coordinator.is_refreshing());

        lease.resolve("fresh".to_string());

        assert_eq!(first.await.unwrap(), Ok("fresh".to_string()));
        assert_eq!(second.await.unwrap(), Ok("fresh".to_string()));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_rejection_reaches_every_follower() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let waiters: Vec<_> = (0..3).map(|_| follower(&coordinator)).collect();

        lease.reject(ClientError::SessionExpired);

        for rx in waiters {
            assert_eq!(rx.await.unwrap(), Err(ClientError::SessionExpired));
        }
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let rx = follower(&coordinator);

        drop(lease);

        assert_eq!(rx.await.unwrap(), Err(ClientError::RefreshAbandoned));
        assert!(!coordinator.is_refreshing());

        // Next 401 starts a fresh refresh
        let _lease = leader(&coordinator);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_refresh_in_flight() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);

        let (held, ()) = tokio::join!(coordinator.acquire(), async {
            tokio::task::yield_now().await;
            assert!(coordinator.is_refreshing());
            lease.resolve("fresh".to_string());
        });

        // The acquired lease blocks new refreshes until it settles
        let rx = follower(&coordinator);
        held.reject(ClientError::SessionExpired);
        assert_eq!(rx.await.unwrap(), Err(ClientError::SessionExpired));
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_cancelled_follower_does_not_block_settle() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        drop(follower(&coordinator));

        lease.resolve("fresh".to_string());
        assert!(!coordinator.is_refreshing());
    }
}
