use leaderlease_domain::LeaderSnapshot;
use tokio::sync::watch;

/// Passive reader of one elector's status.
///
/// Readers only ever see copies; the election loop is the single writer.
#[derive(Debug, Clone)]
pub struct LeaderStatusReader {
    receiver: watch::Receiver<LeaderSnapshot>,
}

impl LeaderStatusReader {
    /// Returns a copy of the latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> LeaderSnapshot {
        self.receiver.borrow().clone()
    }

    /// Returns the last observed leader, empty when unknown.
    #[must_use]
    pub fn current_leader(&self) -> String {
        self.receiver.borrow().leader_identity.clone()
    }

    /// Waits until a snapshot satisfies `predicate`.
    ///
    /// Returns `None` once the elector is gone without satisfying it.
    pub async fn wait_until(
        &mut self,
        predicate: impl FnMut(&LeaderSnapshot) -> bool,
    ) -> Option<LeaderSnapshot> {
        self.receiver
            .wait_for(predicate)
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }
}

pub(super) struct LeaderStatusPublisher {
    sender: watch::Sender<LeaderSnapshot>,
}

impl LeaderStatusPublisher {
    pub(super) fn new() -> Self {
        let (sender, _) = watch::channel(LeaderSnapshot::default());
        Self { sender }
    }

    pub(super) fn reader(&self) -> LeaderStatusReader {
        LeaderStatusReader {
            receiver: self.sender.subscribe(),
        }
    }

    pub(super) fn publish(&self, snapshot: LeaderSnapshot) {
        self.sender.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }

            *current = snapshot;
            true
        });
    }
}
