/// Observer of leadership transitions.
///
/// Callbacks run inline on the election loop, one at a time and in the order
/// of the transitions that caused them. They must return quickly and must not
/// block on the election itself.
pub trait LeaderCallbacks: Send + Sync {
    /// This candidate acquired the lease.
    fn on_started_leading(&self, identity: &str);

    /// This candidate's leadership ended.
    fn on_stopped_leading(&self);

    /// A different holder was observed. An empty identity means vacant.
    fn on_new_leader(&self, identity: &str);
}

/// Adapts the three transition callbacks onto one "current leader" function.
///
/// The function receives this candidate's identity when it starts leading,
/// an empty string when it stops (leader unknown), and the holder identity
/// whenever another candidate is observed.
pub struct LeaderNameCallbacks<F> {
    identity: String,
    on_leader: F,
}

impl<F> LeaderNameCallbacks<F>
where
    F: Fn(&str) + Send + Sync,
{
    /// Creates an adapter for the candidate with the given identity.
    #[must_use]
    pub fn new(identity: impl Into<String>, on_leader: F) -> Self {
        Self {
            identity: identity.into(),
            on_leader,
        }
    }
}

impl<F> LeaderCallbacks for LeaderNameCallbacks<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn on_started_leading(&self, _identity: &str) {
        (self.on_leader)(self.identity.as_str());
    }

    fn on_stopped_leading(&self) {
        (self.on_leader)("");
    }

    fn on_new_leader(&self, identity: &str) {
        if identity == self.identity {
            return;
        }

        (self.on_leader)(identity);
    }
}
