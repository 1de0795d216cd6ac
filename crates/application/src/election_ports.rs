mod callbacks;
mod events;
mod store;
mod work;

pub use callbacks::{LeaderCallbacks, LeaderNameCallbacks};
pub use events::ElectionEventRecorder;
pub use store::LeaseStore;
pub use work::LeaderWork;
