// Synchronization layer
//
// Cached, deduplicated, retrying, self-refreshing access to remote
// resources. Resource is the generic per-key state machine; StatusSync
// wires the four status endpoints onto it.

mod call;
mod entry;
mod options;
mod resource;
mod signals;
mod status;

pub use call::{ApiCall, CallState};
pub use entry::{CacheEntry, Snapshot, SyncPhase};
pub use options::SyncOptions;
pub use resource::{Resource, Subscription};
pub use signals::{HostEvent, HostSignals};
pub use status::{ApiStatus, ResourceHandle, ResourceKey, StatusSync};
