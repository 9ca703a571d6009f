//! Core store types: the versioned cache, payload codecs, the poller and the
//! store handle itself.

mod builder;
mod cache;
mod codec;
mod poller;
mod settings;
mod store;

pub use builder::VersionedStoreBuilder;
pub use cache::{EMPTY_VERSION, MergeReport, VersionedCache};
pub use codec::{ConfigCodec, JsonCodec, Versioned};
pub use settings::{DEFAULT_POLLING_INTERVAL, StoreSettings};
pub use store::{StoreState, VersionedStore};
