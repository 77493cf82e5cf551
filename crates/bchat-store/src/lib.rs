pub mod error;
pub mod index;
pub mod paths;
pub mod sessions;

pub use error::StoreError;
pub use index::{Entities, IndexEntry, IndexStore};
pub use paths::PathManager;
pub use sessions::{SessionRecord, SessionStore};
