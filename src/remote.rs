//! Client side of the upstream git-hosted repository: the contents/trees REST API for
//! metadata and mutations, and the raw-content host for file bytes.

pub mod backend;
pub mod github;
pub mod memory;
pub mod types;

pub use backend::{ContentSource, RemoteStore};
pub use github::{GitHubStore, RawContentClient};
pub use memory::MemoryRemote;
pub use types::{collate_names, sort_entries, DirectoryEntry, EntryKind, TreeItem};
