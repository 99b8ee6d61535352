//! Virtual filesystem over the upstream repository: the TTL-cached asset index, fresh
//! directory listings, copy-then-delete moves, deletes and dashboard sampling.

pub mod assets;
pub mod correlation;
pub mod index;
pub mod listing;
pub mod ops;
pub mod paths;
pub mod sampling;

pub use assets::{AssetRecord, ContentUrls};
pub use correlation::CorrelationId;
pub use index::TreeIndex;
pub use ops::{delete_file, move_file, MoveOperation, MoveOutcome, MoveStage};
pub use sampling::{batch_export, sample_dashboard, DashboardSample};
