pub mod pipeline;

pub use pipeline::{PageSyncReport, StatusReport, SyncPipeline, SYNC_CONCURRENCY};
