//! Import pipeline services

pub mod aggregator;
pub mod batch_writer;
pub mod bulk_import;
pub mod classifier;
pub mod dedup;
pub mod locks;
pub mod notifier;
pub mod reconciler;
pub mod row_selector;
pub mod store;
pub mod tabular;
