pub mod backfill;
pub mod driver;
pub mod fetcher;
pub mod incremental;
pub mod queue;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
