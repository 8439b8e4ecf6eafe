pub mod backend;
pub mod buckets;
pub mod grants;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod staging;
pub mod transfer;
pub mod worker;
