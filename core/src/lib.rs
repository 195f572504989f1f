pub mod db;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod models;
pub mod query;
pub mod seed;
pub mod store;

pub use error::{Result, StoreError};
pub use store::Storage;
