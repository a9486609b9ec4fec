pub mod backup;
pub mod config;
pub mod error;
pub mod logging;
pub mod process;
pub mod storage;
pub mod transform;
pub mod warehouse;

pub use error::TransformError;
pub use transform::{InvocationRequest, InvocationResponse, TransformStep};
