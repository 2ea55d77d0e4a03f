pub mod channel;
pub mod source;
pub mod worker;

pub use channel::{CompareRequest, CompareResult};
pub use source::{FileSource, RemoteSource};
pub use worker::CompareWorker;
