pub mod branch;
pub mod client;
pub mod error;
pub mod types;

pub use branch::sanitize_branch_name;
pub use client::{BackendClient, Token};
pub use error::BackendError;
pub use types::{Branch, BranchProtection, OperationOutcome, Repository};
