use crate::compare::types::ComparisonRecord;
use crate::compare::CompareError;

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub generation: u64,
    pub repo_name: String,
    pub branch: String,
}

#[derive(Debug)]
pub struct CompareResult {
    pub generation: u64,
    pub records: Result<Vec<ComparisonRecord>, CompareError>,
}
