pub mod app_state;
pub mod compare_state;

pub use app_state::AppState;
pub use compare_state::{Adoption, CompareState};
