use super::CompareState;

/// Repository and branch the comparison runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub repo_name: Option<String>,
    pub branch: String,
}

pub struct AppState {
    pub selection: Selection,
    pub compare: CompareState,
    pub status_message: Option<(String, bool)>, // (message, is_error)
}

impl AppState {
    pub fn new(repo_name: Option<String>, branch: String) -> Self {
        Self {
            selection: Selection { repo_name, branch },
            compare: CompareState::new(),
            status_message: None,
        }
    }

    /// Selecting another repository resets the branch to `default_branch`.
    /// Returns true when the selection actually changed.
    pub fn select_repository(&mut self, repo_name: &str, default_branch: &str) -> bool {
        if self.selection.repo_name.as_deref() == Some(repo_name) {
            return false;
        }
        self.selection.repo_name = Some(repo_name.to_string());
        self.selection.branch = default_branch.to_string();
        true
    }

    pub fn switch_branch(&mut self, branch: &str) -> bool {
        if self.selection.branch == branch {
            return false;
        }
        self.selection.branch = branch.to_string();
        true
    }
}
