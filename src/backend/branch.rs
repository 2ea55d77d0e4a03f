/// Make a user-typed branch name acceptable to git: spaces become hyphens and
/// anything outside `[A-Za-z0-9_-]` is dropped. Returns `None` when nothing
/// usable is left.
pub fn sanitize_branch_name(name: &str) -> Option<String> {
    let sanitized: String = name
        .trim()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaces_to_hyphens() {
        assert_eq!(sanitize_branch_name("  my new feature "), Some("my-new-feature".to_string()));
    }

    #[test]
    fn test_strips_special_characters() {
        assert_eq!(sanitize_branch_name("fix/bug#12"), Some("fixbug12".to_string()));
        assert_eq!(sanitize_branch_name("feat_x-1"), Some("feat_x-1".to_string()));
        assert_eq!(sanitize_branch_name("café"), Some("caf".to_string()));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(sanitize_branch_name(""), None);
        assert_eq!(sanitize_branch_name("   "), None);
        assert_eq!(sanitize_branch_name("/#!"), None);
    }
}
