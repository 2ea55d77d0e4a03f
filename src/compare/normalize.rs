/// Workspace root prefix used by the backend's listing endpoint.
pub const DEFAULT_ROOT_PREFIX: &str = "/app/";

/// Canonicalizes paths so workspace and repository entries can be joined.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    root_prefix: String,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_PREFIX)
    }
}

impl PathNormalizer {
    /// A non-empty prefix always ends in `/` so it only matches whole
    /// directory names.
    pub fn new(root_prefix: &str) -> Self {
        let mut root_prefix = root_prefix.replace('\\', "/");
        if !root_prefix.is_empty() && !root_prefix.ends_with('/') {
            root_prefix.push('/');
        }
        Self { root_prefix }
    }

    /// Convert separators to `/` and strip the root prefix.
    ///
    /// Separators are converted before stripping and the prefix is removed
    /// until it no longer matches, so `normalize(normalize(p)) == normalize(p)`.
    pub fn normalize(&self, path: &str) -> String {
        let mut normalized = path.replace('\\', "/");
        if self.root_prefix.is_empty() {
            return normalized;
        }
        while let Some(rest) = normalized.strip_prefix(self.root_prefix.as_str()) {
            normalized = rest.to_string();
        }
        normalized
    }
}

/// Canonical form used for content equality: LF line endings, no trailing
/// whitespace at the end of the text.
pub fn normalize_content(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        if c == '\n' {
            // "\r\r\n" collapses fully so a second pass is a no-op
            while out.ends_with('\r') {
                out.pop();
            }
        }
        out.push(c);
    }
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out
}
