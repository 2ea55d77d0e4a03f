use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Backend,
    Page,
    Component,
    Util,
}

/// Ordered directory-segment rules. First match wins.
const RULES: &[(&str, Category)] = &[
    ("apis", Category::Backend),
    ("pages", Category::Page),
    ("components", Category::Component),
];

impl Category {
    /// Classify an already-normalized path.
    pub fn classify(path: &str) -> Category {
        RULES
            .iter()
            .find(|(segment, _)| has_dir_segment(path, segment))
            .map(|(_, category)| *category)
            .unwrap_or(Category::Util)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Backend => "backend",
            Category::Page => "page",
            Category::Component => "component",
            Category::Util => "util",
        }
    }
}

/// A directory segment is any component except the last one (the file name).
fn has_dir_segment(path: &str, segment: &str) -> bool {
    let mut parts: Vec<&str> = path.split('/').collect();
    parts.pop();
    parts.iter().any(|p| *p == segment)
}
