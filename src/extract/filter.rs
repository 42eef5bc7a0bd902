/// A bundle path pattern: `^prefix` anchors to the start of the path, any
/// other pattern matches anywhere.
fn matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_prefix('^') {
        Some(prefix) if !prefix.is_empty() => path.starts_with(prefix),
        _ => path.contains(pattern),
    }
}

/// Decides which bundles of a server are extracted.
#[derive(Debug, Clone, Default)]
pub struct BundleFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl BundleFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Whether the bundle at `path` (relative to the bundle tree, `/` separated)
    /// is excluded. Exclude patterns win over include patterns.
    pub fn is_excluded(&self, path: &str) -> bool {
        let not_included =
            !self.include.is_empty() && !self.include.iter().any(|p| matches(p, path));
        not_included || self.exclude.iter().any(|p| matches(p, path))
    }
}
