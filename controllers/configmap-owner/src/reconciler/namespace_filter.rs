//! Namespace selection by regular expression.

use regex::Regex;
use tracing::warn;

/// Decides which namespaces the controller acts in.
///
/// With no patterns configured every namespace is in scope. Otherwise a
/// namespace is in scope when at least one pattern matches it (unanchored,
/// so `kube-` matches `my-kube-ns`; use `^`/`$` to anchor).
///
/// A pattern that fails to compile is logged once and then never matches.
/// It still counts as configured, so a list of only broken patterns selects
/// nothing rather than everything.
#[derive(Debug, Clone)]
pub struct NamespaceFilter {
    patterns: Vec<Regex>,
    configured: usize,
}

impl NamespaceFilter {
    /// Compile the given patterns.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let compiled = patterns
            .iter()
            .filter_map(|pattern| {
                let pattern = pattern.as_ref();
                match Regex::new(pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!("Ignoring invalid namespace pattern {:?}: {}", pattern, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            patterns: compiled,
            configured: patterns.len(),
        }
    }

    /// True when no patterns were configured.
    pub fn is_match_all(&self) -> bool {
        self.configured == 0
    }

    /// Whether `namespace` is in scope.
    pub fn matches(&self, namespace: &str) -> bool {
        self.is_match_all() || self.patterns.iter().any(|re| re.is_match(namespace))
    }
}
