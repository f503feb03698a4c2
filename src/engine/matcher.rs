use moka::sync::Cache;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Wildcard and regular-expression matching over normalized addresses.
///
/// Compiled expressions are cached by source string. A source that fails to
/// compile is cached as `None` so it is reported once and then treated as a
/// permanent "no match".
pub struct PatternMatcher {
    compiled: Cache<String, Option<Regex>>,
}

impl PatternMatcher {
    pub fn new(capacity: u64) -> Self {
        Self {
            compiled: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// A domain matches when it contains the pattern, the pattern contains
    /// the domain, or the domain is a subdomain of the pattern. A leading
    /// `*.` on the pattern is ignored.
    pub fn wildcard_matches(&self, domain: &str, pattern: &str) -> bool {
        let domain = domain.trim().to_lowercase();
        let pattern = pattern.trim().to_lowercase();
        let pattern = pattern.strip_prefix("*.").unwrap_or(&pattern);

        if domain.is_empty() || pattern.is_empty() {
            return false;
        }

        domain.contains(pattern)
            || pattern.contains(domain.as_str())
            || domain.ends_with(&format!(".{}", pattern))
    }

    /// Case-insensitive regex match over the full address. Malformed
    /// expressions never match.
    pub fn regex_matches(&self, address: &str, source: &str) -> bool {
        match self.compiled(source) {
            Some(re) => re.is_match(address),
            None => false,
        }
    }

    fn compiled(&self, source: &str) -> Option<Regex> {
        self.compiled.get_with_by_ref(source, || {
            match RegexBuilder::new(source)
                .case_insensitive(true)
                .size_limit(REGEX_SIZE_LIMIT)
                .build()
            {
                Ok(re) => {
                    debug!("Compiled block pattern {:?}", source);
                    Some(re)
                }
                Err(e) => {
                    warn!("Ignoring malformed block pattern {:?}: {}", source, e);
                    None
                }
            }
        })
    }

    pub fn cached_patterns(&self) -> u64 {
        self.compiled.run_pending_tasks();
        self.compiled.entry_count()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new(512)
    }
}
