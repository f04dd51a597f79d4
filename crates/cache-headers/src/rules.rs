//! Rule table: path patterns mapped to a ttl and a policy name.

use cache_headers_core::{ConfigError, ConfigResult, Timeouts};
use regex::Regex;

/// A single path rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    ttl: u64,
    policy: String,
    specificity: usize,
}

impl Rule {
    /// Compile a rule. The pattern is used as written, with no added anchors.
    pub fn new(pattern: &str, ttl: u64, policy: impl Into<String>) -> ConfigResult<Self> {
        let compiled = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: compiled,
            ttl,
            policy: policy.into(),
            specificity: pattern.len(),
        })
    }

    /// The pattern source string.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Length of the pattern string.
    pub fn specificity(&self) -> usize {
        self.specificity
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

/// Immutable, specificity-ordered list of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Flatten `timeouts` into rules, longest pattern first.
    ///
    /// Equal-length patterns keep their flattening order: policy name, then
    /// ttl ascending, then pattern list order.
    pub fn from_timeouts(timeouts: &Timeouts) -> ConfigResult<Self> {
        let mut rules = Vec::new();

        for (policy, by_ttl) in timeouts {
            let mut ttls = by_ttl
                .iter()
                .map(|(raw, patterns)| {
                    let ttl = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidTtl {
                        policy: policy.clone(),
                        ttl: raw.clone(),
                    })?;
                    Ok((ttl, patterns))
                })
                .collect::<ConfigResult<Vec<_>>>()?;
            ttls.sort_by_key(|(ttl, _)| *ttl);

            for (ttl, patterns) in ttls {
                for pattern in patterns {
                    rules.push(Rule::new(pattern, ttl, policy.as_str())?);
                }
            }
        }

        Ok(Self::from_rules(rules))
    }

    /// Order already compiled rules by specificity.
    pub fn from_rules(mut rules: Vec<Rule>) -> Self {
        // sort_by is stable
        rules.sort_by(|a, b| b.specificity.cmp(&a.specificity));
        Self { rules }
    }

    /// First rule, in specificity order, whose pattern matches `path`.
    pub fn find(&self, path: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Distinct policy names used by the table.
    pub fn policies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.iter().map(|r| r.policy()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_headers_core::CacheHeadersConfig;

    fn table(config: CacheHeadersConfig) -> RuleTable {
        RuleTable::from_timeouts(&config.timeouts).unwrap()
    }

    #[test]
    fn test_longest_pattern_wins() {
        let rules = table(
            CacheHeadersConfig::default()
                .with_rules("all-users", 600, &["/a/"])
                .with_rules("per-user", 60, &["/a/b/"]),
        );

        let rule = rules.find("/a/b/c").unwrap();
        assert_eq!(rule.pattern(), "/a/b/");
        assert_eq!(rule.policy(), "per-user");
        assert_eq!(rule.ttl(), 60);

        let rule = rules.find("/a/x").unwrap();
        assert_eq!(rule.policy(), "all-users");
    }

    #[test]
    fn test_order_is_by_specificity() {
        let rules = table(
            CacheHeadersConfig::default()
                .with_rules("all-users", 600, &["^/", "^/long/path/"])
                .with_rules("anonymous-only", 300, &["^/mid/"]),
        );
        let lens: Vec<usize> = rules.iter().map(|r| r.specificity()).collect();
        assert_eq!(lens, vec![12, 6, 2]);
    }

    #[test]
    fn test_ties_keep_flattening_order() {
        let rules = table(
            CacheHeadersConfig::default()
                .with_rules("b-policy", 10, &["/x"])
                .with_rules("a-policy", 20, &["/y", "/x"]),
        );
        let order: Vec<(&str, &str)> = rules.iter().map(|r| (r.policy(), r.pattern())).collect();
        assert_eq!(order, vec![("a-policy", "/y"), ("a-policy", "/x"), ("b-policy", "/x")]);
        assert_eq!(rules.find("/x").unwrap().policy(), "a-policy");
    }

    #[test]
    fn test_no_implicit_anchoring() {
        let rules = table(CacheHeadersConfig::default().with_rules("all-users", 600, &["/news/"]));
        assert!(rules.find("/en/news/today").is_some());

        let anchored = table(CacheHeadersConfig::default().with_rules("all-users", 600, &["^/news/"]));
        assert!(anchored.find("/en/news/today").is_none());
    }

    #[test]
    fn test_invalid_pattern_fails_fast() {
        let config = CacheHeadersConfig::default().with_rules("all-users", 600, &["^/a/(unclosed"]);
        let err = RuleTable::from_timeouts(&config.timeouts).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_invalid_ttl() {
        let mut config = CacheHeadersConfig::default();
        config
            .timeouts
            .entry("all-users".to_string())
            .or_default()
            .insert("ten".to_string(), vec!["^/".to_string()]);
        let err = RuleTable::from_timeouts(&config.timeouts).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTtl { .. }));
    }

    #[test]
    fn test_policies() {
        let rules = table(
            CacheHeadersConfig::default()
                .with_rules("per-user", 60, &["^/a/", "^/b/"])
                .with_rules("all-users", 600, &["^/c/"]),
        );
        assert_eq!(rules.policies(), vec!["all-users", "per-user"]);
    }
}
