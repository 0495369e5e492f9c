//! File visibility filters.
//!
//! Every rule of every active filter must accept a path for it to stay
//! visible. Filters are not alternatives: adding a second filter can only
//! hide more files, never bring hidden ones back.

use crate::domain::error::ValidationError;
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Include,
    Exclude,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            FilterKind::Include => "include",
            FilterKind::Exclude => "exclude",
        };
        write!(f, "{value}")
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "include" => Ok(FilterKind::Include),
            "exclude" => Ok(FilterKind::Exclude),
            other => Err(format!("invalid filter rule type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub kind: FilterKind,
    pub pattern: String,
    /// Insertion position, for display only. Evaluation follows list order.
    pub order: usize,
}

impl FilterRule {
    pub fn include(pattern: impl Into<String>, order: usize) -> Self {
        Self {
            kind: FilterKind::Include,
            pattern: pattern.into(),
            order,
        }
    }

    pub fn exclude(pattern: impl Into<String>, order: usize) -> Self {
        Self {
            kind: FilterKind::Exclude,
            pattern: pattern.into(),
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub description: String,
    pub rules: Vec<FilterRule>,
}

impl Filter {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            rules: Vec::new(),
        }
    }

    /// Builds a filter from CLI-style pattern lists: excludes first, then includes.
    pub fn from_patterns(
        name: impl Into<String>,
        description: impl Into<String>,
        exclude: &[String],
        include: &[String],
    ) -> Self {
        let mut filter = Self::new(name, description);
        for pattern in exclude {
            filter.push_rule(FilterKind::Exclude, pattern.clone());
        }
        for pattern in include {
            filter.push_rule(FilterKind::Include, pattern.clone());
        }
        filter
    }

    pub fn push_rule(&mut self, kind: FilterKind, pattern: impl Into<String>) {
        let order = self.rules.len();
        self.rules.push(FilterRule {
            kind,
            pattern: pattern.into(),
            order,
        });
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingFilterName);
        }
        if self.rules.is_empty() || self.rules.iter().any(|r| r.pattern.trim().is_empty()) {
            return Err(ValidationError::MissingPattern(self.name.clone()));
        }
        Ok(())
    }
}

/// A glob pattern compiled once, or the raw text when it is not a valid glob.
#[derive(Debug, Clone)]
pub enum PathPattern {
    Glob(GlobMatcher),
    Substring(String),
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Self {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => PathPattern::Glob(glob.compile_matcher()),
            Err(err) => {
                log::debug!("invalid glob '{pattern}', matching as substring: {err}");
                PathPattern::Substring(pattern.to_string())
            }
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        match self {
            PathPattern::Glob(matcher) => matcher.is_match(path),
            PathPattern::Substring(needle) => path.contains(needle.as_str()),
        }
    }
}

/// Glob match with substring fallback for malformed patterns.
pub fn matches_pattern(path: &str, pattern: &str) -> bool {
    PathPattern::compile(pattern).is_match(path)
}

/// The flattened, compiled rules of a list of filters, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    rules: Vec<(FilterKind, PathPattern)>,
}

impl FilterSet {
    pub fn new<'a>(filters: impl IntoIterator<Item = &'a Filter>) -> Self {
        let rules = filters
            .into_iter()
            .flat_map(|filter| filter.rules.iter())
            .map(|rule| (rule.kind, PathPattern::compile(&rule.pattern)))
            .collect();
        Self { rules }
    }

    /// True unless some rule rejects the path. The first rejecting rule ends
    /// evaluation.
    pub fn passes(&self, path: &str) -> bool {
        for (kind, pattern) in &self.rules {
            let matched = pattern.is_match(path);
            match kind {
                FilterKind::Exclude if matched => return false,
                FilterKind::Include if !matched => return false,
                _ => {}
            }
        }
        true
    }
}

/// Outcome of previewing one filter against the changed files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterTestResult {
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
}
