//! Include/exclude glob filtering.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;

use super::PathFilter;

/// Errors that can occur when compiling a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A pattern is not valid glob syntax.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },
}

/// Filter configuration: two lists of glob patterns.
///
/// An empty `include` list includes everything; an empty `exclude` list
/// excludes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl FilterConfig {
    /// Whether this config has no patterns at all.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// A compiled include/exclude filter.
///
/// Patterns are matched case-sensitively against the whole relative path.
/// `*`, `?` and `[...]` never match `/`, so a pattern only reaches deeper
/// levels through explicit separators or `**`.
#[derive(Debug, Clone)]
pub struct IncludeExcludeFilter {
    include: GlobSet,
    has_include: bool,
    exclude: GlobSet,
}

impl IncludeExcludeFilter {
    /// Compile include and exclude pattern lists.
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self, FilterError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let (include, include_count) = build_glob_set(include)?;
        let (exclude, _) = build_glob_set(exclude)?;
        Ok(Self {
            include,
            has_include: include_count > 0,
            exclude,
        })
    }

    /// Compile a filter from its configuration.
    pub fn from_config(config: &FilterConfig) -> Result<Self, FilterError> {
        Self::new(&config.include, &config.exclude)
    }

    /// A filter that matches every path.
    pub fn match_all() -> Self {
        Self {
            include: GlobSet::empty(),
            has_include: false,
            exclude: GlobSet::empty(),
        }
    }
}

impl PathFilter for IncludeExcludeFilter {
    fn matches(&self, relative_path: &str) -> bool {
        // Exclude wins regardless of include.
        if self.exclude.is_match(relative_path) {
            return false;
        }
        if self.has_include && !self.include.is_match(relative_path) {
            return false;
        }
        true
    }
}

fn build_glob_set<P>(patterns: P) -> Result<(GlobSet, usize), FilterError>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    let mut count = 0;
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map_err(|source| FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
        count += 1;
    }
    let set = builder
        .build()
        .map_err(|source| FilterError::InvalidPattern {
            pattern: "<set>".to_string(),
            source,
        })?;
    Ok((set, count))
}
