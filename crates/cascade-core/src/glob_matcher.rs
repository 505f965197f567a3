//! Glob matching for override `files` / `excludedFiles` and `ignorePatterns`
//!
//! Patterns and candidate paths are both normalized to forward slashes with
//! any leading `./` removed. A pattern without a `/` matches the file name at
//! any depth (`*.tsx` behaves like `**/*.tsx`).

use crate::error::CascadeError;
use crate::result::Result;
use glob::{MatchOptions, Pattern};
use std::path::Path;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Normalize a path for matching: forward slashes, no leading `./`
pub fn normalize_path(path: &Path) -> String {
    normalize_str(&path.to_string_lossy())
}

fn normalize_str(raw: &str) -> String {
    let mut normalized = raw.replace('\\', "/");
    while let Some(stripped) = normalized.strip_prefix("./") {
        normalized = stripped.to_string();
    }
    normalized
}

/// A single compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    pattern: Pattern,
    basename_only: bool,
}

impl GlobPattern {
    /// Compile a pattern, failing with `MalformedGlobPattern`
    pub fn new(raw: &str) -> Result<Self> {
        let normalized = normalize_str(raw.trim());
        // `dist/` names a directory; matched the same way as `dist`
        let normalized = normalized.trim_end_matches('/').to_string();
        if normalized.is_empty() {
            return Err(CascadeError::malformed_glob(raw, "empty pattern"));
        }

        let pattern = Pattern::new(&normalized)
            .map_err(|e| CascadeError::malformed_glob(raw, e.msg.to_string()))?;

        Ok(Self {
            basename_only: !normalized.contains('/'),
            source: raw.to_string(),
            pattern,
        })
    }

    /// The pattern as written in the document
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match an already-normalized path
    pub fn matches(&self, path: &str) -> bool {
        if self.basename_only {
            let name = path.rsplit('/').next().unwrap_or(path);
            self.pattern.matches_with(name, MATCH_OPTIONS)
        } else {
            self.pattern.matches_with(path, MATCH_OPTIONS)
        }
    }
}

/// A pattern that failed to compile, kept so the failure can be reported
/// to exactly the files it concerns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedPattern {
    pub pattern: String,
    pub reason: String,
}

/// An ordered set of patterns (any-match semantics)
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<GlobPattern>,
    malformed: Vec<MalformedPattern>,
}

impl PatternSet {
    /// Compile every pattern, failing on the first malformed one
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| GlobPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            malformed: Vec::new(),
        })
    }

    /// Compile every pattern, setting malformed ones aside instead of failing
    pub fn compile_lenient<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut set = Self::default();
        for raw in patterns {
            match GlobPattern::new(raw.as_ref()) {
                Ok(pattern) => set.patterns.push(pattern),
                Err(CascadeError::MalformedGlobPattern {
                    pattern, reason, ..
                }) => set.malformed.push(MalformedPattern { pattern, reason }),
                Err(other) => set.malformed.push(MalformedPattern {
                    pattern: raw.as_ref().to_string(),
                    reason: other.to_string(),
                }),
            }
        }
        set
    }

    /// True when at least one valid pattern matches the normalized path
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    /// True when the set holds no valid pattern
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn malformed(&self) -> &[MalformedPattern] {
        &self.malformed
    }

    pub fn has_malformed(&self) -> bool {
        !self.malformed.is_empty()
    }

    /// The first malformed pattern as an error
    pub fn malformed_error(&self) -> Option<CascadeError> {
        self.malformed
            .first()
            .map(|m| CascadeError::malformed_glob(&m.pattern, &m.reason))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(GlobPattern::as_str)
    }

    /// True when the path or any of its ancestor directories matches
    pub fn matches_path_or_ancestor(&self, path: &str) -> bool {
        path.match_indices('/')
            .any(|(index, _)| index > 0 && self.matches(&path[..index]))
            || self.matches(path)
    }
}

impl FromIterator<GlobPattern> for PatternSet {
    fn from_iter<I: IntoIterator<Item = GlobPattern>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
            malformed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("./src/App.tsx")), "src/App.tsx");
        assert_eq!(normalize_str(".\\src\\App.tsx"), "src/App.tsx");
        assert_eq!(normalize_str("src/./x.ts"), "src/./x.ts");
    }

    #[test]
    fn test_recursive_wildcard() {
        let pattern = GlobPattern::new("**/*.tsx").unwrap();
        assert!(pattern.matches("src/App.tsx"));
        assert!(pattern.matches("src/components/deep/Button.tsx"));
        assert!(!pattern.matches("src/util.ts"));
    }

    #[test]
    fn test_leading_dot_slash_is_ignored() {
        let pattern = GlobPattern::new("./src/**/page.tsx").unwrap();
        assert!(pattern.matches("src/app/page.tsx"));
        assert!(pattern.matches("src/app/blog/page.tsx"));
        assert!(!pattern.matches("lib/app/page.tsx"));
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let pattern = GlobPattern::new("src/*.ts").unwrap();
        assert!(pattern.matches("src/index.ts"));
        assert!(!pattern.matches("src/nested/index.ts"));
    }

    #[test]
    fn test_slashless_pattern_matches_basename() {
        let pattern = GlobPattern::new("*.test.ts").unwrap();
        assert!(pattern.matches("src/a/b/util.test.ts"));
        assert!(pattern.matches("util.test.ts"));
        assert!(!pattern.matches("src/util.ts"));
    }

    #[test]
    fn test_malformed_pattern() {
        let err = GlobPattern::new("src/[bad.ts").unwrap_err();
        assert!(matches!(err, CascadeError::MalformedGlobPattern { .. }));

        let err = GlobPattern::new("   ").unwrap_err();
        assert!(matches!(err, CascadeError::MalformedGlobPattern { .. }));
    }

    #[test]
    fn test_lenient_set_keeps_valid_patterns() {
        let set = PatternSet::compile_lenient(&["**/*.ts", "src/[bad"]);
        assert!(set.matches("src/a.ts"));
        assert!(set.has_malformed());
        assert_eq!(set.malformed()[0].pattern, "src/[bad");

        assert!(PatternSet::compile(&["**/*.ts", "src/[bad"]).is_err());
    }

    #[test]
    fn test_directory_patterns_cover_descendants() {
        let set = PatternSet::compile(&["node_modules/", "build/generated"]).unwrap();
        assert!(set.matches_path_or_ancestor("node_modules/react/index.js"));
        assert!(set.matches_path_or_ancestor("packages/app/node_modules/x.js"));
        assert!(set.matches_path_or_ancestor("build/generated/api.ts"));
        assert!(!set.matches_path_or_ancestor("src/build.ts"));
    }
}
