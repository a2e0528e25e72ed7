//! Rule path patterns.
//!
//! A rule path is a dotted pattern matched against change paths:
//!
//! - `a.b` matches `a.b` and everything below it (`a.b.c`, ...);
//! - `a.b!` matches `a.b` only;
//! - `*` matches any single segment;
//! - `{x, y}` matches either `x` or `y`;
//! - a leading `@` marks the anchor: the event is attributed to the change
//!   at that segment instead of the leaf that matched. `@`, `@*` are
//!   anchored wildcards and `@name` is an anchor matching only `name`.
//!
//! Spaces are removed when the pattern is compiled. Compiling never fails;
//! [`RulePath::validate`] reports malformed patterns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Divides a rule path into segments.
pub const PATH_SEPARATOR: char = '.';

/// Restricts a rule path to change paths of the same length.
pub const PATH_TERMINATOR: char = '!';

pub const OPTION_PREFIX: char = '{';
pub const OPTION_SUFFIX: char = '}';
pub const OPTION_SEPARATOR: char = ',';
pub const WILDCARD: char = '*';
pub const ANCHOR: char = '@';

/// Segments that match any change path segment.
const WILDCARDS: [&str; 3] = ["*", "@", "@*"];

// ---------------------------------------------------------------------------
// RulePathSegment
// ---------------------------------------------------------------------------

/// One segment of a [`RulePath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RulePathSegment {
    raw: String,
    options: Vec<String>,
    is_anchor: bool,
    is_wildcard: bool,
}

impl RulePathSegment {
    pub fn new(raw: &str) -> Self {
        let is_anchor = raw.starts_with(ANCHOR);

        if WILDCARDS.contains(&raw) {
            return Self {
                raw: raw.to_string(),
                options: Vec::new(),
                is_anchor,
                is_wildcard: true,
            };
        }

        let rest = raw.strip_prefix(ANCHOR).unwrap_or(raw);

        let mut options: Vec<String> = match rest
            .strip_prefix(OPTION_PREFIX)
            .and_then(|r| r.strip_suffix(OPTION_SUFFIX))
        {
            Some(block) => block
                .trim()
                .split(OPTION_SEPARATOR)
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };

        // `@name` is an anchor restricted to a single option.
        if is_anchor && options.is_empty() {
            options.push(rest.to_string());
        }

        Self {
            raw: raw.to_string(),
            options,
            is_anchor,
            is_wildcard: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_anchor(&self) -> bool {
        self.is_anchor
    }

    pub fn is_wildcard(&self) -> bool {
        self.is_wildcard
    }

    pub fn contains_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Returns `true` if the change path segment is matched literally, by a
    /// wildcard, or by one of the options.
    pub fn matches(&self, part: &str) -> bool {
        self.raw == part || self.is_wildcard || self.contains_option(part)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let s = self.raw.as_str();
        let fail = |reason: String| Err(ValidationError::segment(s, reason));

        if s.is_empty() {
            return fail("segment must not be empty".into());
        }

        // The terminator is stripped when the path is compiled.
        if s.contains(PATH_TERMINATOR) {
            return fail(format!(
                "path terminator {:?} is only allowed at the end of last segment",
                PATH_TERMINATOR.to_string()
            ));
        }

        if (s.contains(ANCHOR) && !self.is_anchor) || s.matches(ANCHOR).count() > 1 {
            return fail(format!(
                "only a single anchor {:?} is allowed, and it must be at start",
                ANCHOR.to_string()
            ));
        }

        if s.contains(WILDCARD) && !self.is_wildcard {
            return fail(format!(
                "wildcard {:?} can only be prefixed with an anchor {:?}",
                WILDCARD.to_string(),
                ANCHOR.to_string()
            ));
        }

        if s.matches(OPTION_PREFIX).count() > 1 {
            return fail(format!(
                "multiple option prefixes {:?} are not allowed",
                OPTION_PREFIX.to_string()
            ));
        }

        if s.matches(OPTION_SUFFIX).count() > 1 {
            return fail(format!(
                "multiple option suffixes {:?} are not allowed",
                OPTION_SUFFIX.to_string()
            ));
        }

        match (s.find(OPTION_PREFIX), s.rfind(OPTION_SUFFIX)) {
            (None, Some(_)) => fail(format!(
                "option prefix {:?} is missing",
                OPTION_PREFIX.to_string()
            )),
            (Some(_), None) => fail(format!(
                "option suffix {:?} is missing",
                OPTION_SUFFIX.to_string()
            )),
            (Some(prefix), Some(suffix)) if prefix > suffix => fail(format!(
                "option prefix {:?} must precede its suffix {:?}",
                OPTION_PREFIX.to_string(),
                OPTION_SUFFIX.to_string()
            )),
            (Some(_), Some(_)) => {
                if !s.ends_with(OPTION_SUFFIX) {
                    return fail(format!(
                        "option suffix {:?} must terminate the segment",
                        OPTION_SUFFIX.to_string()
                    ));
                }
                if self.options.iter().any(String::is_empty) {
                    return fail("options must not be empty".into());
                }
                Ok(())
            }
            (None, None) if s.contains(OPTION_SEPARATOR) => fail(format!(
                "separator {:?} is only allowed inside an option block",
                OPTION_SEPARATOR.to_string()
            )),
            (None, None) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// RulePath
// ---------------------------------------------------------------------------

/// A compiled rule path pattern.
///
/// Serializes as its pattern string, including the trailing `!` of an exact
/// path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RulePath {
    path: String,
    segments: Vec<RulePathSegment>,
    wildcard_count: usize,
    anchor_count: usize,
    is_exact: bool,
}

impl RulePath {
    pub fn new(pattern: &str) -> Self {
        let mut path: String = pattern.chars().filter(|c| *c != ' ').collect();

        let is_exact = path.ends_with(PATH_TERMINATOR);
        if is_exact {
            path.pop();
        }

        let segments: Vec<RulePathSegment> =
            path.split(PATH_SEPARATOR).map(RulePathSegment::new).collect();

        Self {
            wildcard_count: segments.iter().filter(|s| s.is_wildcard()).count(),
            anchor_count: segments.iter().filter(|s| s.is_anchor()).count(),
            path,
            segments,
            is_exact,
        }
    }

    /// The pattern without spaces and without the terminator.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &[RulePathSegment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn wildcard_count(&self) -> usize {
        self.wildcard_count
    }

    pub fn anchor_count(&self) -> usize {
        self.anchor_count
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor_count > 0
    }

    /// The path was terminated with `!`.
    pub fn is_exact(&self) -> bool {
        self.is_exact
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.is_empty() {
            return Err(ValidationError::path(&self.path, "path must not be empty"));
        }

        if self.anchor_count > 1 {
            return Err(ValidationError::path(
                &self.path,
                format!(
                    "only one anchor {:?} is allowed in a rule path",
                    ANCHOR.to_string()
                ),
            ));
        }

        for segment in &self.segments {
            segment
                .validate()
                .map_err(|e| ValidationError::path(&self.path, e))?;
        }

        Ok(())
    }

    /// Returns `true` if every segment matches the corresponding segment of
    /// the change path. Longer change paths match unless the path is exact.
    pub fn matches(&self, change_path: &str) -> bool {
        let parts: Vec<&str> = change_path.split(PATH_SEPARATOR).collect();

        if parts.len() < self.len() {
            return false;
        }

        if self.is_exact && parts.len() != self.len() {
            return false;
        }

        self.segments.iter().zip(&parts).all(|(s, p)| s.matches(p))
    }

    /// The prefix of the change path up to and including the segment matched
    /// by the anchor. Without an anchor match the change path is returned
    /// unchanged.
    ///
    /// ```
    /// use keel_event::RulePath;
    ///
    /// assert_eq!(RulePath::new("a.@").find_anchor_path("a.b.c"), "a.b");
    /// assert_eq!(RulePath::new("a.b").find_anchor_path("a.b.c"), "a.b.c");
    /// ```
    pub fn find_anchor_path(&self, change_path: &str) -> String {
        let parts: Vec<&str> = change_path.split(PATH_SEPARATOR).collect();

        if parts.len() < self.len() {
            return change_path.to_string();
        }

        for (i, segment) in self.segments.iter().enumerate() {
            if segment.is_anchor() && (segment.is_wildcard() || segment.contains_option(parts[i])) {
                return parts[..=i].join(&PATH_SEPARATOR.to_string());
            }
        }

        change_path.to_string()
    }
}

impl fmt::Display for RulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if self.is_exact {
            write!(f, "{PATH_TERMINATOR}")?;
        }
        Ok(())
    }
}

impl Default for RulePath {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for RulePath {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for RulePath {
    fn from(pattern: String) -> Self {
        Self::new(&pattern)
    }
}

impl From<RulePath> for String {
    fn from(path: RulePath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_paths() {
        let paths = [
            "a",
            " a ",
            "{a,b}",
            "@*",
            "@ a",
            "@{a,b}",
            "a.@.b.*",
            "a!",
            " @ { a , b } . * ! ",
        ];

        for p in paths {
            assert!(RulePath::new(p).validate().is_ok(), "{p:?} should be valid");
        }
    }

    #[test]
    fn invalid_paths() {
        let paths = [
            "", ",", ".", "!", "{", "}", "}{", "{}", "{ }", "{,}", "{!}", "{@}", "{*}", "{{}",
            "{}}", "{{}}", "{a.b}", "@.@", "@@", "**", "*@", "*a", "a.", "*{a}", "@*a", "@*{a}",
            "a!!", "a!.b",
        ];

        for p in paths {
            assert!(RulePath::new(p).validate().is_err(), "{p:?} should be invalid");
        }
    }

    #[test]
    fn validation_messages_name_the_culprit() {
        let err = RulePath::new("").validate().unwrap_err();
        assert_eq!(err.message(), r#"rule path "": path must not be empty"#);

        let err = RulePath::new("@.@").validate().unwrap_err();
        assert_eq!(err.message(), r#"rule path "@.@": only one anchor "@" is allowed in a rule path"#);

        let err = RulePath::new("a.{b").validate().unwrap_err();
        assert_eq!(
            err.message(),
            r#"rule path "a.{b": rule path segment "{b": option suffix "}" is missing"#
        );

        let err = RulePath::new("a,b").validate().unwrap_err();
        assert!(err.message().ends_with(r#"separator "," is only allowed inside an option block"#));

        let err = RulePath::new("{}").validate().unwrap_err();
        assert!(err.message().ends_with("options must not be empty"));
    }

    #[test]
    fn compiles_metadata() {
        let p = RulePath::new(" @ { a , b } . * ! ");
        assert_eq!(p.as_str(), "@{a,b}.*");
        assert_eq!(p.to_string(), "@{a,b}.*!");
        assert_eq!(p.len(), 2);
        assert_eq!(p.wildcard_count(), 1);
        assert_eq!(p.anchor_count(), 1);
        assert!(p.is_anchored());
        assert!(p.is_exact());

        let seg = &p.segments()[0];
        assert!(seg.is_anchor());
        assert!(!seg.is_wildcard());
        assert_eq!(seg.options(), ["a", "b"]);
    }

    #[test]
    fn anchor_with_name_is_a_single_option() {
        let seg = RulePathSegment::new("@node");
        assert!(seg.is_anchor());
        assert!(!seg.is_wildcard());
        assert_eq!(seg.options(), ["node"]);

        let seg = RulePathSegment::new("@*");
        assert!(seg.is_anchor() && seg.is_wildcard());
        assert!(seg.options().is_empty());
    }

    #[test]
    fn matching() {
        let cases = [
            ("a", "a", true),
            ("a", "a.b.c", true),
            ("a", "b", false),
            ("a.b", "a", false),
            ("a!", "a", true),
            ("a!", "a.b", false),
            ("*", "x.y", true),
            ("*!", "x.y", false),
            ("a.*.c", "a.b.c", true),
            ("a.*.c", "a.b.d", false),
            ("a.{b, c}", "a.c.d", true),
            ("a.{b, c}", "a.d", false),
            ("@", "x", true),
            ("a.@b", "a.b", true),
            ("a.@b", "a.c", false),
            ("@{x, y}.z", "y.z", true),
        ];

        for (pattern, path, expect) in cases {
            assert_eq!(
                RulePath::new(pattern).matches(path),
                expect,
                "{pattern:?} against {path:?}"
            );
        }
    }

    #[test]
    fn anchor_paths() {
        let cases = [
            ("a.@", "a.b.c", "a.b"),
            ("@", "a.b.c", "a"),
            ("a.@*.c", "a.b.c", "a.b"),
            ("a.@{b, x}", "a.b.c", "a.b"),
            ("a.@x", "a.b.c", "a.b.c"),
            ("a.b", "a.b.c", "a.b.c"),
            ("a.b.c.@", "a.b", "a.b"),
        ];

        for (pattern, path, expect) in cases {
            assert_eq!(RulePath::new(pattern).find_anchor_path(path), expect, "{pattern:?} on {path:?}");
        }
    }

    #[test]
    fn serializes_as_pattern_string() {
        let p = RulePath::new("cluster.nodes.{master, worker}.instances.@!");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#""cluster.nodes.{master,worker}.instances.@!""#);

        let back: RulePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    proptest! {
        #[test]
        fn literal_paths_match_themselves_and_descendants(
            parts in prop::collection::vec("[a-z]{1,5}", 1..5),
            extra in "[a-z]{1,5}",
        ) {
            let path = parts.join(".");
            let rule = RulePath::new(&path);

            let longer = format!("{}.{}", path, extra);

            prop_assert!(rule.validate().is_ok());
            prop_assert!(rule.matches(&path));
            prop_assert!(rule.matches(&longer));

            let exact = RulePath::new(&format!("{path}!"));
            prop_assert!(exact.matches(&path));
            prop_assert!(!exact.matches(&longer));
        }

        #[test]
        fn anchor_path_is_a_prefix_of_the_change_path(
            parts in prop::collection::vec("[a-z]{1,5}", 1..6),
            anchor in 0usize..6,
        ) {
            let mut segments: Vec<String> = vec!["*".to_string(); parts.len()];
            let anchor = anchor.min(parts.len() - 1);
            segments[anchor] = "@".to_string();

            let rule = RulePath::new(&segments.join("."));
            let change_path = parts.join(".");
            let anchored = rule.find_anchor_path(&change_path);

            prop_assert_eq!(anchored, parts[..=anchor].join("."));
        }
    }
}
