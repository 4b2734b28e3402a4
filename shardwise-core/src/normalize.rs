// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test name normalization.
//!
//! Test names are hierarchical, e.g. `Namespace.Class.Method(arg1,arg2)`. Normalization strips the
//! parameter list to get a *deparameterized* key (`Namespace.Class.Method`), and walks up the
//! hierarchy one segment at a time to get *group* keys (`Namespace.Class`, then `Namespace`).
//!
//! All operations here are total: any string is a valid input.

use crate::errors::InvalidSeparatorsError;

/// The character that starts a parameter list.
const PARAMETER_START: char = '(';

/// Splits test names into hierarchy segments.
///
/// By default only `.` separates segments. TRX files written for nested .NET classes also use `+`
/// between the outer and inner class (`Namespace.Outer+Inner.Method`); enabling `+` as a separator
/// lets nested classes be coalesced on their own.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyNormalizer {
    separators: Vec<char>,
}

impl KeyNormalizer {
    /// The default set of separators.
    pub const DEFAULT_SEPARATORS: &'static str = ".";

    /// Creates a new normalizer with the given separators.
    ///
    /// Returns an error if no separators are given, or if `(` is one of them.
    pub fn new(separators: &str) -> Result<Self, InvalidSeparatorsError> {
        let mut chars: Vec<char> = separators.chars().collect();
        chars.sort_unstable();
        chars.dedup();

        if chars.is_empty() {
            return Err(InvalidSeparatorsError::new(separators, "no separators given"));
        }
        if chars.contains(&PARAMETER_START) {
            return Err(InvalidSeparatorsError::new(
                separators,
                "`(` starts a parameter list and can't be a separator",
            ));
        }

        Ok(Self { separators: chars })
    }

    /// Returns the separators in use, in sorted order.
    pub fn separators(&self) -> &[char] {
        &self.separators
    }

    /// Returns true if `c` separates hierarchy segments.
    #[inline]
    pub fn is_separator(&self, c: char) -> bool {
        self.separators.contains(&c)
    }

    /// Strips the parameter list from a test name.
    ///
    /// Everything from the first `(` onwards is removed. Names without a `(` are returned as-is.
    pub fn deparameterize<'a>(&self, key: &'a str) -> &'a str {
        match key.find(PARAMETER_START) {
            Some(index) => &key[..index],
            None => key,
        }
    }

    /// Returns the parent of `key` in the hierarchy.
    ///
    /// The last separator and everything after it are removed. A key without any separators is
    /// its own parent: callers must check for `up(key) == key` to avoid walking up forever.
    pub fn up<'a>(&self, key: &'a str) -> &'a str {
        match key.rfind(|c| self.is_separator(c)) {
            Some(index) => &key[..index],
            None => key,
        }
    }

    /// Returns true if `key` is `group` itself or lies within the subtree rooted at `group`.
    ///
    /// Matching is on segment boundaries, so `A.BC` is not within `A.B`.
    pub fn is_within(&self, key: &str, group: &str) -> bool {
        match key.strip_prefix(group) {
            Some(rest) => rest.chars().next().is_none_or(|c| self.is_separator(c)),
            None => false,
        }
    }
}

impl Default for KeyNormalizer {
    fn default() -> Self {
        Self {
            separators: vec!['.'],
        }
    }
}

/// Strips the parameter list from a test name, using the default normalizer.
pub fn deparameterize(key: &str) -> &str {
    KeyNormalizer::default().deparameterize(key)
}

/// Returns the parent of `key` in the hierarchy, using the default normalizer.
pub fn up(key: &str) -> &str {
    KeyNormalizer::default().up(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test_case("Ns.Class.Method", "Ns.Class.Method" ; "no parameters")]
    #[test_case("Ns.Class.Method(1,2)", "Ns.Class.Method" ; "parameters")]
    #[test_case("Ns.Class.Method(a.b(c))", "Ns.Class.Method" ; "nested parentheses and dots")]
    #[test_case("(x)", "" ; "only parameters")]
    #[test_case("", "" ; "empty")]
    fn deparameterize_cases(input: &str, expected: &str) {
        assert_eq!(deparameterize(input), expected);
    }

    #[test_case("A.B.C", "A.B" ; "three segments")]
    #[test_case("A.B", "A" ; "two segments")]
    #[test_case("A", "A" ; "root is its own parent")]
    #[test_case("A.", "A" ; "trailing separator")]
    #[test_case(".A", "" ; "leading separator")]
    #[test_case("", "" ; "empty")]
    fn up_cases(input: &str, expected: &str) {
        assert_eq!(up(input), expected);
    }

    #[test]
    fn nested_class_separator() {
        let normalizer = KeyNormalizer::new(".+").expect("separators are valid");
        assert_eq!(normalizer.separators(), &['+', '.']);
        assert_eq!(normalizer.up("Ns.Outer+Inner.Method"), "Ns.Outer+Inner");
        assert_eq!(normalizer.up("Ns.Outer+Inner"), "Ns.Outer");

        // The default normalizer treats `+` as part of the segment.
        assert_eq!(up("Ns.Outer+Inner"), "Ns");
    }

    #[test_case("A.B.C", "A.B", true ; "child")]
    #[test_case("A.B", "A.B", true ; "self")]
    #[test_case("A.B.C.D", "A", true ; "deep descendant")]
    #[test_case("A.BC", "A.B", false ; "sibling sharing a prefix")]
    #[test_case("A", "A.B", false ; "ancestor")]
    #[test_case(".A", "", true ; "empty root")]
    fn is_within_cases(key: &str, group: &str, expected: bool) {
        assert_eq!(KeyNormalizer::default().is_within(key, group), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case(".(" ; "parenthesis")]
    fn invalid_separators(input: &str) {
        KeyNormalizer::new(input).expect_err("separators are invalid");
    }

    #[proptest]
    fn deparameterize_is_idempotent(#[strategy("[a-c.+()]{0,12}")] key: String) {
        let once = deparameterize(&key);
        prop_assert!(!once.contains(PARAMETER_START));
        prop_assert!(key.starts_with(once));
        prop_assert_eq!(deparameterize(once), once);
    }

    #[proptest]
    fn up_walks_to_an_enclosing_group(#[strategy("[a-c.+]{0,12}")] key: String) {
        let normalizer = KeyNormalizer::new(".+").expect("separators are valid");
        let parent = normalizer.up(&key);

        prop_assert!(key.starts_with(parent));
        prop_assert!(normalizer.is_within(&key, parent));
        if key.contains(['.', '+']) {
            prop_assert!(parent.len() < key.len());
        } else {
            prop_assert_eq!(parent, key.as_str());
        }
    }
}
