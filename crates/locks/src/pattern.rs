// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of PlexSpaces.
//
// PlexSpaces is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// PlexSpaces is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with PlexSpaces. If not, see <https://www.gnu.org/licenses/>.

//! Glob patterns for key enumeration.
//!
//! Only `*` is a wildcard (any run of characters, including none). Every
//! other character is literal, including `?`, `%` and `_`, so each backend
//! escapes whatever its native pattern language treats specially.

use crate::{LockError, LockResult};

const WILDCARD: char = '*';

/// A validated `*` glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    raw: String,
}

impl GlobPattern {
    /// Validate a pattern.
    ///
    /// Empty patterns and patterns containing NUL are rejected with
    /// [`LockError::InvalidPattern`].
    pub fn parse(pattern: &str) -> LockResult<Self> {
        if pattern.is_empty() {
            return Err(LockError::InvalidPattern("empty pattern".to_string()));
        }
        if pattern.contains('\0') {
            return Err(LockError::InvalidPattern(format!(
                "pattern contains NUL: {:?}",
                pattern
            )));
        }
        Ok(Self {
            raw: pattern.to_string(),
        })
    }

    /// The pattern as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Case-insensitive match of `key` against the pattern.
    pub fn matches(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        let pattern = self.raw.to_lowercase();

        let segments: Vec<&str> = pattern.split(WILDCARD).collect();
        if segments.len() == 1 {
            return key == pattern;
        }

        let first = segments[0];
        let last = segments[segments.len() - 1];
        if key.len() < first.len() + last.len() || !key.starts_with(first) || !key.ends_with(last) {
            return false;
        }

        // Middle segments must appear in order between the anchored ends.
        let mut rest = &key[first.len()..key.len() - last.len()];
        for segment in &segments[1..segments.len() - 1] {
            match rest.find(segment) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }
        true
    }

    /// Translate to a SQL `LIKE` pattern using `\` as the escape character.
    pub fn to_sql_like(&self) -> String {
        let mut out = String::with_capacity(self.raw.len() + 4);
        for c in self.raw.chars() {
            match c {
                WILDCARD => out.push('%'),
                '%' | '_' | '\\' => {
                    out.push('\\');
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
        out
    }

    /// Translate to a Redis `MATCH` pattern.
    ///
    /// ASCII letters become `[xX]` classes since Redis matching is
    /// case-sensitive.
    pub fn to_redis_match(&self) -> String {
        let mut out = String::with_capacity(self.raw.len() * 2);
        for c in self.raw.chars() {
            match c {
                WILDCARD => out.push('*'),
                c if c.is_ascii_alphabetic() => {
                    out.push('[');
                    out.push(c.to_ascii_lowercase());
                    out.push(c.to_ascii_uppercase());
                    out.push(']');
                }
                _ => push_redis_literal(&mut out, c),
            }
        }
        out
    }
}

/// Escape `literal` so Redis `MATCH` treats every character verbatim.
pub fn escape_redis_literal(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        push_redis_literal(&mut out, c);
    }
    out
}

fn push_redis_literal(out: &mut String, c: char) {
    if matches!(c, '*' | '?' | '[' | ']' | '\\' | '^') {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(p: &str) -> GlobPattern {
        GlobPattern::parse(p).unwrap()
    }

    #[test]
    fn test_parse_rejects_empty_and_nul() {
        assert!(matches!(GlobPattern::parse(""), Err(LockError::InvalidPattern(_))));
        assert!(matches!(GlobPattern::parse("a\0b"), Err(LockError::InvalidPattern(_))));
        assert_eq!(glob("Test*").as_str(), "Test*");
    }

    #[test]
    fn test_matches_prefix_case_insensitive() {
        let p = glob("Test*");
        assert!(p.matches("Test1"));
        assert!(p.matches("test1"));
        assert!(p.matches("TEST"));
        assert!(!p.matches("abcde"));
        assert!(!p.matches("aTest"));
    }

    #[test]
    fn test_matches_infix_and_suffix() {
        let p = glob("*est*");
        assert!(p.matches("Test2"));
        assert!(p.matches("est"));
        assert!(!p.matches("abcde"));

        let p = glob("*:lease");
        assert!(p.matches("scheduler:LEASE"));
        assert!(!p.matches("scheduler:lease:1"));
    }

    #[test]
    fn test_matches_multiple_segments_in_order() {
        let p = glob("a*b*c");
        assert!(p.matches("abc"));
        assert!(p.matches("a-b-c"));
        assert!(p.matches("aXbYbZc"));
        assert!(!p.matches("acb"));
        // Anchors must not overlap.
        assert!(!glob("ab*ba").matches("aba"));
    }

    #[test]
    fn test_matches_without_wildcard_is_equality() {
        let p = glob("test1");
        assert!(p.matches("TEST1"));
        assert!(!p.matches("test10"));
    }

    #[test]
    fn test_other_glob_characters_are_literal() {
        let p = glob("a?c*");
        assert!(p.matches("a?cd"));
        assert!(!p.matches("abcd"));
    }

    #[test]
    fn test_to_sql_like_escapes_like_metacharacters() {
        assert_eq!(glob("Test*").to_sql_like(), "Test%");
        assert_eq!(glob("*a_b%c\\*").to_sql_like(), "%a\\_b\\%c\\\\%");
    }

    #[test]
    fn test_to_redis_match() {
        assert_eq!(glob("Te1*").to_redis_match(), "[tT][eE]1*");
        assert_eq!(glob("a?[").to_redis_match(), "[aA]\\?\\[");
        assert_eq!(escape_redis_literal("app*:"), "app\\*:");
    }
}
