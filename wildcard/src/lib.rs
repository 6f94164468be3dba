//! Wildcard permission matching and scope intersection.
//!
//! A permission is a colon-delimited sequence of parts, each part a
//! comma-delimited set of tokens (`repository:read,write:42`). A lone `*`
//! token matches anything at its position and beyond, and missing trailing
//! parts are implicit wildcards. [`WildcardPermission::limit`] computes the
//! most specific permission implied by both operands, which is how a token
//! [`Scope`] narrows a subject's full authorization down to an effective
//! permission set.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod scope;

pub use scope::Scope;

/// Token that matches anything at its position and beyond.
pub const WILDCARD_TOKEN: &str = "*";

const PART_DIVIDER: char = ':';
const SUBPART_DIVIDER: char = ',';

/// Errors that can occur while parsing a permission string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionParseError {
    #[error("permission string must not be empty")]
    Empty,
    #[error("permission \"{0}\" contains an empty part")]
    EmptyPart(String),
    #[error("permission \"{0}\" contains an empty token")]
    EmptyToken(String),
}

/// A single colon-delimited part: a set of tokens with insertion order
/// preserved for display.
#[derive(Debug, Clone)]
struct Part {
    tokens: Vec<String>,
}

// equality and hashing are over the token set, not the display order
impl PartialEq for Part {
    fn eq(&self, other: &Self) -> bool {
        self.same_tokens(other)
    }
}

impl Eq for Part {}

impl std::hash::Hash for Part {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        let mut sorted: Vec<&String> = self.tokens.iter().collect();
        sorted.sort();
        for token in sorted {
            token.hash(state);
        }
    }
}

impl Part {
    fn wildcard() -> Self {
        Self {
            tokens: vec![WILDCARD_TOKEN.to_string()],
        }
    }

    fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    fn contains_all(&self, other: &Part) -> bool {
        other.tokens.iter().all(|t| self.contains(t))
    }

    fn is_wildcard(&self) -> bool {
        self.contains(WILDCARD_TOKEN)
    }

    /// Set equality, ignoring token order.
    fn same_tokens(&self, other: &Part) -> bool {
        self.tokens.len() == other.tokens.len() && self.contains_all(other)
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(","))
    }
}

/// A parsed wildcard permission.
///
/// Matching is case-sensitive. Tokens within a part are deduplicated and
/// keep their insertion order, so `Display` reproduces the source form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WildcardPermission {
    parts: Vec<Part>,
}

impl WildcardPermission {
    /// Parses a permission string like `repository:read,write:42`.
    pub fn parse(value: &str) -> Result<Self, PermissionParseError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PermissionParseError::Empty);
        }

        let mut parts = Vec::new();
        for raw_part in trimmed.split(PART_DIVIDER) {
            let mut tokens: Vec<String> = Vec::new();
            for raw_token in raw_part.split(SUBPART_DIVIDER) {
                let token = raw_token.trim();
                if token.is_empty() {
                    if raw_part.trim().is_empty() {
                        return Err(PermissionParseError::EmptyPart(trimmed.to_string()));
                    }
                    return Err(PermissionParseError::EmptyToken(trimmed.to_string()));
                }
                if !tokens.iter().any(|t| t == token) {
                    tokens.push(token.to_string());
                }
            }
            parts.push(Part { tokens });
        }

        Ok(Self { parts })
    }

    /// Returns true if this permission implies the other, i.e. the other is
    /// at least as specific as this one.
    pub fn implies(&self, other: &WildcardPermission) -> bool {
        let mut index = 0;
        for other_part in &other.parts {
            match self.parts.get(index) {
                // this permission ran out of parts, missing parts imply
                // anything beyond
                None => return true,
                Some(part) => {
                    if !part.is_wildcard() && !part.contains_all(other_part) {
                        return false;
                    }
                }
            }
            index += 1;
        }

        // remaining parts of this permission only imply if they are wildcards
        self.parts[index..].iter().all(Part::is_wildcard)
    }

    /// Computes the most specific permission implied by both operands.
    ///
    /// Returns `None` if the operands do not overlap: differing leading type
    /// parts never match, and any position whose token intersection becomes
    /// empty drops the whole result. This is an intersection, never a union.
    pub fn limit(&self, other: &WildcardPermission) -> Option<WildcardPermission> {
        if self.implies(other) {
            return Some(other.clone());
        }
        if other.implies(self) {
            return Some(self.clone());
        }

        // a permission for one type cannot be limited against another
        if !self.parts[0].same_tokens(&other.parts[0]) {
            return None;
        }

        let mut parts = vec![self.parts[0].clone()];
        let len = self.parts.len().max(other.parts.len());
        for index in 1..len {
            let merged = match (self.parts.get(index), other.parts.get(index)) {
                (Some(mine), Some(theirs)) => {
                    if mine.is_wildcard() {
                        theirs.clone()
                    } else if theirs.is_wildcard() {
                        mine.clone()
                    } else {
                        let tokens: Vec<String> = mine
                            .tokens
                            .iter()
                            .filter(|token| theirs.contains(token))
                            .cloned()
                            .collect();
                        if tokens.is_empty() {
                            return None;
                        }
                        Part { tokens }
                    }
                }
                // the missing side imposes no restriction
                (Some(part), None) | (None, Some(part)) => part.clone(),
                (None, None) => Part::wildcard(),
            };
            parts.push(merged);
        }

        Some(WildcardPermission { parts })
    }
}

impl fmt::Display for WildcardPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                write!(f, "{}", PART_DIVIDER)?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for WildcardPermission {
    type Err = PermissionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for WildcardPermission {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WildcardPermission {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
