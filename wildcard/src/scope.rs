use crate::{PermissionParseError, WildcardPermission};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The permission scope carried by an access token.
///
/// An ordered, set-semantics collection of permission strings. Membership,
/// not order, carries meaning for matching; the insertion order is only kept
/// so a scope renders the way it was declared. An empty scope means "no
/// restriction": the token carries the subject's full authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope {
    entries: Vec<String>,
}

impl Scope {
    /// The unrestricted scope.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a scope from permission strings, dropping duplicates while
    /// keeping first-seen order.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if !entries.contains(&value) {
                entries.push(value);
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.iter().any(|entry| entry == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Parses every entry into a [`WildcardPermission`].
    pub fn permissions(&self) -> Result<Vec<WildcardPermission>, PermissionParseError> {
        self.entries
            .iter()
            .map(|entry| WildcardPermission::parse(entry))
            .collect()
    }

    /// Limits a single subject permission against this scope: the set of all
    /// non-empty [`WildcardPermission::limit`] results. Scope entries without
    /// a match simply drop out; an empty scope imposes no restriction.
    pub fn limit(
        &self,
        permission: &WildcardPermission,
    ) -> Result<Vec<WildcardPermission>, PermissionParseError> {
        if self.is_empty() {
            return Ok(vec![permission.clone()]);
        }
        let mut limited = Vec::new();
        for entry in self.permissions()? {
            if let Some(result) = permission.limit(&entry) {
                if !limited.contains(&result) {
                    limited.push(result);
                }
            }
        }
        Ok(limited)
    }
}

impl<S: Into<String>> FromIterator<S> for Scope {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\"", entry)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduplicates_and_keeps_order() {
        let scope = Scope::new(["repository:read:42", "user:list", "repository:read:42"]);
        assert_eq!(scope.len(), 2);
        assert_eq!(
            scope.iter().collect::<Vec<_>>(),
            vec!["repository:read:42", "user:list"]
        );
    }

    #[test]
    fn test_display() {
        let scope = Scope::new(["repo:*"]);
        assert_eq!(scope.to_string(), "[\"repo:*\"]");
        assert_eq!(Scope::empty().to_string(), "[]");
    }

    #[test]
    fn test_empty_scope_imposes_no_restriction() {
        let permission = WildcardPermission::parse("repository:read,write:42").unwrap();
        let limited = Scope::empty().limit(&permission).unwrap();
        assert_eq!(limited, vec![permission]);
    }

    #[test]
    fn test_limit_drops_entries_without_match() {
        let permission = WildcardPermission::parse("repository:read,write:42").unwrap();
        let scope = Scope::new(["repository:*:42", "repository:read:99", "user:*:*"]);
        let limited = scope.limit(&permission).unwrap();
        assert_eq!(
            limited,
            vec![WildcardPermission::parse("repository:read,write:42").unwrap()]
        );
    }

    #[test]
    fn test_serde_transparent() {
        let scope = Scope::new(["repository:read:42"]);
        let json = serde_json::to_string(&scope).expect("should serialize");
        assert_eq!(json, "[\"repository:read:42\"]");
        let parsed: Scope = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, scope);
    }
}
