//! Cache tags.
//!
//! Queries *provide* tags for the data they hold; mutations *invalidate* tags.
//! Any query providing a tag hit by an invalidation is stale.

use serde::{Deserialize, Serialize};

/// A label attached to cached data, optionally narrowed to one record.
///
/// # Example
///
/// ```
/// use todo_query_cache::Tag;
///
/// let list = Tag::kind("Todos");
/// let one = Tag::with_id("Todos", 3);
///
/// // Invalidating the whole kind hits specific rows too.
/// assert!(list.invalidates(&one));
/// // Invalidating one row hits the list-wide tag.
/// assert!(one.invalidates(&list));
/// assert!(!one.invalidates(&Tag::with_id("Todos", 4)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    /// Tag type, one of the api's declared tag types
    pub kind: String,
    /// Record id, or `None` for the whole kind
    pub id: Option<String>,
}

impl Tag {
    /// A kind-wide tag
    #[must_use]
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// A tag for one record of a kind
    #[must_use]
    pub fn with_id(kind: impl Into<String>, id: impl ToString) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.to_string()),
        }
    }

    /// Whether invalidating `self` makes data providing `provided` stale
    #[must_use]
    pub fn invalidates(&self, provided: &Self) -> bool {
        if self.kind != provided.kind {
            return false;
        }
        match (&self.id, &provided.id) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => a == b,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{id}", self.kind),
            None => f.write_str(&self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_kinds_never_match() {
        assert!(!Tag::kind("Todos").invalidates(&Tag::kind("Users")));
    }

    #[test]
    fn display() {
        assert_eq!(Tag::kind("Todos").to_string(), "Todos");
        assert_eq!(Tag::with_id("Todos", 7).to_string(), "Todos:7");
    }
}
