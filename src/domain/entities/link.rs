//! Link entity representing a shortened URL mapping.

use chrono::{DateTime, Utc};

/// Snapshot of the domain a link is bound to, joined at read time.
///
/// Carries just enough state to decide reachability without a second lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDomain {
    pub id: i64,
    pub name: String,
    pub available: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl LinkDomain {
    /// Returns true if links bound to this domain may redirect.
    pub fn is_serving(&self) -> bool {
        self.available && self.deleted_at.is_none()
    }
}

/// A shortened URL link with metadata.
///
/// `short_name` is globally unique and never changes once issued.
/// `domain` is `None` for links served from the default host.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: i64,
    pub user_id: Option<i64>,
    pub domain: Option<LinkDomain>,
    pub custom_name: Option<String>,
    pub destination: String,
    pub short_name: String,
    pub available: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// Returns true if the link has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn domain_id(&self) -> Option<i64> {
        self.domain.as_ref().map(|d| d.id)
    }

    pub fn domain_name(&self) -> Option<&str> {
        self.domain.as_ref().map(|d| d.name.as_str())
    }

    /// Returns true if a visitor may be redirected through this link.
    ///
    /// The link must be available and not deleted, and its domain (if any)
    /// must be available and not deleted either.
    pub fn is_reachable(&self) -> bool {
        self.available
            && !self.is_deleted()
            && self.domain.as_ref().is_none_or(LinkDomain::is_serving)
    }

    /// Returns true if `user_id` owns this link.
    ///
    /// Anonymous links have no owner and match nobody.
    pub fn is_owned_by(&self, user_id: Option<i64>) -> bool {
        matches!((self.user_id, user_id), (Some(owner), Some(actor)) if owner == actor)
    }
}

/// Input data for inserting a new link.
///
/// The short name is already chosen (generated or custom); the store only
/// enforces that it is unique.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub short_name: String,
    pub destination: String,
    pub user_id: Option<i64>,
    pub domain_id: Option<i64>,
    pub custom_name: Option<String>,
}

/// Partial update for an existing link.
///
/// `None` fields are left unchanged.
/// `custom_name: Some(None)` clears the alias; `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub destination: Option<String>,
    pub custom_name: Option<Option<String>>,
    pub available: Option<bool>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        self.destination.is_none() && self.custom_name.is_none() && self.available.is_none()
    }

    /// Patch that only flips availability.
    pub fn availability(available: bool) -> Self {
        Self {
            available: Some(available),
            ..Self::default()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{domain, link};
    use super::*;

    #[test]
    fn test_new_link_is_reachable() {
        let link = link(1, "abc1234", "https://example.com");

        assert!(!link.is_deleted());
        assert!(link.is_reachable());
        assert!(link.domain_id().is_none());
    }

    #[test]
    fn test_unavailable_link_is_unreachable() {
        let mut link = link(1, "abc1234", "https://example.com");
        link.available = false;

        assert!(!link.is_reachable());
    }

    #[test]
    fn test_deleted_link_is_unreachable() {
        let mut link = link(1, "abc1234", "https://example.com");
        link.deleted_at = Some(Utc::now());

        assert!(link.is_deleted());
        assert!(!link.is_reachable());
    }

    #[test]
    fn test_disabled_domain_hides_link() {
        let mut link = link(1, "abc1234", "https://example.com");
        link.domain = Some(domain(3, "go.example.com", false));

        assert!(link.available);
        assert!(!link.is_reachable());
    }

    #[test]
    fn test_deleted_domain_hides_link() {
        let mut link = link(1, "abc1234", "https://example.com");
        let mut bound = domain(3, "go.example.com", true);
        bound.deleted_at = Some(Utc::now());
        link.domain = Some(bound);

        assert!(!link.is_reachable());
    }

    #[test]
    fn test_serving_domain_keeps_link_reachable() {
        let mut link = link(1, "abc1234", "https://example.com");
        link.domain = Some(domain(3, "go.example.com", true));

        assert!(link.is_reachable());
        assert_eq!(link.domain_name(), Some("go.example.com"));
        assert_eq!(link.domain_id(), Some(3));
    }

    #[test]
    fn test_ownership() {
        let mut link = link(1, "abc1234", "https://example.com");
        assert!(!link.is_owned_by(None));
        assert!(!link.is_owned_by(Some(7)));

        link.user_id = Some(7);
        assert!(link.is_owned_by(Some(7)));
        assert!(!link.is_owned_by(Some(8)));
        assert!(!link.is_owned_by(None));
    }

    #[test]
    fn test_patch_helpers() {
        assert!(LinkPatch::default().is_empty());

        let patch = LinkPatch::availability(false);
        assert!(!patch.is_empty());
        assert_eq!(patch.available, Some(false));
        assert!(patch.destination.is_none());
    }
}
