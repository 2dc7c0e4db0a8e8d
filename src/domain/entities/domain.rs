//! Domain entity representing a hostname that serves short links.

use chrono::{DateTime, Utc};

use super::link::LinkDomain;

/// A hostname that serves shortened URLs.
///
/// Links bound to a domain are only reachable while the domain is available
/// and not soft-deleted. Links without a domain are served from the primary
/// service host.
#[derive(Debug, Clone)]
pub struct Domain {
    pub id: i64,
    pub name: String,
    pub available: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Domain {
    /// Returns true if the domain has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if links bound to this domain may redirect.
    pub fn is_serving(&self) -> bool {
        self.available && !self.is_deleted()
    }

    /// Projection embedded into [`crate::domain::entities::Link`].
    pub fn as_link_domain(&self) -> LinkDomain {
        LinkDomain {
            id: self.id,
            name: self.name.clone(),
            available: self.available,
            deleted_at: self.deleted_at,
        }
    }
}

/// Input data for creating a new domain.
///
/// New domains are available by default.
#[derive(Debug, Clone)]
pub struct NewDomain {
    pub name: String,
}

/// Input data for updating an existing domain.
///
/// All fields are optional to support partial updates.
#[derive(Debug, Clone, Default)]
pub struct UpdateDomain {
    pub name: Option<String>,
    pub available: Option<bool>,
}

/// What happens to links still bound to a domain being deleted.
///
/// Deleting a domain never deletes its links; the caller has to pick one of
/// these explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Links stay bound to the deleted domain and become unreachable.
    Retain,
    /// Links move to the default host and stay reachable there.
    Reassign,
    /// Links stay bound and are additionally marked unavailable.
    Disable,
}

impl std::str::FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "reassign" => Ok(Self::Reassign),
            "disable" => Ok(Self::Disable),
            other => Err(format!(
                "unknown orphan policy '{other}' (expected retain, reassign or disable)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(available: bool, deleted: bool) -> Domain {
        let now = Utc::now();
        Domain {
            id: 1,
            name: "go.example.com".to_string(),
            available,
            deleted_at: deleted.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_domain_serving_states() {
        assert!(domain(true, false).is_serving());
        assert!(!domain(false, false).is_serving());
        assert!(!domain(true, true).is_serving());
        assert!(domain(true, true).is_deleted());
    }

    #[test]
    fn test_as_link_domain_copies_state() {
        let d = domain(false, false);
        let projected = d.as_link_domain();

        assert_eq!(projected.id, 1);
        assert_eq!(projected.name, "go.example.com");
        assert!(!projected.available);
        assert!(!projected.is_serving());
    }

    #[test]
    fn test_update_domain_default() {
        let update = UpdateDomain::default();

        assert!(update.name.is_none());
        assert!(update.available.is_none());
    }

    #[test]
    fn test_orphan_policy_parse() {
        assert_eq!("retain".parse::<OrphanPolicy>(), Ok(OrphanPolicy::Retain));
        assert_eq!(
            "Reassign".parse::<OrphanPolicy>(),
            Ok(OrphanPolicy::Reassign)
        );
        assert_eq!("DISABLE".parse::<OrphanPolicy>(), Ok(OrphanPolicy::Disable));
        assert!("drop".parse::<OrphanPolicy>().is_err());
    }
}
