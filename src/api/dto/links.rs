//! DTOs for link management endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use validator::Validate;

use crate::domain::entities::{Link, LinkPatch};

/// Form body of `POST /links`.
///
/// HTML forms submit untouched optional inputs as empty strings; those are
/// read as absent.
#[serde_as]
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkForm {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: String,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub custom_name: Option<String>,

    /// Name of the domain the link is served from.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 253))]
    pub domain: Option<String>,

    #[serde(default)]
    pub from_modal: Option<String>,
}

impl CreateLinkForm {
    /// Returns true if the request came from the creation modal, which only
    /// needs the short URL back.
    pub fn is_modal(&self) -> bool {
        self.from_modal.as_deref().is_some_and(|v| {
            let v = v.trim();
            v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("on")
        })
    }
}

/// Compact response for the creation modal.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortUrlResponse {
    pub short_url: String,
}

/// Full JSON representation of a link.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub id: i64,
    pub short_name: String,
    pub short_url: String,
    pub destination: String,
    pub custom_name: Option<String>,
    pub domain: Option<String>,
    pub user_id: Option<i64>,
    pub available: bool,
    /// Whether visitors are currently redirected.
    pub reachable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl LinkResponse {
    pub fn new(link: Link, short_url: String) -> Self {
        let reachable = link.is_reachable();
        let domain = link.domain_name().map(str::to_owned);
        Self {
            id: link.id,
            short_name: link.short_name,
            short_url,
            destination: link.destination,
            custom_name: link.custom_name,
            domain,
            user_id: link.user_id,
            available: link.available,
            reachable,
            created_at: link.created_at,
            updated_at: link.updated_at,
            deleted_at: link.deleted_at,
        }
    }
}

/// Request body for `PATCH /links/{id}`.
///
/// All fields are optional; only provided fields are changed.
///
/// # `custom_name` semantics
///
/// - **Absent** → leave unchanged
/// - **`null`** → clear the alias
/// - **String** → set the alias (the short name itself never changes)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    #[validate(length(min = 1, max = 2048))]
    pub url: Option<String>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(min = 1, max = 255))]
    pub custom_name: Option<Option<String>>,

    pub available: Option<bool>,
}

impl From<UpdateLinkRequest> for LinkPatch {
    fn from(req: UpdateLinkRequest) -> Self {
        LinkPatch {
            destination: req.url,
            custom_name: req.custom_name,
            available: req.available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(body: &str) -> CreateLinkForm {
        serde_urlencoded::from_str(body).unwrap()
    }

    #[test]
    fn test_empty_optional_inputs_are_absent() {
        let f = form("url=https%3A%2F%2Fexample.com&custom_name=&domain=");
        assert_eq!(f.url, "https://example.com");
        assert!(f.custom_name.is_none());
        assert!(f.domain.is_none());
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_modal_flag_values() {
        for value in ["true", "1", "on", "ON", "True"] {
            assert!(form(&format!("url=x&from_modal={value}")).is_modal(), "{value}");
        }
        for value in ["false", "0", "off", ""] {
            assert!(!form(&format!("url=x&from_modal={value}")).is_modal(), "{value}");
        }
        assert!(!form("url=x").is_modal());
    }

    #[test]
    fn test_empty_url_fails_validation() {
        assert!(form("url=").validate().is_err());
    }

    #[test]
    fn test_update_custom_name_tristate() {
        let absent: UpdateLinkRequest = serde_json::from_str(r#"{"available": false}"#).unwrap();
        assert!(absent.custom_name.is_none());

        let cleared: UpdateLinkRequest = serde_json::from_str(r#"{"custom_name": null}"#).unwrap();
        assert_eq!(cleared.custom_name, Some(None));

        let set: UpdateLinkRequest = serde_json::from_str(r#"{"custom_name": "promo"}"#).unwrap();
        let patch = LinkPatch::from(set);
        assert_eq!(patch.custom_name, Some(Some("promo".to_string())));
    }
}
