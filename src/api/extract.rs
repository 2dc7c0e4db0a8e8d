//! Request extractors shared by the management handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::json;

use crate::domain::entities::Link;
use crate::error::AppError;

/// Header the upstream session layer puts the acting user's id in.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a management request acts for, `None` when anonymous.
///
/// Authentication happens upstream; this only reads the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub Option<i64>);

impl Actor {
    /// Fails with [`AppError::Forbidden`] unless the actor owns `link`.
    ///
    /// Anonymous links have no owner, so nobody may change them here.
    pub fn authorize(&self, link: &Link) -> Result<(), AppError> {
        if link.is_owned_by(self.0) {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "Link belongs to another user",
                json!({ "id": link.id }),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Actor(None));
        };

        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|id| Actor(Some(id)))
            .ok_or_else(|| {
                AppError::bad_request("Invalid X-User-Id header", json!({ "header": USER_ID_HEADER }))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::link::fixtures::link;
    use axum::http::Request;

    async fn extract(value: Option<&str>) -> Result<Actor, AppError> {
        let mut builder = Request::builder().uri("/links/1");
        if let Some(v) = value {
            builder = builder.header(USER_ID_HEADER, v);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        assert_eq!(extract(None).await.unwrap(), Actor(None));
    }

    #[tokio::test]
    async fn test_numeric_header_is_parsed() {
        assert_eq!(extract(Some(" 42 ")).await.unwrap(), Actor(Some(42)));
    }

    #[tokio::test]
    async fn test_garbage_header_is_rejected() {
        assert!(matches!(
            extract(Some("admin")).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_authorize_owner_only() {
        let mut owned = link(1, "abc1234", "https://example.com");
        owned.user_id = Some(7);

        assert!(Actor(Some(7)).authorize(&owned).is_ok());
        assert!(matches!(
            Actor(Some(8)).authorize(&owned),
            Err(AppError::Forbidden { .. })
        ));
        assert!(Actor(None).authorize(&owned).is_err());

        let anonymous = link(2, "xyz9876", "https://example.com");
        assert!(Actor(Some(7)).authorize(&anonymous).is_err());
    }
}
