//! Link creation and lifecycle service.

use std::sync::Arc;

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::{DomainRepository, LinkRepository};
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, keys_for_link};
use crate::utils::code_generator::{
    CodeGenerator, DEFAULT_CODE_LENGTH, RandomCodeGenerator, validate_custom_name,
};
use crate::utils::destination::validate_destination;
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

/// Generated codes tried before giving up on a create.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Input for [`LinkService::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub destination: String,
    pub user_id: Option<i64>,
    pub domain_id: Option<i64>,
    pub custom_name: Option<String>,
}

/// Service for creating, changing and retiring short links.
///
/// Owns the generate-insert-retry loop: the generator proposes codes, the
/// store's unique constraint accepts or rejects them. Every state change
/// invalidates the cached resolutions of the link.
pub struct LinkService<L, D>
where
    L: LinkRepository + ?Sized,
    D: DomainRepository + ?Sized,
{
    link_repository: Arc<L>,
    domain_repository: Arc<D>,
    cache: Arc<dyn CacheService>,
    generator: Arc<dyn CodeGenerator>,
    code_length: usize,
    base_url: String,
}

impl<L, D> LinkService<L, D>
where
    L: LinkRepository + ?Sized,
    D: DomainRepository + ?Sized,
{
    /// Creates a link service with the alphanumeric generator and the
    /// default code length.
    pub fn new(link_repository: Arc<L>, domain_repository: Arc<D>, cache: Arc<dyn CacheService>) -> Self {
        Self {
            link_repository,
            domain_repository,
            cache,
            generator: Arc::new(RandomCodeGenerator::alphanumeric()),
            code_length: DEFAULT_CODE_LENGTH,
            base_url: "http://localhost:3000".to_string(),
        }
    }

    /// Replaces the code generator and the length of generated codes.
    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>, code_length: usize) -> Self {
        self.generator = generator;
        self.code_length = code_length;
        self
    }

    /// Sets the public URL links on the primary host are built from.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Creates a short link.
    ///
    /// With a custom name the name itself becomes the short name and a
    /// collision fails immediately. Otherwise up to [`MAX_CODE_ATTEMPTS`]
    /// generated codes are tried.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if:
    /// - The destination is not an absolute http(s) URL of at most 2048 characters
    /// - The custom name is invalid
    /// - The domain does not exist or does not serve links
    ///
    /// Returns [`AppError::DuplicateCode`] if the custom name is taken.
    /// Returns [`AppError::CodeSpaceExhausted`] if every generated code collided.
    pub async fn create(&self, request: CreateLink) -> Result<Link, AppError> {
        let destination = validate_destination(&request.destination).map_err(|e| {
            AppError::bad_request("Invalid destination URL", json!({ "reason": e.to_string() }))
        })?;

        if let Some(domain_id) = request.domain_id {
            self.ensure_serving_domain(domain_id).await?;
        }

        if let Some(custom) = request.custom_name {
            validate_custom_name(&custom)?;

            let link = self
                .link_repository
                .create(NewLink {
                    short_name: custom.clone(),
                    destination,
                    user_id: request.user_id,
                    domain_id: request.domain_id,
                    custom_name: Some(custom),
                })
                .await?;

            info!("Created link {} with custom name '{}'", link.id, link.short_name);
            return Ok(link);
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = self.generator.generate(self.code_length);

            let result = self
                .link_repository
                .create(NewLink {
                    short_name: code.clone(),
                    destination: destination.clone(),
                    user_id: request.user_id,
                    domain_id: request.domain_id,
                    custom_name: None,
                })
                .await;

            match result {
                Ok(link) => {
                    info!("Created link {} with code '{}'", link.id, link.short_name);
                    return Ok(link);
                }
                Err(AppError::DuplicateCode { .. }) => {
                    warn!("Generated code '{}' collided (attempt {}/{})", code, attempt, MAX_CODE_ATTEMPTS);
                }
                Err(e) => return Err(e),
            }
        }

        error!(
            attempts = MAX_CODE_ATTEMPTS,
            code_length = self.code_length,
            "Short code space exhausted, consider a longer CODE_LENGTH"
        );
        Err(AppError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Finds a live link by exact short name, optionally within a domain.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if nothing matches.
    pub async fn find_by_code(&self, code: &str, domain_id: Option<i64>) -> Result<Link, AppError> {
        self.link_repository
            .find_by_code(code, domain_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "Short link not found",
                    json!({ "code": code, "domain_id": domain_id }),
                )
            })
    }

    /// Retrieves a live link by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link is absent or soft-deleted.
    pub async fn get(&self, id: i64) -> Result<Link, AppError> {
        self.link_repository
            .find_by_id(id)
            .await?
            .filter(|link| !link.is_deleted())
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))
    }

    /// Retrieves a link by id, soft-deleted ones included.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no row exists.
    pub async fn find(&self, id: i64) -> Result<Link, AppError> {
        self.link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))
    }

    /// Partially updates a link. The short name never changes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the patch is empty or carries an
    /// invalid destination or custom name.
    /// Returns [`AppError::NotFound`] if the link is absent or soft-deleted.
    pub async fn update(&self, id: i64, mut patch: LinkPatch) -> Result<Link, AppError> {
        if patch.is_empty() {
            return Err(AppError::bad_request("Nothing to update", json!({ "id": id })));
        }

        if let Some(destination) = &patch.destination {
            let validated = validate_destination(destination).map_err(|e| {
                AppError::bad_request("Invalid destination URL", json!({ "reason": e.to_string() }))
            })?;
            patch.destination = Some(validated);
        }

        if let Some(Some(name)) = &patch.custom_name {
            validate_custom_name(name)?;
        }

        let link = self.link_repository.update(id, patch).await?;
        self.invalidate(&link).await;

        debug!("Updated link {}", id);
        Ok(link)
    }

    /// Soft-deletes a link. The row and its history stay.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link is absent or already deleted.
    pub async fn soft_delete(&self, id: i64) -> Result<(), AppError> {
        let link = self.get(id).await?;

        if !self.link_repository.soft_delete(id).await? {
            return Err(AppError::not_found("Link not found", json!({ "id": id })));
        }
        self.invalidate(&link).await;

        info!("Soft-deleted link {}", id);
        Ok(())
    }

    /// Physically removes a soft-deleted link. Its history rows survive
    /// without a link reference.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link does not exist.
    /// Returns [`AppError::Conflict`] if the link is still live.
    pub async fn purge(&self, id: i64) -> Result<(), AppError> {
        let link = self
            .link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;

        if !link.is_deleted() {
            return Err(AppError::conflict(
                "Link must be deleted before it can be purged",
                json!({ "id": id }),
            ));
        }

        if !self.link_repository.purge(id).await? {
            return Err(AppError::not_found("Link not found", json!({ "id": id })));
        }
        self.invalidate(&link).await;

        info!("Purged link {}", id);
        Ok(())
    }

    /// Returns true if visitors may currently be redirected through `link`.
    pub fn is_reachable(&self, link: &Link) -> bool {
        link.is_reachable()
    }

    /// Public short URL of a link.
    ///
    /// Domain-bound links use their own host over HTTPS, the rest hang off
    /// the configured base URL. The code is percent-encoded as one path
    /// segment, custom names may contain spaces.
    pub fn short_url(&self, link: &Link) -> String {
        match link.domain_name() {
            Some(domain) => append_code(&format!("https://{}", domain), &link.short_name),
            None => append_code(&self.base_url, &link.short_name),
        }
    }

    async fn ensure_serving_domain(&self, domain_id: i64) -> Result<(), AppError> {
        match self.domain_repository.find_by_id(domain_id).await? {
            Some(domain) if domain.is_serving() => Ok(()),
            Some(domain) => Err(AppError::bad_request(
                "Domain is not available",
                json!({ "domain": domain.name }),
            )),
            None => Err(AppError::bad_request(
                "Domain does not exist",
                json!({ "domain_id": domain_id }),
            )),
        }
    }

    async fn invalidate(&self, link: &Link) {
        if let Err(e) = self.cache.invalidate(&keys_for_link(link)).await {
            warn!("Failed to invalidate cache for link {}: {}", link.id, e);
        }
    }
}

/// Appends `code` to `base` as a single, percent-encoded path segment.
fn append_code(base: &str, code: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(code);
            }
            url.into()
        }
        Err(_) => format!("{}/{}", base.trim_end_matches('/'), code),
    }
}
