//! Server-side validation of the company details submitted during onboarding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;
use utils::{
    company_identifier::{self, IdentifierKind, InvalidReason, ValidationResult},
    text::{self, MAX_SLUG_ATTEMPTS},
};

use super::config::OnboardingConfig;

#[derive(Debug, Error)]
#[error("slug lookup failed: {0}")]
pub struct SlugLookupError(pub String);

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("company name is required")]
    EmptyCompanyName,
    #[error("{0} identifiers are not accepted")]
    UnsupportedIdentifierKind(IdentifierKind),
    #[error("a {0} is required")]
    IdentifierRequired(IdentifierKind),
    #[error("invalid {kind}: {reason}")]
    InvalidIdentifier {
        kind: IdentifierKind,
        reason: InvalidReason,
    },
    #[error("invalid workspace slug: {0:?}")]
    InvalidSlug(String),
    #[error("workspace slug {0:?} is reserved")]
    ReservedSlug(String),
    #[error("workspace slug {0:?} is already taken")]
    SlugTaken(String),
    #[error("no free workspace slug derived from {0:?}")]
    SlugExhausted(String),
    #[error(transparent)]
    Lookup(#[from] SlugLookupError),
}

/// Answers whether a workspace slug is already in use
#[async_trait]
pub trait SlugLookup: Send + Sync {
    async fn is_slug_taken(&self, slug: &str) -> Result<bool, SlugLookupError>;
}

/// Company details as entered in the onboarding form
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CompanyDetails {
    pub company_name: String,
    pub identifier: Option<String>,
    pub identifier_kind: IdentifierKind,
    pub workspace_slug: Option<String>,
}

/// Company details ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ValidatedCompany {
    pub company_name: String,
    /// Canonical punctuated identifier, absent when none was given
    pub identifier: Option<String>,
    pub identifier_kind: IdentifierKind,
    pub workspace_slug: String,
}

pub struct OnboardingValidator<L> {
    config: OnboardingConfig,
    lookup: L,
}

impl<L: SlugLookup> OnboardingValidator<L> {
    pub fn new(config: OnboardingConfig, lookup: L) -> Self {
        Self { config, lookup }
    }

    /// Check every field and settle on a free workspace slug
    pub async fn validate(
        &self,
        details: &CompanyDetails,
    ) -> Result<ValidatedCompany, OnboardingError> {
        let company_name = text::collapse_whitespace(&details.company_name);
        if company_name.is_empty() {
            return Err(OnboardingError::EmptyCompanyName);
        }

        let kind = details.identifier_kind;
        let identifier = self.check_identifier(details.identifier.as_deref(), kind)?;

        let workspace_slug = match details.workspace_slug.as_deref().map(str::trim) {
            Some(requested) if !requested.is_empty() => {
                self.check_requested_slug(&requested.to_ascii_lowercase())
                    .await?
            }
            _ => self.derive_slug(&company_name).await?,
        };

        info!(
            company_name = %company_name,
            identifier_kind = %kind,
            has_identifier = identifier.is_some(),
            workspace_slug = %workspace_slug,
            "Accepted onboarding company details"
        );

        Ok(ValidatedCompany {
            company_name,
            identifier,
            identifier_kind: kind,
            workspace_slug,
        })
    }

    fn check_identifier(
        &self,
        raw: Option<&str>,
        kind: IdentifierKind,
    ) -> Result<Option<String>, OnboardingError> {
        if !self.config.accepts(kind) {
            return Err(OnboardingError::UnsupportedIdentifierKind(kind));
        }

        match company_identifier::validate(raw, kind) {
            ValidationResult::Valid { formatted } => Ok(Some(formatted)),
            ValidationResult::Optional if self.config.require_company_identifier => {
                Err(OnboardingError::IdentifierRequired(kind))
            }
            ValidationResult::Optional => Ok(None),
            ValidationResult::Invalid { reason } => {
                debug!(identifier_kind = %kind, reason = %reason, "Rejected company identifier");
                Err(OnboardingError::InvalidIdentifier { kind, reason })
            }
        }
    }

    async fn check_requested_slug(&self, slug: &str) -> Result<String, OnboardingError> {
        if !text::is_valid_slug(slug) || slug.len() > self.config.slug_max_length {
            return Err(OnboardingError::InvalidSlug(slug.to_string()));
        }
        if self.config.is_reserved(slug) {
            return Err(OnboardingError::ReservedSlug(slug.to_string()));
        }
        if self.is_taken(slug).await? {
            return Err(OnboardingError::SlugTaken(slug.to_string()));
        }
        Ok(slug.to_string())
    }

    async fn derive_slug(&self, company_name: &str) -> Result<String, OnboardingError> {
        let base = text::slugify_with_limit(company_name, self.config.slug_max_length);
        if base.is_empty() {
            return Err(OnboardingError::InvalidSlug(base));
        }

        let candidates = std::iter::once(base.clone()).chain(
            (2..=MAX_SLUG_ATTEMPTS)
                .filter_map(|n| text::slug_with_suffix(&base, n, self.config.slug_max_length)),
        );

        for candidate in candidates {
            if self.config.is_reserved(&candidate) {
                continue;
            }
            if !self.is_taken(&candidate).await? {
                return Ok(candidate);
            }
            debug!(slug = %candidate, "Workspace slug taken, trying next suffix");
        }

        Err(OnboardingError::SlugExhausted(base))
    }

    async fn is_taken(&self, slug: &str) -> Result<bool, OnboardingError> {
        self.lookup.is_slug_taken(slug).await.map_err(|e| {
            warn!(slug = %slug, error = %e, "Workspace slug lookup failed");
            OnboardingError::Lookup(e)
        })
    }
}
