//! Onboarding settings with environment overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use utils::company_identifier::IdentifierKind;

const ENV_REQUIRE_IDENTIFIER: &str = "ONBOARDING_REQUIRE_COMPANY_IDENTIFIER";
const ENV_ACCEPTED_KINDS: &str = "ONBOARDING_ACCEPTED_KINDS";
const ENV_SLUG_MAX_LENGTH: &str = "ONBOARDING_SLUG_MAX_LENGTH";
const ENV_RESERVED_SLUGS: &str = "ONBOARDING_RESERVED_SLUGS";

const DEFAULT_SLUG_MAX_LENGTH: usize = 48;
const DEFAULT_RESERVED_SLUGS: &[&str] = &[
    "admin",
    "api",
    "app",
    "auth",
    "billing",
    "dashboard",
    "login",
    "logout",
    "marketplace",
    "onboarding",
    "settings",
    "signup",
    "www",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: expected true/false, got {value:?}")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var}: expected a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var}: unknown identifier kind {value:?}")]
    UnknownKind { var: &'static str, value: String },
    #[error("{0}: at least one identifier kind must be accepted")]
    NoAcceptedKinds(&'static str),
}

/// Rules applied when a company signs up and creates its first workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    pub require_company_identifier: bool,
    pub accepted_kinds: Vec<IdentifierKind>,
    pub slug_max_length: usize,
    pub reserved_slugs: Vec<String>,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            require_company_identifier: false,
            accepted_kinds: IdentifierKind::ALL.to_vec(),
            slug_max_length: DEFAULT_SLUG_MAX_LENGTH,
            reserved_slugs: DEFAULT_RESERVED_SLUGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl OnboardingConfig {
    /// Defaults overlaid with the `ONBOARDING_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_REQUIRE_IDENTIFIER) {
            config.require_company_identifier = parse_bool(ENV_REQUIRE_IDENTIFIER, &value)?;
        }

        if let Some(value) = lookup(ENV_ACCEPTED_KINDS) {
            let kinds = split_list(&value)
                .map(|item| {
                    item.parse::<IdentifierKind>()
                        .map_err(|_| ConfigError::UnknownKind {
                            var: ENV_ACCEPTED_KINDS,
                            value: item.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if kinds.is_empty() {
                return Err(ConfigError::NoAcceptedKinds(ENV_ACCEPTED_KINDS));
            }
            config.accepted_kinds = kinds;
        }

        if let Some(value) = lookup(ENV_SLUG_MAX_LENGTH) {
            config.slug_max_length = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: ENV_SLUG_MAX_LENGTH,
                        value,
                    });
                }
            };
        }

        if let Some(value) = lookup(ENV_RESERVED_SLUGS) {
            config.reserved_slugs = split_list(&value).map(|s| s.to_ascii_lowercase()).collect();
        }

        debug!(
            require_company_identifier = config.require_company_identifier,
            accepted_kinds = ?config.accepted_kinds,
            slug_max_length = config.slug_max_length,
            reserved_slugs = config.reserved_slugs.len(),
            "Loaded onboarding config"
        );

        Ok(config)
    }

    pub fn accepts(&self, kind: IdentifierKind) -> bool {
        self.accepted_kinds.contains(&kind)
    }

    pub fn is_reserved(&self, slug: &str) -> bool {
        self.reserved_slugs.iter().any(|reserved| reserved == slug)
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
