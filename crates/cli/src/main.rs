use std::{collections::HashSet, process::ExitCode};

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use services::services::{
    config::OnboardingConfig,
    onboarding::{CompanyDetails, OnboardingValidator, SlugLookup, SlugLookupError},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use utils::{
    company_identifier::{self, IdentifierKind, ValidationResult},
    text,
};

#[derive(Parser, Debug)]
#[command(name = "idcheck", version, about = "CPF/CNPJ validation and workspace slug tools")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and format a CPF or CNPJ
    Validate {
        value: String,
        #[arg(long, value_enum, default_value_t = KindArg::Auto)]
        kind: KindArg,
    },
    /// Derive a workspace slug from a name
    Slug {
        text: String,
        #[arg(long, default_value_t = 48)]
        max_length: usize,
        #[arg(long, value_delimiter = ',', help = "Slugs already in use")]
        taken: Vec<String>,
    },
    /// Run the onboarding checks on a set of company details
    Onboard {
        #[arg(long)]
        name: String,
        #[arg(long)]
        identifier: Option<String>,
        #[arg(long, value_enum, default_value_t = KindArg::Cnpj)]
        kind: KindArg,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long, value_delimiter = ',', help = "Slugs already in use")]
        taken: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Auto,
    Cpf,
    Cnpj,
}

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct IdentifierReport {
    kind: IdentifierKind,
    #[serde(flatten)]
    result: ValidationResult,
}

#[derive(Serialize)]
struct SlugReport {
    input: String,
    slug: Option<String>,
}

struct TakenSlugs(HashSet<String>);

#[async_trait]
impl SlugLookup for TakenSlugs {
    async fn is_slug_taken(&self, slug: &str) -> Result<bool, SlugLookupError> {
        Ok(self.0.contains(slug))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { value, kind } => {
            let kind = resolve_kind(kind, &value);
            let result = company_identifier::validate(Some(value.as_str()), kind);
            debug!(identifier_kind = %kind, ?result, "Validated identifier");

            let ok = !matches!(result, ValidationResult::Invalid { .. });
            let report = IdentifierReport { kind, result };
            print_one(cli.json, ok, &report, |r| match &r.result {
                ValidationResult::Valid { formatted } => {
                    format!("valid {}: {}", r.kind, formatted)
                }
                ValidationResult::Optional => format!("no {} given", r.kind),
                ValidationResult::Invalid { reason } => format!("invalid {}: {}", r.kind, reason),
            })?;
            Ok(exit_code(ok))
        }
        Commands::Slug {
            text: input,
            max_length,
            taken,
        } => {
            let base = text::slugify_with_limit(&input, max_length);
            let slug = text::unique_slug(&base, max_length, |s| taken.iter().any(|t| t == s));
            let ok = slug.is_some();
            let report = SlugReport { input, slug };
            print_one(cli.json, ok, &report, |r| match &r.slug {
                Some(slug) => slug.clone(),
                None => format!("no slug available for {:?}", r.input),
            })?;
            Ok(exit_code(ok))
        }
        Commands::Onboard {
            name,
            identifier,
            kind,
            slug,
            taken,
        } => {
            let config = OnboardingConfig::from_env().context("invalid onboarding config")?;
            let validator =
                OnboardingValidator::new(config, TakenSlugs(taken.into_iter().collect()));
            let identifier_kind = resolve_kind(kind, identifier.as_deref().unwrap_or_default());
            let details = CompanyDetails {
                company_name: name,
                identifier,
                identifier_kind,
                workspace_slug: slug,
            };

            match validator.validate(&details).await {
                Ok(company) => {
                    print_one(cli.json, true, &company, |c| {
                        format!(
                            "{} ({}) -> /{}",
                            c.company_name,
                            c.identifier.as_deref().unwrap_or("no identifier"),
                            c.workspace_slug
                        )
                    })?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    let message = e.to_string();
                    print_one(cli.json, false, &message, |m| format!("rejected: {m}"))?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

/// Pick the identifier kind, inferring it from the digit count for `auto`
fn resolve_kind(arg: KindArg, value: &str) -> IdentifierKind {
    match arg {
        KindArg::Cpf => IdentifierKind::Cpf,
        KindArg::Cnpj => IdentifierKind::Cnpj,
        KindArg::Auto => {
            let len = company_identifier::normalize_digits(value).len();
            IdentifierKind::from_digit_count(len).unwrap_or_else(|| {
                if len > IdentifierKind::Cpf.digit_count() {
                    IdentifierKind::Cnpj
                } else {
                    IdentifierKind::Cpf
                }
            })
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_one<T: Serialize>(
    json: bool,
    ok: bool,
    data: &T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&JsonOut { ok, data })?);
    } else {
        println!("{}", row(data));
    }
    Ok(())
}
