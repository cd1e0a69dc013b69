pub mod config;
pub mod onboarding;
