pub mod company_identifier;
pub mod text;
