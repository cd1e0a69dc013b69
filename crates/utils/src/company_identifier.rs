//! Brazilian company/taxpayer identifier validation (CPF and CNPJ).
//!
//! Both identifiers end in two modulo-11 check digits. Input may carry any
//! punctuation; only ASCII digits are considered.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Kind of identifier a caller declares for the value being validated
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum IdentifierKind {
    /// Individual taxpayer registry, 11 digits
    Cpf,
    /// Company registry, 14 digits
    Cnpj,
}

impl IdentifierKind {
    pub const ALL: [IdentifierKind; 2] = [IdentifierKind::Cpf, IdentifierKind::Cnpj];

    /// Number of digits in a complete identifier, check digits included
    pub fn digit_count(self) -> usize {
        match self {
            Self::Cpf => 11,
            Self::Cnpj => 14,
        }
    }

    /// Guess the kind from the length of an already normalized digit string
    pub fn from_digit_count(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.digit_count() == len)
    }

    fn base_len(self) -> usize {
        self.digit_count() - 2
    }
}

/// Why a present identifier was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvalidReason {
    Length,
    RepeatedDigits,
    CheckDigits,
}

/// Outcome of validating a (possibly missing) identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationResult {
    /// Nothing was entered, the identifier is not required
    Optional,
    Valid { formatted: String },
    Invalid { reason: InvalidReason },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional)
    }

    /// Canonical punctuated form, only present for valid identifiers
    pub fn formatted(&self) -> Option<&str> {
        match self {
            Self::Valid { formatted } => Some(formatted.as_str()),
            _ => None,
        }
    }
}

/// Validate a raw, user-entered identifier of the declared kind.
///
/// Empty or punctuation-only input is `Optional`. Uniform-digit sequences are
/// rejected before the checksum runs, since several of them satisfy it.
pub fn validate(value: Option<&str>, kind: IdentifierKind) -> ValidationResult {
    let digits = normalize_digits(value.unwrap_or_default());

    if digits.is_empty() {
        return ValidationResult::Optional;
    }

    if digits.len() != kind.digit_count() {
        return ValidationResult::Invalid {
            reason: InvalidReason::Length,
        };
    }

    if has_uniform_digits(&digits) {
        return ValidationResult::Invalid {
            reason: InvalidReason::RepeatedDigits,
        };
    }

    let (base, check) = digits.split_at(kind.base_len());
    let actual = [check.as_bytes()[0] - b'0', check.as_bytes()[1] - b'0'];
    if compute_check_digits(base, kind) != Some(actual) {
        return ValidationResult::Invalid {
            reason: InvalidReason::CheckDigits,
        };
    }

    match format_identifier(&digits, kind) {
        Some(formatted) => ValidationResult::Valid { formatted },
        None => ValidationResult::Invalid {
            reason: InvalidReason::Length,
        },
    }
}

/// Strip everything that is not an ASCII digit
pub fn normalize_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Re-insert the canonical punctuation into a bare digit string.
///
/// Returns `None` unless `digits` is all ASCII digits of the kind's length.
pub fn format_identifier(digits: &str, kind: IdentifierKind) -> Option<String> {
    if digits.len() != kind.digit_count() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let formatted = match kind {
        IdentifierKind::Cpf => format!(
            "{}.{}.{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..11]
        ),
        IdentifierKind::Cnpj => format!(
            "{}.{}.{}/{}-{}",
            &digits[0..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..14]
        ),
    };

    Some(formatted)
}

/// Compute both check digits for the 9 (CPF) or 12 (CNPJ) digit base
pub fn compute_check_digits(base: &str, kind: IdentifierKind) -> Option<[u8; 2]> {
    if base.len() != kind.base_len() || !base.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut digits: Vec<u32> = base.bytes().map(|b| u32::from(b - b'0')).collect();

    let first = match kind {
        IdentifierKind::Cpf => mod11_digit(&digits, descending_weights(10)),
        IdentifierKind::Cnpj => mod11_digit(&digits, CNPJ_FIRST_WEIGHTS.into_iter()),
    };
    digits.push(u32::from(first));

    let second = match kind {
        IdentifierKind::Cpf => mod11_digit(&digits, descending_weights(11)),
        IdentifierKind::Cnpj => mod11_digit(&digits, CNPJ_SECOND_WEIGHTS.into_iter()),
    };

    Some([first, second])
}

fn descending_weights(start: u32) -> impl Iterator<Item = u32> {
    (2..=start).rev()
}

// Remainders 0 and 1 both map to check digit 0
fn mod11_digit(digits: &[u32], weights: impl Iterator<Item = u32>) -> u8 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        r => (11 - r) as u8,
    }
}

fn has_uniform_digits(digits: &str) -> bool {
    let mut bytes = digits.bytes();
    match bytes.next() {
        Some(first) => bytes.all(|b| b == first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(formatted: &str) -> ValidationResult {
        ValidationResult::Valid {
            formatted: formatted.to_string(),
        }
    }

    fn invalid(reason: InvalidReason) -> ValidationResult {
        ValidationResult::Invalid { reason }
    }

    #[test]
    fn test_empty_input_is_optional() {
        assert_eq!(validate(Some(""), IdentifierKind::Cpf), ValidationResult::Optional);
        assert_eq!(validate(Some("   "), IdentifierKind::Cnpj), ValidationResult::Optional);
        assert!(validate(None, IdentifierKind::Cpf).is_optional());
        assert_eq!(validate(Some(" ./- "), IdentifierKind::Cnpj), ValidationResult::Optional);
    }

    #[test]
    fn test_valid_cpf_is_formatted() {
        assert_eq!(
            validate(Some("11144477735"), IdentifierKind::Cpf),
            valid("111.444.777-35")
        );
        assert_eq!(
            validate(Some("529.982.247-25"), IdentifierKind::Cpf),
            valid("529.982.247-25")
        );
    }

    #[test]
    fn test_valid_cnpj_is_formatted() {
        assert_eq!(
            validate(Some("11222333000181"), IdentifierKind::Cnpj),
            valid("11.222.333/0001-81")
        );
        assert_eq!(
            validate(Some(" 11.222.333/0001-81 "), IdentifierKind::Cnpj),
            valid("11.222.333/0001-81")
        );
    }

    #[test]
    fn test_uniform_digits_are_rejected_before_checksum() {
        for d in b'0'..=b'9' {
            let cpf = String::from_utf8(vec![d; 11]).unwrap();
            assert_eq!(
                validate(Some(cpf.as_str()), IdentifierKind::Cpf),
                invalid(InvalidReason::RepeatedDigits),
                "cpf {cpf}"
            );

            let cnpj = String::from_utf8(vec![d; 14]).unwrap();
            assert_eq!(
                validate(Some(cnpj.as_str()), IdentifierKind::Cnpj),
                invalid(InvalidReason::RepeatedDigits),
                "cnpj {cnpj}"
            );
        }
    }

    #[test]
    fn test_all_zero_cpf_would_pass_the_checksum_alone() {
        assert_eq!(compute_check_digits("000000000", IdentifierKind::Cpf), Some([0, 0]));
        assert!(!validate(Some("00000000000"), IdentifierKind::Cpf).is_valid());
    }

    #[test]
    fn test_wrong_check_digits_are_invalid() {
        assert_eq!(
            validate(Some("11111111111"), IdentifierKind::Cpf),
            invalid(InvalidReason::RepeatedDigits)
        );
        assert_eq!(
            validate(Some("11144477736"), IdentifierKind::Cpf),
            invalid(InvalidReason::CheckDigits)
        );
        assert_eq!(
            validate(Some("12345678901234"), IdentifierKind::Cnpj),
            invalid(InvalidReason::CheckDigits)
        );
        // only the second check digit is off
        assert_eq!(
            validate(Some("11.222.333/0001-82"), IdentifierKind::Cnpj),
            invalid(InvalidReason::CheckDigits)
        );
        assert_eq!(
            validate(Some("111.444.777-34"), IdentifierKind::Cpf),
            invalid(InvalidReason::CheckDigits)
        );
    }

    #[test]
    fn test_wrong_length_for_kind_is_invalid() {
        // a valid CPF is still the wrong length for a CNPJ and vice versa
        assert_eq!(
            validate(Some("11144477735"), IdentifierKind::Cnpj),
            invalid(InvalidReason::Length)
        );
        assert_eq!(
            validate(Some("11222333000181"), IdentifierKind::Cpf),
            invalid(InvalidReason::Length)
        );
        assert_eq!(validate(Some("1"), IdentifierKind::Cpf), invalid(InvalidReason::Length));
        assert_eq!(
            validate(Some("9".repeat(200).as_str()), IdentifierKind::Cnpj),
            invalid(InvalidReason::Length)
        );
    }

    #[test]
    fn test_non_ascii_digits_are_ignored() {
        // full-width and arabic-indic digits are not ASCII and get stripped
        assert_eq!(
            validate(Some("１１１４４４７７７３５"), IdentifierKind::Cpf),
            ValidationResult::Optional
        );
        assert_eq!(
            validate(Some("cpf: 111-444-777/35 ٣"), IdentifierKind::Cpf),
            valid("111.444.777-35")
        );
    }

    #[test]
    fn test_formatted_output_round_trips() {
        for (raw, kind) in [
            ("11144477735", IdentifierKind::Cpf),
            ("52998224725", IdentifierKind::Cpf),
            ("11222333000181", IdentifierKind::Cnpj),
        ] {
            let result = validate(Some(raw), kind);
            let formatted = result.formatted().expect("valid identifier");
            assert_eq!(normalize_digits(formatted), raw);
            assert_eq!(validate(Some(formatted), kind), result);
        }
    }

    #[test]
    fn test_format_identifier_requires_exact_digits() {
        assert_eq!(
            format_identifier("12345678901", IdentifierKind::Cpf).as_deref(),
            Some("123.456.789-01")
        );
        assert_eq!(format_identifier("1234567890", IdentifierKind::Cpf), None);
        assert_eq!(format_identifier("1234567890a", IdentifierKind::Cpf), None);
        assert_eq!(
            format_identifier("00000000000000", IdentifierKind::Cnpj).as_deref(),
            Some("00.000.000/0000-00")
        );
    }

    #[test]
    fn test_kind_parses_case_insensitively() {
        assert_eq!("CPF".parse::<IdentifierKind>().unwrap(), IdentifierKind::Cpf);
        assert_eq!("cnpj".parse::<IdentifierKind>().unwrap(), IdentifierKind::Cnpj);
        assert!("rg".parse::<IdentifierKind>().is_err());
        assert_eq!(IdentifierKind::Cnpj.to_string(), "CNPJ");
        assert_eq!(IdentifierKind::from_digit_count(14), Some(IdentifierKind::Cnpj));
        assert_eq!(IdentifierKind::from_digit_count(12), None);
    }

    #[test]
    fn test_result_serializes_as_tagged_union() {
        let json = serde_json::to_value(valid("111.444.777-35")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "valid", "formatted": "111.444.777-35" })
        );

        let json = serde_json::to_value(invalid(InvalidReason::RepeatedDigits)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "invalid", "reason": "repeated_digits" })
        );

        let json = serde_json::to_value(ValidationResult::Optional).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "optional" }));
        assert_eq!(
            serde_json::to_value(IdentifierKind::Cpf).unwrap(),
            serde_json::json!("CPF")
        );
    }
}
