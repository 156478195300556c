//! Data structures shared across verification, discovery and resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Closed status taxonomy every provider state is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Valid,
    Invalid,
    Catchall,
    Unknown,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Valid => write!(f, "VALID"),
            VerificationStatus::Invalid => write!(f, "INVALID"),
            VerificationStatus::Catchall => write!(f, "CATCHALL"),
            VerificationStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A verifier record: the provider's raw fields plus the mapped status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub address: String,
    pub state: String,
    pub sub_state: String,
    pub mapped_status: VerificationStatus,
    /// Any other fields the provider returned, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Discovery provider's self-reported confidence in a candidate.
///
/// Ordering follows rank: `UltraSure > Sure > Probable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertaintyTier {
    Probable,
    Sure,
    UltraSure,
}

impl CertaintyTier {
    /// Parses a provider label. Unrecognised or empty labels are not a tier.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ultra_sure" => Some(CertaintyTier::UltraSure),
            "sure" => Some(CertaintyTier::Sure),
            "probable" => Some(CertaintyTier::Probable),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CertaintyTier::UltraSure => "ultra_sure",
            CertaintyTier::Sure => "sure",
            CertaintyTier::Probable => "probable",
        }
    }
}

impl fmt::Display for CertaintyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered address with an acceptable certainty tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEmail {
    pub address: String,
    pub certainty: CertaintyTier,
}

/// Which branch of the resolution produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    /// The verifier's answer was accepted as-is.
    Direct,
    /// Discovery was consulted because the domain is a catchall.
    Escalated,
}

/// Final answer for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub email: String,
    pub status: VerificationStatus,
    pub certainty: Option<CertaintyTier>,
    pub path: ResolutionPath,
}

/// The person whose address is being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
        }
    }

    /// Splits a full name on whitespace into first and last parts.
    /// A single token is used for both.
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        let parts: Vec<&str> = full_name.split_whitespace().collect();
        match parts.as_slice() {
            [] => None,
            [only] => Some(Self::new(*only, *only)),
            [first, .., last] => Some(Self::new(*first, *last)),
        }
    }
}

/// Represents the input contact information read from the input file.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Contact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub domain: Option<String>,
    /// The address to verify (typically a pattern guess or a CRM value).
    pub email: Option<String>,
    /// Allows capturing any other fields present in the input JSON.
    #[serde(flatten)]
    pub other_fields: HashMap<String, serde_json::Value>,
}

impl Contact {
    /// Resolves the contact's name, falling back to splitting `full_name`.
    pub fn person_name(&self) -> Option<PersonName> {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        if !first.is_empty() && !last.is_empty() {
            return Some(PersonName::new(first, last));
        }
        self.full_name
            .as_deref()
            .and_then(PersonName::from_full_name)
    }
}

/// Represents the final output record for a single processed contact.
#[derive(Debug, Serialize, Clone)]
pub struct EnrichedContact {
    #[serde(flatten)]
    pub contact_input: Contact,
    pub verification: Option<VerificationRecord>,
    pub resolution: Option<ResolutionResult>,
    pub enrichment_skipped: bool,
    pub enrichment_reason: Option<String>,
    pub enrichment_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certainty_order_and_parse() {
        assert!(CertaintyTier::UltraSure > CertaintyTier::Sure);
        assert!(CertaintyTier::Sure > CertaintyTier::Probable);
        assert_eq!(CertaintyTier::parse("ultra_sure"), Some(CertaintyTier::UltraSure));
        assert_eq!(CertaintyTier::parse(" SURE "), Some(CertaintyTier::Sure));
        assert_eq!(CertaintyTier::parse("probable"), Some(CertaintyTier::Probable));
        assert_eq!(CertaintyTier::parse(""), None);
        assert_eq!(CertaintyTier::parse("maybe"), None);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&VerificationStatus::Catchall).unwrap(),
            "\"CATCHALL\""
        );
        assert_eq!(VerificationStatus::Valid.to_string(), "VALID");
    }

    #[test]
    fn test_person_name_from_full_name() {
        assert_eq!(
            PersonName::from_full_name("Ada  King Lovelace"),
            Some(PersonName::new("Ada", "Lovelace"))
        );
        assert_eq!(
            PersonName::from_full_name("Cher"),
            Some(PersonName::new("Cher", "Cher"))
        );
        assert_eq!(PersonName::from_full_name("   "), None);
    }

    #[test]
    fn test_contact_person_name_prefers_explicit_parts() {
        let contact = Contact {
            first_name: Some("Grace".into()),
            last_name: Some("Hopper".into()),
            full_name: Some("Rear Admiral Grace Hopper".into()),
            ..Contact::default()
        };
        assert_eq!(
            contact.person_name(),
            Some(PersonName::new("Grace", "Hopper"))
        );

        let contact = Contact {
            first_name: Some("Grace".into()),
            full_name: Some("Grace Hopper".into()),
            ..Contact::default()
        };
        assert_eq!(
            contact.person_name(),
            Some(PersonName::new("Grace", "Hopper"))
        );
    }
}
