//! Picks the best candidate out of a discovery result.

use super::transport::RawEmail;
use crate::core::models::{CandidateEmail, CertaintyTier};

/// Returns the candidate with the highest certainty tier.
///
/// Entries with a missing or unrecognised tier are never selected, so a
/// result without any acceptable tier yields `None`. Among equally ranked
/// entries the first one wins.
pub fn select_best_candidate(emails: &[RawEmail]) -> Option<CandidateEmail> {
    let mut best: Option<CandidateEmail> = None;
    for raw in emails {
        let address = raw.email.trim();
        if address.is_empty() {
            continue;
        }
        let Some(tier) = raw.certainty.as_deref().and_then(CertaintyTier::parse) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| tier > b.certainty) {
            best = Some(CandidateEmail {
                address: address.to_string(),
                certainty: tier,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(email: &str, certainty: Option<&str>) -> RawEmail {
        RawEmail {
            email: email.to_string(),
            certainty: certainty.map(str::to_string),
        }
    }

    #[test]
    fn test_highest_tier_wins_regardless_of_order() {
        let emails = vec![
            raw("p@example.com", Some("probable")),
            raw("u@example.com", Some("ultra_sure")),
            raw("s@example.com", Some("sure")),
        ];
        assert_eq!(
            select_best_candidate(&emails),
            Some(CandidateEmail {
                address: "u@example.com".into(),
                certainty: CertaintyTier::UltraSure,
            })
        );
    }

    #[test]
    fn test_unrecognised_tier_yields_none() {
        assert_eq!(select_best_candidate(&[raw("x@example.com", Some(""))]), None);
        assert_eq!(select_best_candidate(&[raw("x@example.com", None)]), None);
        assert_eq!(
            select_best_candidate(&[raw("x@example.com", Some("very_sure"))]),
            None
        );
        assert_eq!(select_best_candidate(&[]), None);
    }

    #[test]
    fn test_rank_zero_entries_are_skipped_not_fatal() {
        let emails = vec![
            raw("junk@example.com", Some("guess")),
            raw("p@example.com", Some("probable")),
        ];
        let best = select_best_candidate(&emails).unwrap();
        assert_eq!(best.address, "p@example.com");
        assert_eq!(best.certainty, CertaintyTier::Probable);
    }

    #[test]
    fn test_blank_address_skipped() {
        let emails = vec![
            raw("  ", Some("ultra_sure")),
            raw("s@example.com", Some("sure")),
        ];
        assert_eq!(select_best_candidate(&emails).unwrap().address, "s@example.com");
    }
}
