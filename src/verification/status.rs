//! Maps provider `(state, sub_state)` pairs onto [`VerificationStatus`].

use crate::core::models::VerificationStatus;

/// Classifies a provider record. Total: every input maps to exactly one status.
///
/// Branches are evaluated in a fixed order and the first match wins. The
/// accept-all check runs before the disposable/role check, so a risky
/// accept-all address that is also flagged disposable is `Catchall`.
#[allow(clippy::if_same_then_else)]
pub fn map_status(state: &str, sub_state: &str) -> VerificationStatus {
    let state = state.trim().to_ascii_lowercase();
    let sub_state = sub_state.trim().to_ascii_lowercase();

    if state == "ok" {
        VerificationStatus::Valid
    } else if state.contains("invalid") {
        VerificationStatus::Invalid
    } else if state == "risky" && sub_state.contains("accept_all") {
        VerificationStatus::Catchall
    } else if sub_state.contains("disposable") || sub_state.contains("role") {
        VerificationStatus::Invalid
    } else if state.contains("unknown") || state.contains("pending") {
        VerificationStatus::Unknown
    } else {
        VerificationStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VerificationStatus::*;

    #[test]
    fn test_branch_table() {
        let cases = [
            ("ok", "", Valid),
            ("ok", "disposable", Valid),
            ("invalid", "", Invalid),
            ("email_invalid", "mailbox_not_found", Invalid),
            ("risky", "accept_all", Catchall),
            ("risky", "accept_all,disposable", Catchall),
            ("risky", "role_account,accept_all", Catchall),
            ("risky", "disposable", Invalid),
            ("risky", "role_account", Invalid),
            ("unknown", "disposable", Invalid),
            ("unknown", "timeout", Unknown),
            ("pending", "", Unknown),
            ("risky", "low_quality", Unknown),
            ("risky", "", Unknown),
            ("", "", Unknown),
            ("something_new", "whatever", Unknown),
        ];
        for (state, sub_state, expected) in cases {
            assert_eq!(
                map_status(state, sub_state),
                expected,
                "state={:?} sub_state={:?}",
                state,
                sub_state
            );
        }
    }

    #[test]
    fn test_accept_all_requires_risky_state() {
        assert_eq!(map_status("unknown", "accept_all"), Unknown);
        assert_eq!(map_status("catchall", "accept_all"), Unknown);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(map_status(" OK ", ""), Valid);
        assert_eq!(map_status("Risky", "ACCEPT_ALL"), Catchall);
    }
}
