//! Address normalization shared by the cache and the batch verifier.

/// Normalizes an address into its cache key form: trimmed and lower-cased.
///
/// Returns `None` for blank input. No syntax validation is performed here;
/// that is the verifier's job.
pub(crate) fn normalize_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Returns the part after the last `@`, lower-cased, or `None` when there is
/// no non-empty domain part.
pub(crate) fn domain_of(address: &str) -> Option<String> {
    let (_, domain) = address.trim().rsplit_once('@')?;
    let domain = domain.trim();
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("  Jane.Doe@Example.COM \n"),
            Some("jane.doe@example.com".to_string())
        );
        assert_eq!(normalize_address("x@y.z"), Some("x@y.z".to_string()));
        assert_eq!(normalize_address(""), None);
        assert_eq!(normalize_address(" \t "), None);
    }

    #[test]
    fn test_normalize_does_not_validate() {
        assert_eq!(
            normalize_address("not-an-email"),
            Some("not-an-email".to_string())
        );
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("ada@Example.com"), Some("example.com".to_string()));
        assert_eq!(domain_of("odd@name@corp.io"), Some("corp.io".to_string()));
        assert_eq!(domain_of("no-at-sign"), None);
        assert_eq!(domain_of("trailing@"), None);
    }
}
