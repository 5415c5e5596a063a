//! Shared User-Agent string for metadata and PDF requests.

/// Default User-Agent for every outgoing request (identifies the tool).
///
/// The proxy session may override this from configuration, since some
/// publishers serve stripped-down pages to unfamiliar agents.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("bibtools/{version} (personal-bibliography-manager)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            ua.strip_prefix("bibtools/")
                .and_then(|s| s.split(' ').next()),
            Some(env!("CARGO_PKG_VERSION")),
            "UA must contain crate version: {ua}"
        );
    }

    #[test]
    fn test_user_agent_identifies_purpose() {
        assert!(default_user_agent().contains("bibliography-manager"));
    }
}
