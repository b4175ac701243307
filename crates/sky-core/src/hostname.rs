//! Hostname parsing
//!
//! Turns user input into a structured hostname plus the state key a server
//! record is stored under. Pure string transformation; no network
//! validation of domain ownership happens here.
//!
//! A two-segment input like `"foo.com"` is deliberately treated as a
//! subdomain on the default domain (`foo.com.<default>`), not as a full
//! domain. That matches the one- and two-segment rule below and can
//! surprise users bringing their own apex domain; use a 3+ segment name to
//! target a specific domain.

use serde::{Deserialize, Serialize};

use crate::error::SkyError;

/// Structured form of a user-supplied name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedHost {
    pub subdomain: String,
    pub domain: String,
    /// Canonical hostname, as routed in DNS
    pub hostname: String,
    /// Unique key the server record is stored under. For 3+ segment input
    /// every `.` is replaced by `-`, so keys stay filesystem-safe.
    pub key: String,
}

/// Parse a raw name against the process-wide default domain
///
/// One or two segments: the whole input is the subdomain portion and the
/// default domain is appended. Three or more segments: the last two
/// segments are the domain, the rest is the subdomain.
pub fn parse(input: &str, default_domain: &str) -> Result<ParsedHost, SkyError> {
    if input.is_empty() {
        return Err(SkyError::InvalidHostname("empty input".to_string()));
    }

    let segments: Vec<&str> = input.split('.').collect();

    if segments.len() <= 2 {
        return Ok(ParsedHost {
            subdomain: input.to_string(),
            domain: default_domain.to_string(),
            hostname: format!("{}.{}", input, default_domain),
            key: input.to_string(),
        });
    }

    let domain = segments[segments.len() - 2..].join(".");
    let subdomain = segments[..segments.len() - 2].join(".");

    Ok(ParsedHost {
        subdomain,
        domain,
        hostname: input.to_string(),
        key: input.replace('.', "-"),
    })
}
