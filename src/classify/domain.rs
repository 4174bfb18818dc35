use std::fmt;

use url::Url;

use crate::error::EngineError;

/// Normalized hostname: lowercase, no `www.`, no scheme, path, port or trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Domain(String);

impl Domain {
    /// Accepts bare hosts (`GitHub.com`), `host:port` and full URLs.
    pub fn parse(input: &str) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidDomain {
            input: input.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let url = if trimmed.contains("://") {
            Url::parse(trimmed).map_err(|_| invalid())?
        } else {
            // `about:blank` and `localhost:3000` both parse with a scheme; only a numeric
            // remainder means the "scheme" was really a host followed by a port.
            if let Ok(url) = Url::parse(trimmed) {
                if !is_port_suffix(trimmed.get(url.scheme().len() + 1..).unwrap_or("")) {
                    return Err(invalid());
                }
            }
            Url::parse(&format!("http://{trimmed}")).map_err(|_| invalid())?
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid());
        }

        let host = url.host_str().ok_or_else(invalid)?.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let host = host.trim_end_matches('.');
        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self(host.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_port_suffix(rest: &str) -> bool {
    rest.split('/')
        .next()
        .is_some_and(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(input: &str) -> String {
        Domain::parse(input).unwrap().as_str().to_string()
    }

    #[test]
    fn test_bare_host_is_lowercased_and_www_stripped() {
        assert_eq!(host("www.GitHub.com"), "github.com");
        assert_eq!(host("  docs.rs "), "docs.rs");
    }

    #[test]
    fn test_full_url_drops_scheme_path_and_port() {
        assert_eq!(host("https://www.youtube.com/watch?v=abc"), "youtube.com");
        assert_eq!(host("http://localhost:3000/app"), "localhost");
        assert_eq!(host("localhost:3000"), "localhost");
        assert_eq!(host("news.ycombinator.com."), "news.ycombinator.com");
    }

    #[test]
    fn test_non_web_schemes_are_invalid() {
        for input in [
            "chrome://newtab",
            "chrome-extension://abcdef/popup.html",
            "about:blank",
            "file:///Users/me/notes.txt",
            "javascript:void(0)",
            "data:text/plain,hello",
            "view-source:https://example.com",
            "mailto:someone@example.com",
        ] {
            assert!(
                matches!(Domain::parse(input), Err(EngineError::InvalidDomain { .. })),
                "{input} should be invalid"
            );
        }
    }

    #[test]
    fn test_empty_and_hostless_inputs_are_invalid() {
        assert!(Domain::parse("").is_err());
        assert!(Domain::parse("   ").is_err());
        assert!(Domain::parse("https://").is_err());
        assert!(Domain::parse("www.").is_err());
    }
}
