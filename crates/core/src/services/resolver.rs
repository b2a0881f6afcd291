//! Pinterest short-link resolution.
//!
//! Short links (`pin.it/...`) hide the stable pin ID behind a redirect
//! chain. Resolution tries the cheapest signal first: pattern-match the URL
//! itself, then follow redirects with HEAD, then GET, and as a last resort
//! scan the page body for an embedded ID or deep link. URL variants
//! (bare-domain and `www.`) are tried in sequence, short-circuiting on the
//! first hit.
//!
//! "No ID found" is a clean, structured failure; only transport or setup
//! faults surface as errors.

use std::sync::LazyLock;
use std::time::Duration;

use pollboard_common::{config::ResolverConfig, AppError, AppResult};
use regex::Regex;
use serde::Serialize;

static PIN_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"pinterest\.[a-z.]+/pin/(\d+)").unwrap()
});

static DEEP_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"pinterest://pin/(\d+)").unwrap()
});

static CANONICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"rel="canonical"[^>]*href="[^"]*/pin/(\d+)"#).unwrap()
});

static EMBEDDED_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#""pin_id"\s*:\s*"?(\d+)"#).unwrap()
});

/// Result of a resolution attempt.
///
/// `pin_id == None` means resolution failed cleanly: the URL was reachable
/// but no pin ID could be recovered.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutcome {
    #[serde(rename = "pinId")]
    pub pin_id: Option<String>,
    #[serde(rename = "resolvedUrl")]
    pub resolved_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Stateless resolver for Pinterest short links.
#[derive(Clone)]
pub struct PinResolver {
    client: reqwest::Client,
}

impl PinResolver {
    /// Build a resolver from configuration.
    pub fn new(config: &ResolverConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Resolve a short link to a pin ID.
    pub async fn resolve(&self, url: &str) -> AppResult<ResolveOutcome> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::BadRequest("Missing url".to_string()));
        }
        url::Url::parse(url).map_err(|_| AppError::BadRequest("Invalid url".to_string()))?;

        // The URL may already carry the ID.
        if let Some(pin_id) = extract_pin_id(url) {
            return Ok(ResolveOutcome {
                pin_id: Some(pin_id),
                resolved_url: url.to_string(),
                error: None,
            });
        }

        let mut last_final_url = url.to_string();

        for variant in url_variants(url) {
            // HEAD first: redirects resolve without a body transfer.
            if let Ok(resp) = self.client.head(&variant).send().await {
                let final_url = resp.url().to_string();
                if let Some(pin_id) = extract_pin_id(&final_url) {
                    return Ok(ResolveOutcome {
                        pin_id: Some(pin_id),
                        resolved_url: final_url,
                        error: None,
                    });
                }
                last_final_url = final_url;
            }

            // GET: some hosts only redirect on GET, and the body may carry
            // the ID even when the final URL does not.
            if let Ok(resp) = self.client.get(&variant).send().await {
                let final_url = resp.url().to_string();
                if let Some(pin_id) = extract_pin_id(&final_url) {
                    return Ok(ResolveOutcome {
                        pin_id: Some(pin_id),
                        resolved_url: final_url,
                        error: None,
                    });
                }
                last_final_url.clone_from(&final_url);

                if let Ok(body) = resp.text().await {
                    if let Some(pin_id) = extract_pin_id_from_body(&body) {
                        return Ok(ResolveOutcome {
                            pin_id: Some(pin_id),
                            resolved_url: final_url,
                            error: None,
                        });
                    }
                }
            }
        }

        tracing::debug!(url, final_url = %last_final_url, "no pin id recovered");
        Ok(ResolveOutcome {
            pin_id: None,
            resolved_url: last_final_url,
            error: Some("Could not extract a pin ID from this link".to_string()),
        })
    }
}

/// URL variants to try, most specific first.
fn url_variants(url: &str) -> Vec<String> {
    let mut variants = vec![url.to_string()];
    if let Some(rest) = url.strip_prefix("https://pin.it/") {
        variants.push(format!("https://www.pin.it/{rest}"));
    } else if let Some(rest) = url.strip_prefix("https://www.pin.it/") {
        variants.push(format!("https://pin.it/{rest}"));
    }
    variants
}

/// Extract a pin ID from a URL via path or deep-link patterns.
fn extract_pin_id(url: &str) -> Option<String> {
    PIN_PATH_RE
        .captures(url)
        .or_else(|| DEEP_LINK_RE.captures(url))
        .map(|c| c[1].to_string())
}

/// Extract a pin ID from page HTML: canonical link, deep link, or embedded
/// JSON, in that order of trust.
fn extract_pin_id_from_body(body: &str) -> Option<String> {
    CANONICAL_RE
        .captures(body)
        .or_else(|| PIN_PATH_RE.captures(body))
        .or_else(|| DEEP_LINK_RE.captures(body))
        .or_else(|| EMBEDDED_ID_RE.captures(body))
        .map(|c| c[1].to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_pin_url() {
        assert_eq!(
            extract_pin_id("https://www.pinterest.com/pin/1234567890/"),
            Some("1234567890".to_string())
        );
        assert_eq!(
            extract_pin_id("https://pinterest.co.uk/pin/42"),
            Some("42".to_string())
        );
    }

    #[test]
    fn extracts_id_from_deep_link() {
        assert_eq!(
            extract_pin_id("pinterest://pin/987654321"),
            Some("987654321".to_string())
        );
    }

    #[test]
    fn short_link_has_no_embedded_id() {
        assert_eq!(extract_pin_id("https://pin.it/AbCdEf123"), None);
    }

    #[test]
    fn extracts_id_from_canonical_link() {
        let body = r#"<link rel="canonical" href="https://www.pinterest.com/pin/555666777/"/>"#;
        assert_eq!(
            extract_pin_id_from_body(body),
            Some("555666777".to_string())
        );
    }

    #[test]
    fn extracts_id_from_embedded_json() {
        let body = r#"{"resource":{"options":{"pin_id":"111222333"}}}"#;
        assert_eq!(
            extract_pin_id_from_body(body),
            Some("111222333".to_string())
        );
    }

    #[test]
    fn body_without_id_yields_none() {
        assert_eq!(extract_pin_id_from_body("<html><body>nope</body></html>"), None);
    }

    #[test]
    fn variants_cover_www_prefix() {
        let variants = url_variants("https://pin.it/xyz");
        assert_eq!(variants.len(), 2);
        assert!(variants[1].contains("www.pin.it"));
    }
}
