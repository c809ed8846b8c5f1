use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::DtdaError;

/// Hosts every DTDA deployment talks to.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "db.indra.bio",          // INDRA DB REST
    "www.cbioportal.org",    // cBioPortal public instance
    "localhost",             // Local mirrors
    "127.0.0.1",             // Localhost alt
];

/// An HTTP client that only issues requests to approved hosts.
///
/// Every outbound call of the statement and study clients goes through here,
/// so a misconfigured URL fails with `SecurityError` instead of leaking a
/// request (and the INDRA API key) to an arbitrary host.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Client with the default allowlist and the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, DtdaError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| DtdaError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let allowlist = DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect();
        Ok(Self { client, allowlist })
    }

    /// Client that additionally allows the hosts of the given base URLs.
    pub fn for_base_urls(base_urls: &[&str], timeout: Duration) -> Result<Self, DtdaError> {
        let mut sandbox = Self::new(timeout)?;
        for base in base_urls {
            let parsed = Url::parse(base)
                .map_err(|e| DtdaError::Config(format!("Invalid service URL {}: {}", base, e)))?;
            let host = parsed
                .host_str()
                .ok_or_else(|| DtdaError::Config(format!("Service URL has no host: {}", base)))?;
            sandbox.allow_domain(host);
        }
        Ok(sandbox)
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        // Exact match or a subdomain of an allowed host
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, DtdaError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, DtdaError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), DtdaError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            Err(DtdaError::SecurityError(format!(
                "Network capabilities capped: host not in allowlist for URL {}",
                url
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hosts_allowed() {
        let client = SandboxClient::new(Duration::from_secs(5)).unwrap();
        assert!(client.is_allowed("https://db.indra.bio/statements/from_agents"));
        assert!(client.is_allowed("https://www.cbioportal.org/api/studies"));
        assert!(!client.is_allowed("https://example.com/statements"));
        assert!(!client.is_allowed("not a url"));
    }

    #[test]
    fn test_base_urls_extend_allowlist() {
        let client = SandboxClient::for_base_urls(&["https://indra.example.org/api"], Duration::from_secs(5))
            .unwrap();
        assert!(client.is_allowed("https://indra.example.org/api/statements"));
        assert!(client.is_allowed("https://mirror.indra.example.org/x"));
        assert!(client.get("https://evil.example.net/").is_err());
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = SandboxClient::for_base_urls(&["::nope::"], Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, DtdaError::Config(_)));
    }
}
