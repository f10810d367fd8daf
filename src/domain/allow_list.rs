//! Host allow-list used to decide whether a candidate URL is admissible

use url::Url;

/// Set of allowed hosts. An empty list admits every URL.
///
/// A URL is admitted when its host equals an entry or is a subdomain of it,
/// compared case-insensitively on the host component only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostAllowList {
    domains: Vec<String>,
}

impl HostAllowList {
    #[must_use]
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Returns true if `url` passes the allow-list. Unparseable URLs never pass
    /// a non-empty list.
    #[must_use]
    pub fn admits(&self, url: &str) -> bool {
        if self.domains.is_empty() {
            return true;
        }

        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        else {
            return false;
        };

        self.domains.iter().any(|domain| host_matches(&host, domain))
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
