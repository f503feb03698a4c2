use url::Url;

/// Canonical form of a raw URL or app identifier.
///
/// `full` is the scheme-qualified address with the fragment removed and the
/// host lowercased; `domain` is the bare host (no `www.`, no port) and is the
/// input to the domain hasher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAddress {
    pub full: String,
    pub domain: String,
    pub path: String,
    pub query: String,
}

impl NormalizedAddress {
    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    /// Result cache key: the bare domain when the address has no path or
    /// query, otherwise the domain followed by the path and query as written.
    pub fn cache_key(&self) -> String {
        let rest = self
            .full
            .find("://")
            .map(|idx| &self.full[idx + 3..])
            .and_then(|after| after.find(['/', '?']).map(|i| &after[i..]))
            .unwrap_or("");

        if rest.is_empty() || rest == "/" {
            self.domain.clone()
        } else {
            format!("{}{}", self.domain, rest)
        }
    }
}

/// Normalizes arbitrary input. Never fails; when neither strict parsing nor
/// manual stripping yields a host, the lowercased trimmed input is returned.
pub fn normalize(input: &str) -> NormalizedAddress {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return NormalizedAddress {
            full: String::new(),
            domain: String::new(),
            path: String::new(),
            query: String::new(),
        };
    }

    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };

    let with_scheme = if without_fragment.contains("://") {
        without_fragment.to_string()
    } else {
        format!("https://{}", without_fragment)
    };

    if let Ok(url) = Url::parse(&with_scheme) {
        if let Some(host) = url.host_str() {
            let host = host.trim_end_matches('.').to_lowercase();
            let domain = strip_www(&host).to_string();
            if !domain.is_empty() {
                return NormalizedAddress {
                    full: url.to_string(),
                    domain,
                    path: url.path().to_lowercase(),
                    query: url.query().unwrap_or_default().to_lowercase(),
                };
            }
        }
    }

    manual_normalize(trimmed, without_fragment)
}

fn manual_normalize(trimmed: &str, without_fragment: &str) -> NormalizedAddress {
    let lowered = without_fragment.to_lowercase();

    let rest = match lowered.find("://") {
        Some(idx) => &lowered[idx + 3..],
        None => lowered.as_str(),
    };

    let host_end = rest.find(|c: char| c == '/' || c == '?').unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(host_end);

    // Drop credentials and port.
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);
    let domain = strip_www(host.trim_end_matches('.')).to_string();

    if domain.is_empty() {
        let fallback = trimmed.to_lowercase();
        return NormalizedAddress {
            full: fallback.clone(),
            domain: fallback,
            path: String::new(),
            query: String::new(),
        };
    }

    let (path, query) = match tail.find('?') {
        Some(idx) => (&tail[..idx], &tail[idx + 1..]),
        None => (tail, ""),
    };

    NormalizedAddress {
        full: format!("https://{}{}", domain, tail),
        domain,
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        query: query.to_string(),
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
