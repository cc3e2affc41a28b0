//! URL and hostname helpers for the matching hot path
//!
//! These functions avoid allocations and work directly on string slices.

// =============================================================================
// Scheme / Host Extraction
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for i in scheme_end..bytes.len() {
        if bytes[i] == b'@' {
            host_start = i + 1;
            break;
        }
        if bytes[i] == b'/' {
            break;
        }
    }

    // Find host end
    let mut host_end = bytes.len();
    for i in host_start..bytes.len() {
        let b = bytes[i];
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    if host_start == host_end {
        return None;
    }
    Some(&url[host_start..host_end])
}

// =============================================================================
// Separator Class
// =============================================================================

/// A separator (the `^` placeholder) matches any character outside
/// `[A-Za-z0-9_.%-]`, or the end of the URL.
#[inline]
pub fn is_separator_char(b: u8) -> bool {
    !(b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'%' || b == b'-')
}

// =============================================================================
// Hostname Suffix Walk
// =============================================================================

/// Iterate the dot-suffixes of a hostname from most specific to the TLD.
///
/// "a.b.example.com" yields "a.b.example.com", "b.example.com",
/// "example.com", "com".
pub fn walk_host_suffixes(host: &str) -> impl Iterator<Item = &str> {
    let mut next: Option<&str> = if host.is_empty() { None } else { Some(host) };
    std::iter::from_fn(move || {
        let current = next?;
        next = current.find('.').map(|dot| &current[dot + 1..]);
        Some(current)
    })
}

// =============================================================================
// Domain Matching
// =============================================================================

/// Match a rule domain pattern against a hostname.
///
/// A plain pattern matches the hostname itself and all of its subdomains.
/// A pattern containing `*` is matched label-wise, where `*` stands for one
/// or more labels: `*.example.com` matches `a.example.com` but not
/// `example.com`.
pub fn domain_matches(pattern: &str, hostname: &str) -> bool {
    if pattern.is_empty() || hostname.is_empty() {
        return false;
    }

    if !pattern.contains('*') {
        return hostname == pattern
            || (hostname.len() > pattern.len()
                && hostname.ends_with(pattern)
                && hostname.as_bytes()[hostname.len() - pattern.len() - 1] == b'.');
    }

    glob_labels(
        &pattern.split('.').collect::<Vec<_>>(),
        &hostname.split('.').collect::<Vec<_>>(),
    )
}

fn glob_labels(pattern: &[&str], labels: &[&str]) -> bool {
    match (pattern.first(), labels.first()) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(&"*"), Some(_)) => {
            // One or more labels
            glob_labels(&pattern[1..], &labels[1..]) || glob_labels(pattern, &labels[1..])
        }
        (Some(&p), Some(&l)) => p == l && glob_labels(&pattern[1..], &labels[1..]),
    }
}

// =============================================================================
// Third-Party Check
// =============================================================================

/// Registrable-domain approximation: the last two labels of a hostname.
/// No Public Suffix List is consulted, so "example.co.uk" yields "co.uk";
/// good enough for first/third-party partitioning of filter rules.
pub fn registrable_domain(host: &str) -> &str {
    let mut dots = host.rmatch_indices('.');
    let _last = dots.next();
    match dots.next() {
        Some((i, _)) => &host[i + 1..],
        None => host,
    }
}

/// A request is third-party when its host and the source host resolve to
/// different registrable domains.
pub fn is_third_party(host: &str, source_host: &str) -> bool {
    registrable_domain(host) != registrable_domain(source_host)
}
