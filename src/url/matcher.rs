/// Checks whether a host falls inside the allowed crawl domain
///
/// Three forms are accepted for `allowed`:
/// 1. Exact: "example.com" matches only "example.com" unless
///    `include_subdomains` is set
/// 2. Exact with subdomains: with `include_subdomains`, "example.com" also
///    matches "blog.example.com" and "api.v2.example.com"
/// 3. Wildcard: "*.example.com" always matches the bare domain and every
///    subdomain, regardless of `include_subdomains`
///
/// Comparison is case-insensitive on both sides.
///
/// # Examples
///
/// ```
/// use sumi_sift::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com", false));
/// assert!(!matches_domain("blog.example.com", "example.com", false));
/// assert!(matches_domain("blog.example.com", "example.com", true));
/// assert!(matches_domain("blog.example.com", "*.example.com", false));
/// assert!(!matches_domain("other.org", "example.com", true));
/// ```
pub fn matches_domain(host: &str, allowed: &str, include_subdomains: bool) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let allowed = allowed.trim().to_ascii_lowercase();

    let (base, subdomains) = match allowed.strip_prefix("*.") {
        Some(base) => (base, true),
        None => (allowed.as_str(), include_subdomains),
    };

    if base.is_empty() {
        return false;
    }

    host == base || (subdomains && host.ends_with(&format!(".{}", base)))
}
