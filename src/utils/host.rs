//! `Host` header normalization.

/// Normalizes a raw `Host` value for domain lookup.
///
/// Strips the port and lowercases the rest. IPv6 literals keep their
/// brackets (`[::1]:8080` becomes `[::1]`).
///
/// # Examples
///
/// ```
/// use shortlink::utils::host::normalize_host;
///
/// assert_eq!(normalize_host("Go.Example.com:8080"), "go.example.com");
/// ```
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();

    let name = if host.starts_with('[') {
        match host.find(']') {
            Some(end_bracket) => &host[..=end_bracket],
            None => host,
        }
    } else {
        host.split(':').next().unwrap_or(host)
    };

    name.to_ascii_lowercase()
}
