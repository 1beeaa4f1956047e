/// Target page for the authority check of a domain.
pub fn authority_check_url(domain: &str) -> String {
    format!("https://ahrefs.com/website-authority-checker/?input={domain}")
}

/// Parse a human-formatted metric count ("823", "1.2K", "3.4M", "12,345").
///
/// Returns None for empty or non-numeric text.
pub fn parse_metric_count(raw: &str) -> Option<u64> {
    let value = raw.trim().replace(',', "");
    if value.is_empty() {
        return None;
    }

    if let Some(stripped) = value.strip_suffix(['K', 'k']) {
        return stripped.parse::<f64>().ok().map(|v| (v * 1_000.0) as u64);
    }
    if let Some(stripped) = value.strip_suffix(['M', 'm']) {
        return stripped
            .parse::<f64>()
            .ok()
            .map(|v| (v * 1_000_000.0) as u64);
    }

    value.parse::<f64>().ok().map(|v| v as u64)
}

/// Validate a submitted domain name.
///
/// Submissions are bare hostnames ("example.com"), not URLs. We reject
/// obvious garbage here so it never reaches the queue; anything that parses
/// as a host is accepted and the analytics site decides the rest.
pub fn validate_domain(domain: &str) -> Result<(), String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err("domain must not be empty".to_string());
    }
    if domain.contains("://") || domain.contains('/') {
        return Err("domain must be a bare hostname, not a URL".to_string());
    }
    if domain.contains(char::is_whitespace) {
        return Err("domain must not contain whitespace".to_string());
    }
    if !domain.contains('.') {
        return Err("domain must contain at least one dot".to_string());
    }

    let probe = format!("http://{domain}");
    match url::Url::parse(&probe) {
        Ok(parsed) if parsed.host_str() == Some(domain) => Ok(()),
        _ => Err(format!("'{domain}' is not a valid hostname")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(parse_metric_count("823"), Some(823));
        assert_eq!(parse_metric_count("12,345"), Some(12_345));
        assert_eq!(parse_metric_count("0"), Some(0));
    }

    #[test]
    fn test_parse_suffixed_numbers() {
        assert_eq!(parse_metric_count("1.2K"), Some(1_200));
        assert_eq!(parse_metric_count("3.4M"), Some(3_400_000));
        assert_eq!(parse_metric_count("15K"), Some(15_000));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_metric_count(""), None);
        assert_eq!(parse_metric_count("N/A"), None);
        assert_eq!(parse_metric_count("-"), None);
    }

    #[test]
    fn test_validate_accepts_hostnames() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("sub.example.co.uk").is_ok());
    }

    #[test]
    fn test_validate_rejects_urls_and_garbage() {
        assert!(validate_domain("").is_err());
        assert!(validate_domain("https://example.com").is_err());
        assert!(validate_domain("example.com/path").is_err());
        assert!(validate_domain("not a domain.com").is_err());
        assert!(validate_domain("localhost").is_err());
    }

    #[test]
    fn test_authority_check_url() {
        assert_eq!(
            authority_check_url("example.com"),
            "https://ahrefs.com/website-authority-checker/?input=example.com"
        );
    }
}
