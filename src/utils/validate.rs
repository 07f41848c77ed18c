use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^\s/?#]+[^\s]*$").expect("Invalid url regex")
});

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("Invalid scheme regex"));

/// 规范化提交网址：去除首尾空白，缺少协议时补 http://
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() || SCHEME_RE.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

pub fn validate_url(url: &str) -> Result<(), &'static str> {
    if url.is_empty() {
        return Err("URL must not be empty");
    }
    if !URL_RE.is_match(url) {
        return Err("URL format is invalid");
    }
    Ok(())
}

pub fn validate_long_text(text: &str, max_length: usize) -> Result<(), String> {
    let length = text.chars().count();
    if length > max_length {
        return Err(format!(
            "Text is too long ({length} characters, maximum is {max_length})"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("  example.com/a "), "http://example.com/a");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/path?q=1").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert_eq!(validate_url(""), Err("URL must not be empty"));
        assert_eq!(
            validate_url("http://exa mple.com"),
            Err("URL format is invalid")
        );
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_validate_long_text() {
        assert!(validate_long_text("short", 10).is_ok());
        let err = validate_long_text("0123456789ab", 10).unwrap_err();
        assert!(err.contains("maximum is 10"));
    }
}
