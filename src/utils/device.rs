//! Device classification from the User-Agent header.
//!
//! Produces the coarse device classes that targeting allow-lists are written
//! against. The class is stored on click events as an opaque reporting hint
//! and compared against `allowed_devices` by the access policy.

use woothee::parser::Parser;

/// Buckets a User-Agent into `desktop`, `mobile`, `tablet`, or `bot`.
///
/// Returns `None` when the string is unrecognizable, which a restricted
/// allow-list treats as non-matching.
pub fn classify(user_agent: &str) -> Option<&'static str> {
    // woothee files tablets under smartphone; disambiguate first.
    let lowered = user_agent.to_ascii_lowercase();
    if lowered.contains("ipad") || lowered.contains("tablet") {
        return Some("tablet");
    }

    let parsed = Parser::new().parse(user_agent)?;

    match parsed.category {
        "pc" => Some("desktop"),
        "smartphone" | "mobilephone" => Some("mobile"),
        "crawler" => Some("bot"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
    const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    #[test]
    fn test_desktop_browser() {
        assert_eq!(classify(CHROME_DESKTOP), Some("desktop"));
    }

    #[test]
    fn test_phone() {
        assert_eq!(classify(IPHONE), Some("mobile"));
    }

    #[test]
    fn test_tablet() {
        assert_eq!(classify(IPAD), Some("tablet"));
    }

    #[test]
    fn test_crawler() {
        assert_eq!(classify(GOOGLEBOT), Some("bot"));
    }

    #[test]
    fn test_garbage_is_unclassified() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("definitely not a browser"), None);
    }
}
