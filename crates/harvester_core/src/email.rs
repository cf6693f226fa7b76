//! The single email pattern used for harvesting (unanchored) and
//! validation (anchored).
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

// Asset names such as `logo@2x.png` also match; the validator's MX check rejects them.
const ADDRESS_PATTERN: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,24}";

static ADDRESS_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{ADDRESS_PATTERN}\b")).expect("address pattern compiles")
});

static ADDRESS_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{ADDRESS_PATTERN}$")).expect("address pattern compiles")
});

/// Every distinct email-like substring of `text`, as written.
pub fn extract_emails(text: &str) -> BTreeSet<String> {
    ADDRESS_IN_TEXT
        .find_iter(text)
        .map(|found| found.as_str().to_string())
        .collect()
}

/// Address named by a `mailto:` href, ignoring any `?subject=` suffix.
pub fn address_from_mailto(href: &str) -> Option<String> {
    let href = href.trim();
    let scheme = href.get(..7)?;
    if !scheme.eq_ignore_ascii_case("mailto:") {
        return None;
    }
    let target = href[7..].split('?').next().unwrap_or_default();
    ADDRESS_EXACT
        .is_match(target)
        .then(|| target.to_string())
}

/// Whole-string syntax check used by the validation stage.
pub fn is_valid_syntax(address: &str) -> bool {
    ADDRESS_EXACT.is_match(address)
}

/// Domain part of an address, if it has one.
pub fn email_domain(address: &str) -> Option<&str> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_addresses_from_prose() {
        let text = "Write to Sales@Shop.example.co.uk, or support@help.io. Not me@localhost.";
        let found: Vec<_> = extract_emails(text).into_iter().collect();
        assert_eq!(found, vec!["Sales@Shop.example.co.uk", "support@help.io"]);
    }

    #[test]
    fn rejects_overlong_top_label() {
        assert!(!is_valid_syntax("a@b.abcdefghijklmnopqrstuvwxyz"));
        assert!(extract_emails("a@b.abcdefghijklmnopqrstuvwxyz").is_empty());
    }

    #[test]
    fn mailto_strips_query() {
        assert_eq!(
            address_from_mailto("MAILTO:info@example.org?subject=hi"),
            Some("info@example.org".to_string())
        );
        assert_eq!(address_from_mailto("tel:+100"), None);
    }

    #[test]
    fn syntax_requires_whole_string() {
        assert!(is_valid_syntax("first.last+tag@mail.example.com"));
        assert!(!is_valid_syntax(" first@example.com"));
        assert!(!is_valid_syntax("first@example"));
        assert!(!is_valid_syntax("first@@example.com"));
    }
}
