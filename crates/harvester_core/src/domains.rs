//! Static domain lists shared by the crawler and the validator.

/// Large social/media platforms whose pages are never worth crawling.
pub const DISALLOWED_HOSTS: &[&str] = &[
    "google.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "youtube.com",
    "linkedin.com",
    "pinterest.com",
    "reddit.com",
    "tumblr.com",
    "yahoo.com",
    "aparat.com",
    "x.com",
    "t.me",
];

/// Path suffixes of non-HTML resources. Compared against the lower-cased path.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".jpg", ".jpeg",
    ".png", ".gif", ".bmp", ".webp", ".svg", ".ico", ".mp3", ".mp4", ".mov", ".avi", ".mkv",
    ".webm",
];

/// A search engine's outbound redirect endpoint and the query parameter
/// carrying the real destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRedirect {
    pub domain: &'static str,
    pub path: &'static str,
    pub param: &'static str,
}

pub const SEARCH_ENGINE_HOSTS: &[&str] = &[
    "google.com",
    "bing.com",
    "duckduckgo.com",
    "html.duckduckgo.com",
    "search.yahoo.com",
    "yandex.com",
    "startpage.com",
];

pub const SEARCH_REDIRECTS: &[SearchRedirect] = &[
    SearchRedirect {
        domain: "google.com",
        path: "/url",
        param: "q",
    },
    SearchRedirect {
        domain: "duckduckgo.com",
        path: "/l/",
        param: "uddg",
    },
    SearchRedirect {
        domain: "html.duckduckgo.com",
        path: "/l/",
        param: "uddg",
    },
];

/// Disposable inboxes and placeholder domains that never count as deliverable.
pub const DENYLISTED_EMAIL_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "sharklasers.com",
    "10minutemail.com",
    "tempmail.com",
    "temp-mail.org",
    "yopmail.com",
    "trashmail.com",
    "getnada.com",
    "dispostable.com",
    "maildrop.cc",
    "throwawaymail.com",
    "fakeinbox.com",
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "domain.com",
    "yourdomain.com",
    "sentry.io",
    "wixpress.com",
    "sentry.wixpress.com",
];

/// Major mailbox providers trusted without a DNS lookup.
pub const TRUSTED_EMAIL_PROVIDERS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "live.com",
    "msn.com",
    "icloud.com",
    "me.com",
    "aol.com",
    "protonmail.com",
    "proton.me",
    "yandex.com",
    "mail.ru",
];

/// Host with a leading `www.` removed, lower-cased.
pub fn registrable_domain(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

pub fn is_search_engine_domain(domain: &str) -> bool {
    SEARCH_ENGINE_HOSTS.contains(&domain)
}

pub fn is_denylisted_email_domain(domain: &str) -> bool {
    DENYLISTED_EMAIL_DOMAINS.contains(&domain.to_ascii_lowercase().as_str())
}

pub fn is_trusted_email_provider(domain: &str) -> bool {
    TRUSTED_EMAIL_PROVIDERS.contains(&domain.to_ascii_lowercase().as_str())
}
