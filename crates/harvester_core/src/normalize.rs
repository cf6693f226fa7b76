//! Canonical URL forms used as frontier keys, plus the crawl filters.
use url::Url;

use crate::domains::{
    is_search_engine_domain, registrable_domain, DISALLOWED_HOSTS, MEDIA_EXTENSIONS,
    SEARCH_REDIRECTS,
};

fn is_web_scheme(scheme: &str) -> bool {
    scheme == "http" || scheme == "https"
}

/// Canonical form of `raw`.
///
/// Web URLs get the `https` scheme, a lower-cased host and collapsed path
/// separators; query and fragment are kept as parsed. Anything that does not
/// parse as an `http`/`https` URL is returned unchanged.
pub fn normalize(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) if is_web_scheme(url.scheme()) => canonicalize(url),
        _ => raw.to_string(),
    }
}

/// Resolve `raw_link` against the page it was found on and normalize it.
///
/// The base is treated as a directory when its path lacks a trailing `/`,
/// and path-absolute references (`/about`) are taken relative to that
/// directory. Search-engine redirect wrappers are replaced by their real
/// destination. Returns `None` when the base or the joined reference does
/// not parse.
pub fn resolve(raw_link: &str, base_url: &str) -> Option<String> {
    let mut base = Url::parse(base_url).ok()?;
    if !base.cannot_be_a_base() && !base.path().ends_with('/') {
        let directory = format!("{}/", base.path());
        base.set_path(&directory);
    }

    let raw_link = raw_link.trim();
    let reference = match raw_link.strip_prefix('/') {
        Some(rest) if !rest.starts_with('/') => rest,
        _ => raw_link,
    };
    let joined = base.join(reference).ok()?;
    if let Some(target) = unwrap_search_redirect(&joined) {
        return Some(target);
    }
    if is_web_scheme(joined.scheme()) {
        Some(canonicalize(joined))
    } else {
        Some(joined.into())
    }
}

/// True for absolute `http`/`https` URLs.
pub fn is_web_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| is_web_scheme(parsed.scheme()) && parsed.host_str().is_some())
        .unwrap_or(false)
}

/// True if the host (minus a leading `www.`) is on the crawl block-list.
pub fn is_disallowed_host(url: &str) -> bool {
    domain_of(url)
        .map(|domain| DISALLOWED_HOSTS.contains(&domain.as_str()))
        .unwrap_or(false)
}

/// True if the URL path ends with a document, image or video extension.
pub fn is_media_or_document(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_ascii_lowercase();
    MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// True if the URL is served by a recognized search engine.
pub fn is_search_engine_url(url: &str) -> bool {
    domain_of(url)
        .map(|domain| is_search_engine_domain(&domain))
        .unwrap_or(false)
}

/// Host of `url` with a leading `www.` removed.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(registrable_domain)
}

fn canonicalize(mut url: Url) -> String {
    if url.scheme() == "http" {
        // http -> https is always permitted between special schemes.
        let _ = url.set_scheme("https");
    }
    let collapsed = collapse_separators(url.path());
    if collapsed != url.path() {
        url.set_path(&collapsed);
    }
    url.into()
}

fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(ch);
    }
    out
}

fn unwrap_search_redirect(url: &Url) -> Option<String> {
    let domain = registrable_domain(url.host_str()?);
    let redirect = SEARCH_REDIRECTS
        .iter()
        .find(|redirect| redirect.domain == domain && url.path() == redirect.path)?;
    let (_, target) = url
        .query_pairs()
        .find(|(key, value)| key == redirect.param && !value.is_empty())?;
    let target = Url::parse(&target).ok()?;
    if !is_web_scheme(target.scheme()) {
        return None;
    }
    Some(canonicalize(target))
}
