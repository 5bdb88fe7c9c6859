//! Markup helpers
//!
//! Regex-based extraction over raw HTML and sitemap XML. No DOM, no
//! JavaScript: only what an agent sees in the response body.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static LOC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<loc>\s*(?:<!\[CDATA\[)?\s*(.*?)\s*(?:\]\]>)?\s*</loc>").expect("loc regex")
});

static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("href regex")
});

static PRODUCT_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/(products?|p|items?)/[^/?#]").expect("product path regex"));

static LD_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("ld+json regex")
});

static META_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("meta regex"));

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\b([a-z:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attr regex")
});

static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("h1 regex"));

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));

static PASSWORD_INPUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<input[^>]*type\s*=\s*["']?password"#).expect("password regex")
});

const CAPTCHA_MARKERS: &[&str] = &[
    "g-recaptcha",
    "h-captcha",
    "hcaptcha.com",
    "cf-turnstile",
    "challenges.cloudflare.com",
    "cf-challenge",
    "captcha-delivery.com",
    "px-captcha",
    "are you a robot",
    "verify you are human",
];

const LOGIN_WALL_MARKERS: &[&str] = &[
    "sign in to continue",
    "log in to continue",
    "login to continue",
    "sign in to checkout",
    "log in to checkout",
    "please sign in",
    "please log in",
    "must be logged in",
    "login required",
    "create an account to continue",
];

const GUEST_MARKERS: &[&str] = &[
    "guest checkout",
    "checkout as guest",
    "check out as guest",
    "continue as guest",
    "continue without an account",
    "without signing in",
];

/// Guest checkout form markers; their presence is a visible guest option
const CHECKOUT_FORM_MARKERS: &[&str] = &[
    "name=\"checkout\"",
    "name='checkout'",
    "woocommerce-checkout",
    "billing_",
    "billing details",
    "billing address",
    "shipping address",
    "contact information",
];

/// Whether the body carries CAPTCHA or bot-challenge markers
pub fn has_captcha(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    CAPTCHA_MARKERS.iter().any(|m| lower.contains(m))
}

/// Whether the page demands login with no visible guest option
///
/// A password field or login phrase only walls the page when neither a
/// guest phrase nor a checkout/billing form sits next to it.
pub fn has_login_wall(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    let walled =
        PASSWORD_INPUT_RE.is_match(html) || LOGIN_WALL_MARKERS.iter().any(|m| lower.contains(m));
    let guest_option = GUEST_MARKERS.iter().any(|m| lower.contains(m))
        || CHECKOUT_FORM_MARKERS.iter().any(|m| lower.contains(m));
    walled && !guest_option
}

/// Whether a path looks like an account or login page
pub fn is_login_path(location: &str) -> bool {
    let path = url_path(location).to_ascii_lowercase();
    ["/login", "/signin", "/sign-in", "/sign_in", "/account", "/my-account", "/auth"]
        .iter()
        .any(|p| path.contains(p))
}

pub fn is_sitemap_index(xml: &str) -> bool {
    xml.contains("<sitemapindex")
}

/// `<loc>` entries of a sitemap or sitemap index, in document order
pub fn sitemap_locs(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Raw `href` values of anchors, in document order
pub fn anchor_hrefs(html: &str) -> Vec<String> {
    HREF_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .collect()
}

/// Whether the URL path matches `/product(s)/`, `/p/` or `/item(s)/`
pub fn is_product_path(url: &str) -> bool {
    PRODUCT_PATH_RE.is_match(url_path(url))
}

/// Path (plus query) part of an absolute or relative URL
pub fn url_path(url: &str) -> &str {
    match url.find("://") {
        Some(idx) => {
            let rest = &url[idx + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "/",
            }
        }
        None => url,
    }
}

/// Host part of an absolute URL, lowercased
pub fn url_host(url: &str) -> Option<String> {
    let rest = &url[url.find("://")? + 3..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..end];
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// Resolve `href` against `base_url` (scheme + host, no trailing slash)
///
/// Returns `None` for non-navigational links (`mailto:`, `javascript:`, ...).
pub fn resolve_url(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || ["mailto:", "javascript:", "tel:", "data:"]
            .iter()
            .any(|p| lower.starts_with(p))
    {
        return None;
    }

    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        let scheme = base_url.split("://").next().unwrap_or("https");
        return Some(format!("{}://{}", scheme, rest));
    }

    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        Some(format!("{}{}", base, href))
    } else {
        Some(format!("{}/{}", base, href))
    }
}

/// Product fields found in a structured Product block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub sku: Option<String>,
    pub availability: Option<String>,
}

/// Parse every JSON-LD block and return the first Product entity
pub fn structured_product(html: &str) -> Option<StructuredProduct> {
    LD_JSON_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str().trim()).ok())
        .find_map(|doc| find_product(&doc).map(extract_product))
}

fn is_product_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == "Product" || t.ends_with("/Product"),
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| t.as_str().is_some_and(|t| t == "Product")),
        _ => false,
    }
}

fn find_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if is_product_type(value) {
                return Some(value);
            }
            ["@graph", "mainEntity", "itemListElement", "item"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(find_product)
        }
        Value::Array(items) => items.iter().find_map(find_product),
        _ => None,
    }
}

fn extract_product(value: &Value) -> StructuredProduct {
    let offer = match value.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        Some(offer @ Value::Object(_)) => Some(offer),
        _ => None,
    };

    let price = offer.and_then(|o| {
        o.get("price")
            .or_else(|| o.get("lowPrice"))
            .and_then(number_field)
    });
    let currency = offer.and_then(|o| string_field(o.get("priceCurrency")));
    let availability = offer
        .and_then(|o| string_field(o.get("availability")))
        .map(|a| a.rsplit('/').next().unwrap_or(&a).to_string());
    let sku = string_field(value.get("sku"))
        .or_else(|| offer.and_then(|o| string_field(o.get("sku"))));

    StructuredProduct {
        name: string_field(value.get("name")).map(|n| decode_entities(&n)),
        price,
        currency,
        sku,
        availability,
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// `content` of the first `<meta>` whose `property` or `name` equals `key`
pub fn meta_content(html: &str, key: &str) -> Option<String> {
    META_RE.find_iter(html).find_map(|tag| {
        let mut matched = false;
        let mut content = None;
        for attr in ATTR_RE.captures_iter(tag.as_str()) {
            let name = attr.get(1).map(|m| m.as_str().to_ascii_lowercase());
            let value = attr.get(2).or_else(|| attr.get(3)).map(|m| m.as_str());
            match (name.as_deref(), value) {
                (Some("property") | Some("name"), Some(v)) if v.eq_ignore_ascii_case(key) => {
                    matched = true
                }
                (Some("content"), Some(v)) => content = Some(decode_entities(v.trim())),
                _ => {}
            }
        }
        if matched {
            content.filter(|c| !c.is_empty())
        } else {
            None
        }
    })
}

/// Product name from page metadata or headings: og:title, then h1, then title
pub fn fallback_name(html: &str) -> Option<String> {
    meta_content(html, "og:title")
        .or_else(|| inner_text(&H1_RE, html))
        .or_else(|| inner_text(&TITLE_RE, html))
}

fn inner_text(re: &Regex, html: &str) -> Option<String> {
    let raw = re.captures(html)?.get(1)?.as_str();
    let text = TAG_RE.replace_all(raw, " ");
    let text = decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}
