//! Discovery: locate candidate product URLs with no prior site knowledge
//!
//! Sitemap first (following one product-looking child of a sitemap index),
//! then homepage anchors. First source with candidates wins.

use crate::probe::context::{DiscoveryOutput, DiscoverySource, FailureReason, StepFailure, StepOutcome};
use crate::probe::markup;
use crate::probe::steps::StepEnv;
use crate::transport::RedirectPolicy;

pub fn run_discovery(env: &StepEnv<'_>) -> StepOutcome<DiscoveryOutput> {
    let (candidates, source) = {
        let from_sitemap = sitemap_candidates(env);
        if from_sitemap.is_empty() {
            (homepage_candidates(env), DiscoverySource::Homepage)
        } else {
            (from_sitemap, DiscoverySource::Sitemap)
        }
    };

    match candidates.first() {
        Some(first) => Ok(DiscoveryOutput {
            product_url: first.clone(),
            candidate_urls: candidates,
            source,
        }),
        None => Err(StepFailure::new(
            FailureReason::NoProductUrls,
            "No product URLs found in /sitemap.xml or homepage links",
        )),
    }
}

/// Body of a 2xx GET, or `None` on any error
fn fetch_ok(env: &StepEnv<'_>, url: &str) -> Option<String> {
    match env.get(url, RedirectPolicy::Follow) {
        Ok(response) if response.is_success() => Some(response.body),
        Ok(response) => {
            tracing::debug!(url, status = response.status, "discovery source unavailable");
            None
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "discovery source unreachable");
            None
        }
    }
}

fn sitemap_candidates(env: &StepEnv<'_>) -> Vec<String> {
    let Some(xml) = fetch_ok(env, &env.url("/sitemap.xml")) else {
        return Vec::new();
    };

    let locs = if markup::is_sitemap_index(&xml) {
        let child = markup::sitemap_locs(&xml)
            .into_iter()
            .find(|loc| loc.to_ascii_lowercase().contains("product"));
        match child.and_then(|url| fetch_ok(env, &url)) {
            Some(child_xml) => markup::sitemap_locs(&child_xml),
            None => Vec::new(),
        }
    } else {
        markup::sitemap_locs(&xml)
    };

    collect_candidates(locs, env.config.max_candidates)
}

fn homepage_candidates(env: &StepEnv<'_>) -> Vec<String> {
    let Some(html) = fetch_ok(env, &env.url("/")) else {
        return Vec::new();
    };

    let base_host = markup::url_host(env.base_url);
    let links = markup::anchor_hrefs(&html)
        .into_iter()
        .filter_map(|href| markup::resolve_url(env.base_url, &href))
        .filter(|url| same_site(markup::url_host(url).as_deref(), base_host.as_deref()));

    collect_candidates(links, env.config.max_candidates)
}

fn same_site(host: Option<&str>, base: Option<&str>) -> bool {
    match (host, base) {
        (Some(host), Some(base)) => {
            host.trim_start_matches("www.") == base.trim_start_matches("www.")
        }
        _ => false,
    }
}

/// Product-looking URLs, fragments stripped, deduplicated, order kept
fn collect_candidates<I: IntoIterator<Item = String>>(urls: I, limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for url in urls {
        let url = match url.find('#') {
            Some(idx) => url[..idx].to_string(),
            None => url,
        };
        if markup::is_product_path(&url) && !out.contains(&url) {
            out.push(url);
            if out.len() >= limit {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::transport::FakeTransport;

    const BASE: &str = "https://shop.test";

    fn run(transport: &FakeTransport) -> StepOutcome<DiscoveryOutput> {
        let config = ProbeConfig::for_tests();
        let env = StepEnv::new(transport, &config, BASE);
        run_discovery(&env)
    }

    #[test]
    fn test_sitemap_urlset() {
        let transport = FakeTransport::new().with_get(
            "https://shop.test/sitemap.xml",
            200,
            r#"<urlset>
                <url><loc>https://shop.test/about</loc></url>
                <url><loc>https://shop.test/products/mug</loc></url>
                <url><loc>https://shop.test/products/mug</loc></url>
                <url><loc>https://shop.test/items/lamp</loc></url>
            </urlset>"#,
        );

        let out = run(&transport).unwrap();
        assert_eq!(out.source, DiscoverySource::Sitemap);
        assert_eq!(out.product_url, "https://shop.test/products/mug");
        assert_eq!(
            out.candidate_urls,
            vec![
                "https://shop.test/products/mug".to_string(),
                "https://shop.test/items/lamp".to_string()
            ]
        );
    }

    #[test]
    fn test_sitemap_index_follows_product_child() {
        let transport = FakeTransport::new()
            .with_get(
                "https://shop.test/sitemap.xml",
                200,
                r#"<sitemapindex>
                    <sitemap><loc>https://shop.test/sitemap_pages_1.xml</loc></sitemap>
                    <sitemap><loc>https://shop.test/sitemap_products_1.xml</loc></sitemap>
                </sitemapindex>"#,
            )
            .with_get(
                "https://shop.test/sitemap_products_1.xml",
                200,
                "<urlset><url><loc>https://shop.test/products/tee</loc></url></urlset>",
            );

        let out = run(&transport).unwrap();
        assert_eq!(out.product_url, "https://shop.test/products/tee");
        let fetched: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert!(!fetched.contains(&"https://shop.test/sitemap_pages_1.xml".to_string()));
    }

    #[test]
    fn test_homepage_fallback_filters_foreign_hosts() {
        let transport = FakeTransport::new()
            .with_get("https://shop.test/sitemap.xml", 404, "")
            .with_get(
                "https://shop.test/",
                200,
                r##"<a href="https://other.test/products/x">x</a>
                    <a href="/products/scarf#reviews">Scarf</a>
                    <a href="https://www.shop.test/p/123">Hat</a>
                    <a href="/pages/contact">Contact</a>"##,
            );

        let out = run(&transport).unwrap();
        assert_eq!(out.source, DiscoverySource::Homepage);
        assert_eq!(
            out.candidate_urls,
            vec![
                "https://shop.test/products/scarf".to_string(),
                "https://www.shop.test/p/123".to_string()
            ]
        );
    }

    #[test]
    fn test_no_candidates_anywhere() {
        let transport = FakeTransport::new()
            .with_network_error("https://shop.test/sitemap.xml", "connection refused")
            .with_get("https://shop.test/", 200, "<a href=\"/about\">About</a>");

        let failure = run(&transport).unwrap_err();
        assert_eq!(failure.reason, FailureReason::NoProductUrls);
        assert!(failure.message.contains("/sitemap.xml"));
        assert!(failure.message.contains("homepage"));
    }

    #[test]
    fn test_candidate_limit() {
        let urls = (0..10).map(|i| format!("https://shop.test/products/{}", i));
        assert_eq!(collect_candidates(urls, 3).len(), 3);
    }
}
