//! Platform detection and strategy dispatch
//!
//! Each storefront family is one `PlatformStrategy`. Steps ask the strategy
//! for the family-specific behaviour (variant lookup, cart placement,
//! checkout paths) and never branch on the platform themselves. Adding a
//! platform means adding one implementation and one entry in `STRATEGIES`.

use crate::probe::context::{CartMethod, CartOutput, FailureReason, StepFailure, StepOutcome};
use crate::probe::markup;
use crate::probe::steps::StepEnv;
use crate::probe::types::Product;
use crate::transport::RedirectPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Storefront software family inferred from markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformTag {
    Shopify,
    WooCommerce,
    Unknown,
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformTag::Shopify => f.write_str("shopify"),
            PlatformTag::WooCommerce => f.write_str("woocommerce"),
            PlatformTag::Unknown => f.write_str("unknown"),
        }
    }
}

/// Capability interface for one platform family
pub trait PlatformStrategy: Send + Sync {
    fn tag(&self) -> PlatformTag;

    /// Whether the page markup carries this platform's signatures
    fn detect(&self, html: &str) -> bool;

    /// Machine-readable per-product endpoint, if the platform has one
    fn product_endpoint(&self, _product_url: &str) -> Option<String> {
        None
    }

    /// Cart-addable variant id from the product endpoint's body
    fn parse_variant_id(&self, _body: &str) -> Option<String> {
        None
    }

    /// Product title from the product endpoint's body
    fn parse_product_name(&self, _body: &str) -> Option<String> {
        None
    }

    /// Place `product` in a cart
    fn add_to_cart(&self, env: &StepEnv<'_>, product: &Product) -> StepOutcome<CartOutput>;

    /// Conventional checkout paths, most likely first
    fn checkout_paths(&self) -> &'static [&'static str];
}

static STRATEGIES: [&dyn PlatformStrategy; 2] = [&ShopifyStrategy, &WooCommerceStrategy];

/// Classify the platform from page markup
pub fn detect_platform(html: &str) -> PlatformTag {
    STRATEGIES
        .iter()
        .find(|s| s.detect(html))
        .map(|s| s.tag())
        .unwrap_or(PlatformTag::Unknown)
}

/// Strategy for a detected platform; unknown platforms get the generic one
pub fn strategy_for(tag: PlatformTag) -> &'static dyn PlatformStrategy {
    STRATEGIES
        .iter()
        .copied()
        .find(|s| s.tag() == tag)
        .unwrap_or(&GenericStrategy)
}

fn contains_any(html: &str, markers: &[&str]) -> bool {
    let lower = html.to_ascii_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Shopify-like storefronts: `/products/<handle>.js` and `/cart/add.js`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShopifyStrategy;

impl PlatformStrategy for ShopifyStrategy {
    fn tag(&self) -> PlatformTag {
        PlatformTag::Shopify
    }

    fn detect(&self, html: &str) -> bool {
        contains_any(
            html,
            &[
                "cdn.shopify.com",
                "myshopify.com",
                "shopify.theme",
                "window.shopify",
                "shopify-section",
            ],
        )
    }

    fn product_endpoint(&self, product_url: &str) -> Option<String> {
        let end = product_url.find(['?', '#']).unwrap_or(product_url.len());
        let url = product_url[..end].trim_end_matches('/');
        if !markup::url_path(url).contains("/products/") {
            return None;
        }
        Some(format!("{}.js", url))
    }

    fn parse_variant_id(&self, body: &str) -> Option<String> {
        let doc: Value = serde_json::from_str(body).ok()?;
        // `.js` returns the product itself, `.json` wraps it in "product"
        let product = doc.get("product").unwrap_or(&doc);
        let variants = product.get("variants")?.as_array()?;
        let variant = variants
            .iter()
            .find(|v| v.get("available").and_then(Value::as_bool) == Some(true))
            .or_else(|| variants.first())?;
        match variant.get("id")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    fn parse_product_name(&self, body: &str) -> Option<String> {
        let doc: Value = serde_json::from_str(body).ok()?;
        let product = doc.get("product").unwrap_or(&doc);
        product
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    fn add_to_cart(&self, env: &StepEnv<'_>, product: &Product) -> StepOutcome<CartOutput> {
        let Some(variant_id) = product.variant_id.as_deref() else {
            return GenericStrategy.add_to_cart(env, product);
        };

        let endpoint = env.url("/cart/add.js");
        let id = variant_id
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(variant_id));
        let body = json!({ "id": id, "quantity": 1 }).to_string();

        let response = env
            .post(&endpoint, "application/json", &body)
            .map_err(|e| {
                StepFailure::new(
                    FailureReason::CartUnreachable,
                    format!("Cart API /cart/add.js unreachable: {}", e),
                )
            })?;

        // 422 means the API answered but rejected this SKU: still reachable
        if response.is_success() || response.status == 422 {
            Ok(CartOutput {
                method: CartMethod::JsonCartApi,
                endpoint,
                status: response.status,
            })
        } else {
            Err(StepFailure::new(
                FailureReason::CartRejected {
                    status: response.status,
                },
                format!("Cart API /cart/add.js returned HTTP {}", response.status),
            ))
        }
    }

    fn checkout_paths(&self) -> &'static [&'static str] {
        &["/checkout", "/cart/checkout", "/checkouts"]
    }
}

/// WooCommerce-like storefronts: `?wc-ajax=add_to_cart` form action
#[derive(Debug, Clone, Copy, Default)]
pub struct WooCommerceStrategy;

impl PlatformStrategy for WooCommerceStrategy {
    fn tag(&self) -> PlatformTag {
        PlatformTag::WooCommerce
    }

    fn detect(&self, html: &str) -> bool {
        contains_any(
            html,
            &[
                "wp-content/plugins/woocommerce",
                "woocommerce-page",
                "woocommerce",
                "wc-ajax",
                "wc-block",
            ],
        )
    }

    fn add_to_cart(&self, env: &StepEnv<'_>, product: &Product) -> StepOutcome<CartOutput> {
        let Some(sku) = product.sku.as_deref() else {
            return GenericStrategy.add_to_cart(env, product);
        };

        let endpoint = env.url("/?wc-ajax=add_to_cart");
        let body = format!("product_sku={}&quantity=1", form_encode(sku));

        let response = env
            .post(&endpoint, "application/x-www-form-urlencoded", &body)
            .map_err(|e| {
                StepFailure::new(
                    FailureReason::CartUnreachable,
                    format!("AJAX add-to-cart unreachable: {}", e),
                )
            })?;

        if response.is_success() {
            Ok(CartOutput {
                method: CartMethod::AjaxForm,
                endpoint,
                status: response.status,
            })
        } else {
            Err(StepFailure::new(
                FailureReason::CartRejected {
                    status: response.status,
                },
                format!("AJAX add-to-cart returned HTTP {}", response.status),
            ))
        }
    }

    fn checkout_paths(&self) -> &'static [&'static str] {
        &["/checkout/", "/checkout", "/cart/checkout/"]
    }
}

/// Fallback for unknown platforms: only confirms `/cart` loads
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericStrategy;

impl PlatformStrategy for GenericStrategy {
    fn tag(&self) -> PlatformTag {
        PlatformTag::Unknown
    }

    fn detect(&self, _html: &str) -> bool {
        false
    }

    fn add_to_cart(&self, env: &StepEnv<'_>, _product: &Product) -> StepOutcome<CartOutput> {
        let response = env
            .get(&env.url("/cart"), RedirectPolicy::Follow)
            .map_err(|e| {
                StepFailure::new(
                    FailureReason::CartUnreachable,
                    format!("Cart page /cart unreachable: {}", e),
                )
            })?;

        if !response.is_success() {
            return Err(StepFailure::new(
                FailureReason::CartUnreachable,
                format!("Cart page /cart returned HTTP {}", response.status),
            ));
        }
        if markup::has_captcha(&response.body) {
            return Err(StepFailure::new(
                FailureReason::Captcha,
                "CAPTCHA challenge on cart page /cart",
            ));
        }
        Err(StepFailure::new(
            FailureReason::JavascriptRequired,
            "Cart page /cart loads but no programmatic add-to-cart was found; a rendered browser is required",
        ))
    }

    fn checkout_paths(&self) -> &'static [&'static str] {
        &[
            "/checkout",
            "/cart/checkout",
            "/checkout/cart",
            "/basket/checkout",
            "/order/checkout",
        ]
    }
}

/// Percent-encode a form value (RFC 3986 unreserved set kept as-is)
fn form_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_platform() {
        assert_eq!(
            detect_platform(r#"<script src="https://cdn.shopify.com/s/x.js"></script>"#),
            PlatformTag::Shopify
        );
        assert_eq!(
            detect_platform(r#"<body class="woocommerce-page">"#),
            PlatformTag::WooCommerce
        );
        assert_eq!(detect_platform("<html></html>"), PlatformTag::Unknown);
    }

    #[test]
    fn test_strategy_for_unknown_is_generic() {
        let strategy = strategy_for(PlatformTag::Unknown);
        assert_eq!(strategy.tag(), PlatformTag::Unknown);
        assert!(strategy.checkout_paths().contains(&"/checkout"));
        assert_eq!(strategy_for(PlatformTag::Shopify).tag(), PlatformTag::Shopify);
    }

    #[test]
    fn test_shopify_product_endpoint() {
        let s = ShopifyStrategy;
        assert_eq!(
            s.product_endpoint("https://a.test/products/mug?variant=1").as_deref(),
            Some("https://a.test/products/mug.js")
        );
        assert_eq!(s.product_endpoint("https://a.test/p/mug"), None);
    }

    #[test]
    fn test_shopify_variant_prefers_available() {
        let s = ShopifyStrategy;
        let body = r#"{"variants":[{"id":11,"available":false},{"id":22,"available":true}]}"#;
        assert_eq!(s.parse_variant_id(body).as_deref(), Some("22"));

        let wrapped = r#"{"product":{"title":" Tee ","variants":[{"id":"gid-7"}]}}"#;
        assert_eq!(s.parse_variant_id(wrapped).as_deref(), Some("gid-7"));
        assert_eq!(s.parse_product_name(wrapped).as_deref(), Some("Tee"));

        assert_eq!(s.parse_variant_id("not json"), None);
    }

    #[test]
    fn test_form_encode() {
        assert_eq!(form_encode("SKU 1/a&b"), "SKU+1%2Fa%26b");
    }
}
