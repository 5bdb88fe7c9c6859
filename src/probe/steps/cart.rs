//! Cart: place the selected product in a cart via the platform strategy

use crate::probe::context::{CartOutput, SelectionOutput, StepOutcome};
use crate::probe::platform::strategy_for;
use crate::probe::steps::StepEnv;

pub fn run_cart(env: &StepEnv<'_>, selection: &SelectionOutput) -> StepOutcome<CartOutput> {
    let product = &selection.product;
    tracing::debug!(platform = %product.platform, product = %product.name, "adding to cart");
    strategy_for(product.platform).add_to_cart(env, product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::probe::context::{CartMethod, FailureReason};
    use crate::probe::platform::PlatformTag;
    use crate::probe::types::Product;
    use crate::transport::FakeTransport;

    fn selection(platform: PlatformTag, variant_id: Option<&str>, sku: Option<&str>) -> SelectionOutput {
        SelectionOutput {
            product: Product {
                name: "Mug".to_string(),
                url: "https://shop.test/products/mug".to_string(),
                price: Some(9.0),
                currency: Some("USD".to_string()),
                sku: sku.map(str::to_string),
                availability: None,
                variant_id: variant_id.map(str::to_string),
                platform,
                structured: true,
            },
        }
    }

    fn run(transport: &FakeTransport, selection: &SelectionOutput) -> StepOutcome<CartOutput> {
        let config = ProbeConfig::for_tests();
        let env = StepEnv::new(transport, &config, "https://shop.test");
        run_cart(&env, selection)
    }

    #[test]
    fn test_shopify_cart_api_success() {
        let transport =
            FakeTransport::new().with_post("https://shop.test/cart/add.js", 200, "{}");
        let out = run(&transport, &selection(PlatformTag::Shopify, Some("42"), None)).unwrap();
        assert_eq!(out.method, CartMethod::JsonCartApi);

        let post = &transport.requests()[0];
        assert_eq!(post.method, "POST");
        assert_eq!(post.body.as_deref(), Some(r#"{"id":42,"quantity":1}"#));
    }

    #[test]
    fn test_shopify_422_counts_as_reachable() {
        let transport = FakeTransport::new().with_post(
            "https://shop.test/cart/add.js",
            422,
            r#"{"status":422,"description":"sold out"}"#,
        );
        let out = run(&transport, &selection(PlatformTag::Shopify, Some("42"), None)).unwrap();
        assert_eq!(out.status, 422);
    }

    #[test]
    fn test_shopify_other_status_fails() {
        let transport =
            FakeTransport::new().with_post("https://shop.test/cart/add.js", 403, "forbidden");
        let failure = run(&transport, &selection(PlatformTag::Shopify, Some("42"), None)).unwrap_err();
        assert_eq!(failure.reason, FailureReason::CartRejected { status: 403 });
    }

    #[test]
    fn test_woocommerce_form_post() {
        let transport = FakeTransport::new().with_post(
            "https://shop.test/?wc-ajax=add_to_cart",
            200,
            r#"{"fragments":{}}"#,
        );
        let out = run(
            &transport,
            &selection(PlatformTag::WooCommerce, None, Some("MUG 1")),
        )
        .unwrap();
        assert_eq!(out.method, CartMethod::AjaxForm);
        assert_eq!(
            transport.requests()[0].body.as_deref(),
            Some("product_sku=MUG+1&quantity=1")
        );
    }

    #[test]
    fn test_unknown_platform_cart_page_needs_browser() {
        let transport =
            FakeTransport::new().with_get("https://shop.test/cart", 200, "<h1>Your cart</h1>");
        let failure = run(&transport, &selection(PlatformTag::Unknown, None, None)).unwrap_err();
        assert_eq!(failure.reason, FailureReason::JavascriptRequired);
    }

    #[test]
    fn test_unknown_platform_cart_page_captcha() {
        let transport = FakeTransport::new().with_get(
            "https://shop.test/cart",
            200,
            r#"<script src="https://hcaptcha.com/1/api.js"></script>"#,
        );
        let failure = run(&transport, &selection(PlatformTag::Unknown, None, None)).unwrap_err();
        assert_eq!(failure.reason, FailureReason::Captcha);
    }

    #[test]
    fn test_unknown_platform_cart_unreachable() {
        let transport = FakeTransport::new();
        let failure = run(&transport, &selection(PlatformTag::Unknown, None, None)).unwrap_err();
        assert_eq!(failure.reason, FailureReason::CartUnreachable);
        assert!(failure.message.contains("404"));
    }

    #[test]
    fn test_shopify_without_variant_falls_back_to_generic() {
        let transport = FakeTransport::new().with_get("https://shop.test/cart", 200, "cart");
        let failure = run(&transport, &selection(PlatformTag::Shopify, None, None)).unwrap_err();
        assert_eq!(failure.reason, FailureReason::JavascriptRequired);
        assert_eq!(transport.requests()[0].method, "GET");
    }
}
