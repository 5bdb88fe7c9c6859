//! Checkout: confirm an entry point exists and is not behind a login wall

use crate::probe::context::{
    CartOutput, CheckoutOutput, FailureReason, SelectionOutput, StepFailure, StepOutcome,
};
use crate::probe::markup;
use crate::probe::platform::strategy_for;
use crate::probe::steps::StepEnv;
use crate::transport::{HttpResponse, RedirectPolicy};

pub fn run_checkout(
    env: &StepEnv<'_>,
    selection: &SelectionOutput,
    cart: &CartOutput,
) -> StepOutcome<CheckoutOutput> {
    let paths = strategy_for(selection.product.platform).checkout_paths();
    tracing::debug!(cart_method = %cart.method, ?paths, "probing checkout paths");

    for path in paths {
        let url = env.url(path);
        let Some(response) = fetch_checkout(env, path, &url)? else {
            continue;
        };

        if markup::has_captcha(&response.body) {
            return Err(StepFailure::new(
                FailureReason::Captcha,
                format!("CAPTCHA challenge on checkout page {}", path),
            ));
        }
        if markup::has_login_wall(&response.body) {
            return Err(StepFailure::new(
                FailureReason::LoginRequired,
                format!("Checkout page {} requires login with no guest option", path),
            ));
        }
        return Ok(CheckoutOutput {
            path: path.to_string(),
            url,
        });
    }

    Err(StepFailure::new(
        FailureReason::CheckoutUnreachable,
        format!(
            "No checkout entry point reachable (tried {})",
            paths.join(", ")
        ),
    ))
}

/// 2xx response for one checkout path, `None` if the path is unreachable
///
/// A redirect to a login/account page fails the step outright; any other
/// redirect is followed once.
fn fetch_checkout(
    env: &StepEnv<'_>,
    path: &str,
    url: &str,
) -> Result<Option<HttpResponse>, StepFailure> {
    let response = match env.get(url, RedirectPolicy::Manual) {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(path, error = %e, "checkout path unreachable");
            return Ok(None);
        }
    };

    let response = match (response.is_redirect(), response.location.as_deref()) {
        (true, Some(location)) => {
            if markup::is_login_path(location) {
                return Err(StepFailure::new(
                    FailureReason::LoginRequired,
                    format!("Checkout {} redirects to login page {}", path, location),
                ));
            }
            let Some(target) = markup::resolve_url(env.base_url, location) else {
                return Ok(None);
            };
            match env.get(&target, RedirectPolicy::Follow) {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(path, redirect = %target, error = %e, "checkout redirect unreachable");
                    return Ok(None);
                }
            }
        }
        _ => response,
    };

    Ok(response.is_success().then_some(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::probe::context::CartMethod;
    use crate::probe::platform::PlatformTag;
    use crate::probe::types::Product;
    use crate::transport::FakeTransport;

    fn inputs(platform: PlatformTag) -> (SelectionOutput, CartOutput) {
        let selection = SelectionOutput {
            product: Product {
                name: "Mug".to_string(),
                url: "https://shop.test/products/mug".to_string(),
                price: None,
                currency: None,
                sku: None,
                availability: None,
                variant_id: Some("1".to_string()),
                platform,
                structured: true,
            },
        };
        let cart = CartOutput {
            method: CartMethod::JsonCartApi,
            endpoint: "https://shop.test/cart/add.js".to_string(),
            status: 200,
        };
        (selection, cart)
    }

    fn run(transport: &FakeTransport, platform: PlatformTag) -> StepOutcome<CheckoutOutput> {
        let config = ProbeConfig::for_tests();
        let env = StepEnv::new(transport, &config, "https://shop.test");
        let (selection, cart) = inputs(platform);
        run_checkout(&env, &selection, &cart)
    }

    #[test]
    fn test_first_reachable_path_wins() {
        let transport = FakeTransport::new()
            .with_get("https://shop.test/cart/checkout", 200, "<h1>Checkout</h1>")
            .with_get("https://shop.test/checkouts", 200, "<h1>Other</h1>");
        let out = run(&transport, PlatformTag::Shopify).unwrap();
        assert_eq!(out.path, "/cart/checkout");
    }

    #[test]
    fn test_login_redirect_is_not_followed() {
        let transport = FakeTransport::new().with_redirect(
            "https://shop.test/checkout",
            302,
            "/account/login?checkout_url=/checkout",
        );
        let failure = run(&transport, PlatformTag::Shopify).unwrap_err();
        assert_eq!(failure.reason, FailureReason::LoginRequired);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_non_login_redirect_is_followed() {
        let transport = FakeTransport::new()
            .with_redirect("https://shop.test/checkout", 302, "/checkouts/cn/abc")
            .with_get("https://shop.test/checkouts/cn/abc", 200, "<h1>Contact</h1>");
        let out = run(&transport, PlatformTag::Shopify).unwrap();
        assert_eq!(out.path, "/checkout");
    }

    #[test]
    fn test_login_wall_page() {
        let transport = FakeTransport::new().with_get(
            "https://shop.test/checkout",
            200,
            r#"<form><input type="email"><input type="password"></form>"#,
        );
        let failure = run(&transport, PlatformTag::Unknown).unwrap_err();
        assert_eq!(failure.reason, FailureReason::LoginRequired);
    }

    #[test]
    fn test_guest_checkout_with_returning_customer_login() {
        let transport = FakeTransport::new().with_get(
            "https://shop.test/checkout/",
            200,
            r#"<form class="woocommerce-form-login" style="display:none">
                 <input name="username"><input type="password" name="password"></form>
               <form name="checkout" class="checkout woocommerce-checkout">
                 <h3>Billing details</h3><input name="billing_email"></form>"#,
        );
        let out = run(&transport, PlatformTag::WooCommerce).unwrap();
        assert_eq!(out.path, "/checkout/");
    }

    #[test]
    fn test_captcha_on_checkout() {
        let transport = FakeTransport::new().with_get(
            "https://shop.test/checkout/",
            200,
            "<p>Verify you are human</p>",
        );
        let failure = run(&transport, PlatformTag::WooCommerce).unwrap_err();
        assert_eq!(failure.reason, FailureReason::Captcha);
    }

    #[test]
    fn test_nothing_reachable() {
        let transport = FakeTransport::new()
            .with_network_error("https://shop.test/checkout", "connection reset");
        let failure = run(&transport, PlatformTag::Unknown).unwrap_err();
        assert_eq!(failure.reason, FailureReason::CheckoutUnreachable);
        assert!(failure.message.contains("/basket/checkout"));
    }
}
