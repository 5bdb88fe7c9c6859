//! Recommendation generator
//!
//! Finite mapping from each failed step's `FailureReason` to one remediation
//! template. Output follows step order and is deduplicated by action label.

use crate::probe::context::FailureReason;
use crate::probe::platform::PlatformTag;
use crate::probe::types::{Priority, Recommendation, StepData, StepRecord, StepStatus};

/// Remediation advice for every failed step in `steps`
pub fn generate_recommendations(steps: &[StepRecord]) -> Vec<Recommendation> {
    let platform = steps
        .iter()
        .find_map(|s| match &s.data {
            Some(StepData::Selection(selection)) => Some(selection.product.platform),
            _ => None,
        })
        .unwrap_or(PlatformTag::Unknown);

    let mut out: Vec<Recommendation> = Vec::new();
    for step in steps.iter().filter(|s| s.status == StepStatus::Failed) {
        let Some(reason) = step.reason else {
            continue;
        };
        let rec = recommendation_for(reason, platform);
        if !out.iter().any(|r| r.action == rec.action) {
            out.push(rec);
        }
    }
    out
}

fn recommendation_for(reason: FailureReason, platform: PlatformTag) -> Recommendation {
    match reason {
        FailureReason::NoProductUrls => Recommendation {
            priority: Priority::Medium,
            action: "List product URLs in the sitemap".to_string(),
            detail: "Publish /sitemap.xml (or a product child sitemap) with one <loc> per product page so agents can find products without crawling.".to_string(),
            estimated_impact: "Agents can discover the catalog at all".to_string(),
        },
        FailureReason::PageUnavailable { .. } | FailureReason::NoProductData => Recommendation {
            priority: Priority::High,
            action: "Add structured product markup".to_string(),
            detail: "Embed a schema.org Product JSON-LD block with name, price, currency, sku and availability on every product page.".to_string(),
            estimated_impact: "Agents can identify and compare products reliably".to_string(),
        },
        FailureReason::Captcha => Recommendation {
            priority: Priority::High,
            action: "Allow agent user agents".to_string(),
            detail: "Exempt declared shopping agents from CAPTCHA and bot challenges on product, cart and checkout pages, or offer a verified-agent bypass.".to_string(),
            estimated_impact: "Removes a hard stop for every agent-driven purchase".to_string(),
        },
        FailureReason::LoginRequired => Recommendation {
            priority: Priority::High,
            action: "Enable guest checkout".to_string(),
            detail: "Let buyers reach checkout without creating an account or logging in.".to_string(),
            estimated_impact: "Agents without stored credentials can complete checkout".to_string(),
        },
        FailureReason::CartRejected { .. }
        | FailureReason::CartUnreachable
        | FailureReason::JavascriptRequired
        | FailureReason::CheckoutUnreachable => Recommendation {
            priority: Priority::High,
            action: "Expose a headless commerce API".to_string(),
            detail: headless_detail(platform).to_string(),
            estimated_impact: "Agents can build carts and start checkout over plain HTTP".to_string(),
        },
        FailureReason::NoAgentProtocol | FailureReason::InvalidManifest => Recommendation {
            priority: Priority::Medium,
            action: "Adopt an agent payment protocol".to_string(),
            detail: "Publish a capability manifest at a well-known path advertising checkout support (UCP, ACP, AP2 or x402).".to_string(),
            estimated_impact: "Agents can pay without scraping the human checkout UI".to_string(),
        },
    }
}

fn headless_detail(platform: PlatformTag) -> &'static str {
    match platform {
        PlatformTag::Shopify => "Keep the Ajax Cart API (/cart/add.js) open to unauthenticated requests and enable the Storefront API for checkout creation.",
        PlatformTag::WooCommerce => "Enable the WooCommerce Store API (/wp-json/wc/store) and the wc-ajax add_to_cart action for anonymous sessions.",
        PlatformTag::Unknown => "Provide a documented HTTP endpoint for adding items to a cart and creating a checkout without a rendered browser.",
    }
}
