//! Selection: fetch one candidate page and extract a canonical Product

use crate::probe::context::{
    DiscoveryOutput, FailureReason, SelectionOutput, StepFailure, StepOutcome,
};
use crate::probe::markup;
use crate::probe::platform::{detect_platform, strategy_for, PlatformStrategy};
use crate::probe::steps::StepEnv;
use crate::probe::types::Product;
use crate::transport::RedirectPolicy;

pub fn run_selection(
    env: &StepEnv<'_>,
    discovery: &DiscoveryOutput,
) -> StepOutcome<SelectionOutput> {
    let url = discovery.product_url.as_str();

    let response = env.get(url, RedirectPolicy::Follow).map_err(|e| {
        StepFailure::new(
            FailureReason::PageUnavailable { status: None },
            format!("Product page {} unreachable: {}", url, e),
        )
    })?;

    if !response.is_success() {
        return Err(StepFailure::new(
            FailureReason::PageUnavailable {
                status: Some(response.status),
            },
            format!("Product page {} returned HTTP {}", url, response.status),
        ));
    }

    let html = response.body;
    if markup::has_captcha(&html) {
        return Err(StepFailure::new(
            FailureReason::Captcha,
            format!("CAPTCHA challenge on product page {}", url),
        ));
    }

    let platform = detect_platform(&html);
    let strategy = strategy_for(platform);
    let structured = markup::structured_product(&html).unwrap_or_default();
    let endpoint = product_endpoint_data(env, strategy, url);

    let name = structured
        .name
        .clone()
        .or(endpoint.name)
        .or_else(|| markup::fallback_name(&html))
        .ok_or_else(|| {
            StepFailure::new(
                FailureReason::NoProductData,
                format!(
                    "No product name found in structured data, metadata or headings on {}",
                    url
                ),
            )
        })?;

    Ok(SelectionOutput {
        product: Product {
            name,
            url: url.to_string(),
            price: structured.price,
            currency: structured.currency,
            sku: structured.sku,
            availability: structured.availability,
            variant_id: endpoint.variant_id,
            platform,
            structured: structured.name.is_some(),
        },
    })
}

#[derive(Debug, Default)]
struct EndpointData {
    variant_id: Option<String>,
    name: Option<String>,
}

/// One extra fetch of the platform's per-product endpoint, best-effort
fn product_endpoint_data(
    env: &StepEnv<'_>,
    strategy: &dyn PlatformStrategy,
    product_url: &str,
) -> EndpointData {
    let Some(endpoint) = strategy.product_endpoint(product_url) else {
        return EndpointData::default();
    };

    match env.get(&endpoint, RedirectPolicy::Follow) {
        Ok(response) if response.is_success() => EndpointData {
            variant_id: strategy.parse_variant_id(&response.body),
            name: strategy.parse_product_name(&response.body),
        },
        Ok(response) => {
            tracing::debug!(endpoint = %endpoint, status = response.status, "product endpoint unavailable");
            EndpointData::default()
        }
        Err(e) => {
            tracing::debug!(endpoint = %endpoint, error = %e, "product endpoint unreachable");
            EndpointData::default()
        }
    }
}
