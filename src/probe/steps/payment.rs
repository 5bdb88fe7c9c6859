//! Payment-protocol: is there a machine-readable agent payment capability?
//!
//! A prior protocol detection for the domain short-circuits the step. Without
//! one, a single GET of the well-known capability path decides it.

use crate::probe::context::{
    FailureReason, PaymentOutput, ProtocolSource, StepFailure, StepOutcome,
};
use crate::probe::steps::StepEnv;
use crate::store::ProtocolDetection;
use crate::transport::RedirectPolicy;
use serde_json::Value;

pub fn run_payment(
    env: &StepEnv<'_>,
    detections: &[ProtocolDetection],
) -> StepOutcome<PaymentOutput> {
    if let Some(found) = detections
        .iter()
        .find(|d| d.detected && is_agent_protocol(&env.config.agent_protocols, &d.protocol))
    {
        return Ok(PaymentOutput {
            protocol: found.protocol.to_ascii_lowercase(),
            source: ProtocolSource::PriorScan,
        });
    }

    let path = env.config.well_known_path.as_str();
    let response = match env.get(&env.url(path), RedirectPolicy::Follow) {
        Ok(response) => response,
        Err(e) => {
            return Err(StepFailure::new(
                FailureReason::NoAgentProtocol,
                format!("No agent payment protocol detected; {} unreachable: {}", path, e),
            ))
        }
    };

    if !response.is_success() {
        return Err(StepFailure::new(
            FailureReason::NoAgentProtocol,
            format!(
                "No agent payment protocol detected; {} returned HTTP {}",
                path, response.status
            ),
        ));
    }

    let manifest: Value = serde_json::from_str(&response.body).map_err(|e| {
        StepFailure::new(
            FailureReason::InvalidManifest,
            format!("Capability manifest at {} is not valid JSON: {}", path, e),
        )
    })?;
    if !manifest.is_object() {
        return Err(StepFailure::new(
            FailureReason::InvalidManifest,
            format!("Capability manifest at {} is not a JSON object", path),
        ));
    }

    if has_checkout_capability(&manifest, 0) {
        Ok(PaymentOutput {
            protocol: manifest_protocol(&manifest, path),
            source: ProtocolSource::WellKnown,
        })
    } else {
        Err(StepFailure::new(
            FailureReason::NoAgentProtocol,
            format!(
                "No agent payment protocol detected; manifest at {} has no checkout capability",
                path
            ),
        ))
    }
}

fn is_agent_protocol(known: &[String], protocol: &str) -> bool {
    known.iter().any(|k| k.eq_ignore_ascii_case(protocol.trim()))
}

const CHECKOUT_FIELDS: [&str; 3] = ["checkout", "checkout_endpoint", "checkout_url"];
const MAX_DEPTH: usize = 3;

/// Checkout capability anywhere in the top levels of the manifest
fn has_checkout_capability(value: &Value, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }
    match value {
        Value::Object(map) => map.iter().any(|(key, child)| {
            let key = key.to_ascii_lowercase();
            if CHECKOUT_FIELDS.contains(&key.as_str()) && !is_empty(child) {
                return true;
            }
            if key == "capabilities" {
                if let Value::Array(items) = child {
                    if items.iter().any(names_checkout) {
                        return true;
                    }
                }
            }
            if key.contains("checkout") && !is_empty(child) {
                return true;
            }
            has_checkout_capability(child, depth + 1)
        }),
        _ => false,
    }
}

/// A capability entry given as a bare string or an object with a name/id
fn names_checkout(item: &Value) -> bool {
    let name = match item {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => ["name", "id", "type"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str)),
        _ => None,
    };
    name.map(|n| n.to_ascii_lowercase().contains("checkout"))
        .unwrap_or(false)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Protocol name advertised by the manifest, else derived from the path
fn manifest_protocol(manifest: &Value, path: &str) -> String {
    manifest
        .get("protocol")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            path.rsplit('/')
                .find(|s| !s.is_empty())
                .unwrap_or("well-known")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::transport::FakeTransport;

    const WELL_KNOWN: &str = "https://shop.test/.well-known/ucp";

    fn run(transport: &FakeTransport, detections: &[ProtocolDetection]) -> StepOutcome<PaymentOutput> {
        let config = ProbeConfig::for_tests();
        let env = StepEnv::new(transport, &config, "https://shop.test");
        run_payment(&env, detections)
    }

    fn detection(protocol: &str, detected: bool) -> ProtocolDetection {
        ProtocolDetection {
            protocol: protocol.to_string(),
            detected,
        }
    }

    #[test]
    fn test_prior_detection_skips_network() {
        let transport = FakeTransport::new();
        let out = run(
            &transport,
            &[detection("ucp", false), detection("ACP", true)],
        )
        .unwrap();
        assert_eq!(out.protocol, "acp");
        assert_eq!(out.source, ProtocolSource::PriorScan);
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_unknown_detected_protocol_is_ignored() {
        let transport = FakeTransport::new();
        let failure = run(&transport, &[detection("paypal", true)]).unwrap_err();
        assert_eq!(failure.reason, FailureReason::NoAgentProtocol);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_manifest_with_capability_list() {
        let transport = FakeTransport::new().with_get(
            WELL_KNOWN,
            200,
            r#"{"ucp":{"version":"2026-01-11","capabilities":[{"name":"dev.ucp.shopping.checkout"}]}}"#,
        );
        let out = run(&transport, &[]).unwrap();
        assert_eq!(out.source, ProtocolSource::WellKnown);
        assert_eq!(out.protocol, "ucp");
    }

    #[test]
    fn test_manifest_with_checkout_endpoint() {
        let transport = FakeTransport::new().with_get(
            WELL_KNOWN,
            200,
            r#"{"protocol":"acp","checkout_endpoint":"https://shop.test/api/checkout"}"#,
        );
        let out = run(&transport, &[]).unwrap();
        assert_eq!(out.protocol, "acp");
    }

    #[test]
    fn test_manifest_without_checkout() {
        let transport =
            FakeTransport::new().with_get(WELL_KNOWN, 200, r#"{"capabilities":["catalog"]}"#);
        let failure = run(&transport, &[]).unwrap_err();
        assert_eq!(failure.reason, FailureReason::NoAgentProtocol);
    }

    #[test]
    fn test_unparseable_manifest_is_invalid() {
        let transport = FakeTransport::new().with_get(WELL_KNOWN, 200, "<html>not here</html>");
        let failure = run(&transport, &[]).unwrap_err();
        assert_eq!(failure.reason, FailureReason::InvalidManifest);
    }

    #[test]
    fn test_missing_well_known_path() {
        let transport = FakeTransport::new();
        let failure = run(&transport, &[]).unwrap_err();
        assert_eq!(failure.reason, FailureReason::NoAgentProtocol);
        assert!(failure.message.contains("404"));
    }

    #[test]
    fn test_timeout_is_a_plain_failure() {
        let transport = FakeTransport::new().with_timeout(WELL_KNOWN);
        let failure = run(&transport, &[]).unwrap_err();
        assert_eq!(failure.reason, FailureReason::NoAgentProtocol);
    }
}
