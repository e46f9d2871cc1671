use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::credentials::CredentialStore;
use super::types::{VerificationMeta, VerificationRequest, VerificationResult};
use super::{payload_fingerprint, Verifier};
use crate::error::{ScanError, ScanResult};

const INVALID_RESPONSE_REASON: &str = "invalid response from server";
const DEFAULT_REJECT_REASON: &str = "ticket rejected";

/// Response envelope. Fields are kept untyped so a field of an unexpected
/// shape never turns a decision into a parse failure.
#[derive(Debug, Default, Deserialize)]
struct WireResponse {
    #[serde(default)]
    approved: Option<Value>,
    #[serde(default)]
    reason: Option<Value>,
    #[serde(default)]
    meta: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl WireResponse {
    /// Only a JSON `true` approves.
    fn approved(&self) -> bool {
        matches!(self.approved, Some(Value::Bool(true)))
    }

    fn reason(&self) -> Option<String> {
        self.reason
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string)
    }

    fn meta(&self) -> Option<VerificationMeta> {
        self.meta.as_ref().and_then(VerificationMeta::from_value)
    }
}

/// Verification over HTTP with a bearer credential.
pub struct HttpVerifier {
    endpoint: Url,
    agent: ureq::Agent,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpVerifier {
    pub fn new(
        api_base_url: &str,
        verify_path: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let endpoint = join_endpoint(api_base_url, verify_path)?;
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self {
            endpoint,
            agent,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Verifier for HttpVerifier {
    fn verify(&self, request: &VerificationRequest) -> ScanResult<VerificationResult> {
        if request.payload.trim().is_empty() {
            return Err(ScanError::EmptyPayload);
        }
        let token = self.credentials.token().ok_or(ScanError::Unauthenticated)?;
        let body = serde_json::json!({
            "qrContent": request.payload,
            "markUsed": request.mark_used,
        })
        .to_string();

        let fingerprint = payload_fingerprint(&request.payload);
        log::debug!("verifying ticket {} at {}", fingerprint, self.endpoint);

        let (status, text) = match self
            .agent
            .post(self.endpoint.as_str())
            .set("Authorization", &format!("Bearer {}", token))
            .set("Content-Type", "application/json")
            .send_string(&body)
        {
            Ok(response) => {
                let status = response.status();
                let text = response
                    .into_string()
                    .map_err(|err| ScanError::Unreachable(format!("read response: {}", err)))?;
                (status, text)
            }
            Err(ureq::Error::Status(code, response)) => {
                (code, response.into_string().unwrap_or_default())
            }
            Err(ureq::Error::Transport(err)) => {
                log::warn!("verification of ticket {} failed: {}", fingerprint, err);
                return Err(ScanError::Unreachable(err.to_string()));
            }
        };

        let result = interpret_response(status, &text);
        log::info!(
            "ticket {} verified: approved={} (HTTP {})",
            fingerprint,
            result.approved,
            status
        );
        Ok(result)
    }
}

/// Turn a completed round trip into a result.
///
/// A non-2xx status or a truthy `error` field is a rejection regardless of
/// the rest of the body. This never fails: anything unreadable is a
/// rejection with a best-effort reason.
pub fn interpret_response(status: u16, body: &str) -> VerificationResult {
    let success = (200..300).contains(&status);
    let Ok(wire) = serde_json::from_str::<WireResponse>(body) else {
        return if success {
            VerificationResult::rejected(INVALID_RESPONSE_REASON, None)
        } else {
            VerificationResult::rejected(http_failure_reason(status), None)
        };
    };

    let meta = wire.meta();
    if let Some(error) = wire.error.as_ref().filter(|error| is_truthy(error)) {
        let reason = match error {
            Value::String(text) => text.clone(),
            _ => http_failure_reason(status),
        };
        return VerificationResult::rejected(reason, meta);
    }

    let reason = wire.reason();
    if !success {
        return VerificationResult::rejected(
            reason.unwrap_or_else(|| http_failure_reason(status)),
            meta,
        );
    }
    if wire.approved() {
        VerificationResult::approved(meta)
    } else {
        VerificationResult::rejected(
            reason.unwrap_or_else(|| DEFAULT_REJECT_REASON.to_string()),
            meta,
        )
    }
}

fn http_failure_reason(status: u16) -> String {
    format!("verification failed (HTTP {})", status)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn join_endpoint(api_base_url: &str, verify_path: &str) -> Result<Url> {
    let mut base = Url::parse(api_base_url)
        .with_context(|| format!("parse api base url '{}'", api_base_url))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(verify_path.trim_start_matches('/'))
        .with_context(|| format!("join verify path '{}'", verify_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{Identifier, StaticCredential};

    #[test]
    fn error_field_on_200_is_a_rejection() {
        let result = interpret_response(200, r#"{"error": "Ticket already used"}"#);
        assert!(!result.approved);
        assert_eq!(result.reason, "Ticket already used");
    }

    #[test]
    fn error_field_wins_over_approved_flag() {
        let result = interpret_response(200, r#"{"approved": true, "error": "revoked"}"#);
        assert!(!result.approved);
        assert_eq!(result.reason, "revoked");
    }

    #[test]
    fn falsy_error_field_is_ignored() {
        let result = interpret_response(200, r#"{"approved": true, "error": null}"#);
        assert!(result.approved);
        let result = interpret_response(200, r#"{"approved": true, "error": ""}"#);
        assert!(result.approved);
    }

    #[test]
    fn non_success_status_is_rejected_even_when_approved() {
        let result = interpret_response(404, r#"{"approved": true}"#);
        assert!(!result.approved);
        assert_eq!(result.reason, "verification failed (HTTP 404)");

        let result = interpret_response(500, "<html>oops</html>");
        assert!(!result.approved);
        assert_eq!(result.reason, "verification failed (HTTP 500)");
    }

    #[test]
    fn unparseable_success_body_is_rejected() {
        let result = interpret_response(200, "not json");
        assert!(!result.approved);
        assert_eq!(result.reason, INVALID_RESPONSE_REASON);
    }

    #[test]
    fn approved_result_keeps_meta_and_drops_reason() {
        let result = interpret_response(
            200,
            r#"{"approved": true, "reason": "ok", "meta": {"ticket": {"ticketId": "T1"}}}"#,
        );
        assert!(result.approved);
        assert!(result.reason.is_empty());
        let ticket = result.meta.and_then(|meta| meta.ticket).unwrap();
        assert_eq!(ticket.ticket_id, Some(Identifier::Text("T1".into())));
    }

    #[test]
    fn malformed_meta_never_overrides_approval() {
        for body in [
            r#"{"approved": true, "meta": {"seat": {"section": 3, "row": "C"}}}"#,
            r#"{"approved": true, "meta": {"booking": {"id": 7.0}}}"#,
            r#"{"approved": true, "meta": {"ticket": {"status": 1}}}"#,
            r#"{"approved": true, "meta": {"seat": "A12"}}"#,
            r#"{"approved": true, "meta": "unexpected"}"#,
            r#"{"approved": true, "meta": [1, 2], "reason": 42}"#,
        ] {
            let result = interpret_response(200, body);
            assert!(result.approved, "approval lost for {}", body);
            assert!(result.reason.is_empty());
        }
    }

    #[test]
    fn malformed_meta_keeps_readable_fields() {
        let result = interpret_response(
            200,
            r#"{"approved": true, "meta": {"seat": {"section": 3, "row": "C"}, "booking": {"id": 7.0}}}"#,
        );
        let meta = result.meta.unwrap();
        assert_eq!(meta.booking.and_then(|b| b.id), Some(Identifier::Number(7)));
        let seat = meta.seat.unwrap();
        assert_eq!(seat.section.as_deref(), Some("3"));
        assert_eq!(seat.row, Some(Identifier::Text("C".into())));
    }

    #[test]
    fn only_boolean_true_approves() {
        assert!(!interpret_response(200, r#"{"approved": "true"}"#).approved);
        assert!(!interpret_response(200, r#"{"approved": 1}"#).approved);
    }

    #[test]
    fn not_approved_without_reason_gets_default() {
        let result = interpret_response(200, r#"{"approved": false}"#);
        assert_eq!(result.reason, DEFAULT_REJECT_REASON);
    }

    #[test]
    fn endpoint_joins_base_with_and_without_slashes() -> Result<()> {
        let credentials = Arc::new(StaticCredential::default());
        let verifier = HttpVerifier::new(
            "http://127.0.0.1:5000/api",
            "/tickets/verify",
            Duration::from_secs(1),
            credentials,
        )?;
        assert_eq!(
            verifier.endpoint().as_str(),
            "http://127.0.0.1:5000/api/tickets/verify"
        );
        Ok(())
    }

    #[test]
    fn missing_credential_fails_before_network() {
        // Port 9 (discard) is never contacted: the credential check runs first.
        let verifier = HttpVerifier::new(
            "http://127.0.0.1:9",
            "verify",
            Duration::from_millis(50),
            Arc::new(StaticCredential::default()),
        )
        .unwrap();
        assert_eq!(
            verifier.verify(&VerificationRequest::new("TICKET-123")),
            Err(ScanError::Unauthenticated)
        );
        assert_eq!(
            verifier.verify(&VerificationRequest::new("  ")),
            Err(ScanError::EmptyPayload)
        );
    }
}
