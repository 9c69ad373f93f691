//! Wire-level response envelope and event frame shapes (§6): `{ok, data,
//! error}` for request/response, and a flattened `{type, ..fields, ts}` for
//! the event stream. This module describes the boundary contract only; the
//! actual HTTP/WebSocket transport is out of scope (§1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use scrum_core::events::Event;
use scrum_core::error::ScrumError;

/// `{ok: bool, data?: T, error?: ErrorBody}` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ErrorBody) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

/// `{kind, message, details?}` (§6, §7). `details.nextSteps` is populated
/// for the precondition kinds §7 names as requiring one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&ScrumError> for ErrorBody {
    fn from(err: &ScrumError) -> Self {
        let details = err.next_steps().map(|steps| serde_json::json!({ "nextSteps": steps }));
        ErrorBody {
            kind: err.kind_code().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

impl From<ScrumError> for ErrorBody {
    fn from(err: ScrumError) -> Self {
        ErrorBody::from(&err)
    }
}

/// One event as framed for the `/ws` event stream (§6): the event's own
/// tagged fields, flattened, plus a `ts` of when it was published. Framing
/// (one JSON object per message) is the transport's job, not this type's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    #[serde(flatten)]
    pub event: Event,
    pub ts: DateTime<Utc>,
}

impl EventFrame {
    pub fn new(event: Event, ts: DateTime<Utc>) -> Self {
        Self { event, ts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_error() {
        let env = Envelope::success(42);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_envelope_omits_data() {
        let env: Envelope<()> = Envelope::failure(ErrorBody {
            kind: "NOT_FOUND".to_string(),
            message: "missing".to_string(),
            details: None,
        });
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["ok"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["kind"], "NOT_FOUND");
    }

    #[test]
    fn compliance_failed_error_carries_next_steps() {
        let err = ScrumError::Precondition(scrum_core::error::PreconditionKind::ComplianceFailed {
            undeclared: vec!["y.ts".to_string()],
        });
        let body = ErrorBody::from(&err);
        assert_eq!(body.kind, "COMPLIANCE_FAILED");
        let steps = body.details.unwrap()["nextSteps"].clone();
        assert!(steps[0].as_str().unwrap().contains("y.ts"));
    }

    #[test]
    fn event_frame_flattens_event_fields() {
        let frame = EventFrame::new(Event::TaskCreated { task_id: "t1".to_string() }, Utc::now());
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "task_created");
        assert_eq!(json["task_id"], "t1");
        assert!(json.get("ts").is_some());
    }
}
