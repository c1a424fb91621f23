//! OCPP-J message framing
//!
//! The OCPP-J transport envelope is a positional JSON array, one of:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! Payloads stay `serde_json::Value` at this layer; the action handlers
//! deserialize them into typed OCPP messages.

use serde_json::Value;
use thiserror::Error;

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

/// A parsed OCPP-J frame.
#[derive(Debug, Clone)]
pub enum OcppFrame {
    /// `[2, uniqueId, action, payload]`
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    /// `[3, uniqueId, payload]`
    CallResult { unique_id: String, payload: Value },
    /// `[4, uniqueId, errorCode, errorDescription, errorDetails]`
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

/// Errors raised while decoding a raw frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("frame is not a non-empty array")]
    NotAnArray,
    #[error("message type is not an integer")]
    InvalidMessageType,
    #[error("unknown message type {0}")]
    UnknownMessageType(u64),
    #[error("expected at least {expected} elements, got {got}")]
    MissingFields { expected: usize, got: usize },
    #[error("{0} must be a string")]
    NotAString(&'static str),
}

impl OcppFrame {
    /// Parse raw JSON text into a frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
        let arr = match value.as_array() {
            Some(arr) if !arr.is_empty() => arr,
            _ => return Err(FrameError::NotAnArray),
        };

        let msg_type = arr[0].as_u64().ok_or(FrameError::InvalidMessageType)?;
        match msg_type {
            MSG_TYPE_CALL => Self::parse_call(arr),
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(arr),
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(arr),
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }

    fn require(arr: &[Value], expected: usize) -> Result<(), FrameError> {
        if arr.len() < expected {
            return Err(FrameError::MissingFields {
                expected,
                got: arr.len(),
            });
        }
        Ok(())
    }

    fn string_at(arr: &[Value], idx: usize, name: &'static str) -> Result<String, FrameError> {
        arr[idx]
            .as_str()
            .map(str::to_owned)
            .ok_or(FrameError::NotAString(name))
    }

    fn parse_call(arr: &[Value]) -> Result<Self, FrameError> {
        Self::require(arr, 4)?;
        Ok(Self::Call {
            unique_id: Self::string_at(arr, 1, "uniqueId")?,
            action: Self::string_at(arr, 2, "action")?,
            payload: arr[3].clone(),
        })
    }

    fn parse_call_result(arr: &[Value]) -> Result<Self, FrameError> {
        Self::require(arr, 3)?;
        Ok(Self::CallResult {
            unique_id: Self::string_at(arr, 1, "uniqueId")?,
            payload: arr[2].clone(),
        })
    }

    fn parse_call_error(arr: &[Value]) -> Result<Self, FrameError> {
        Self::require(arr, 4)?;
        Ok(Self::CallError {
            unique_id: Self::string_at(arr, 1, "uniqueId")?,
            error_code: Self::string_at(arr, 2, "errorCode")?,
            error_description: arr[3].as_str().unwrap_or_default().to_string(),
            error_details: arr
                .get(4)
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default())),
        })
    }

    /// Serialize this frame to JSON text.
    pub fn serialize(&self) -> String {
        let arr = match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => Value::Array(vec![
                MSG_TYPE_CALL.into(),
                unique_id.clone().into(),
                action.clone().into(),
                payload.clone(),
            ]),
            Self::CallResult { unique_id, payload } => Value::Array(vec![
                MSG_TYPE_CALL_RESULT.into(),
                unique_id.clone().into(),
                payload.clone(),
            ]),
            Self::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => Value::Array(vec![
                MSG_TYPE_CALL_ERROR.into(),
                unique_id.clone().into(),
                error_code.clone().into(),
                error_description.clone().into(),
                error_details.clone(),
            ]),
        };
        // serializing a Value cannot fail
        serde_json::to_string(&arr).unwrap()
    }

    /// The unique message id of this frame.
    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call { unique_id, .. }
            | Self::CallResult { unique_id, .. }
            | Self::CallError { unique_id, .. } => unique_id,
        }
    }

    /// Build a `CallError` frame answering `unique_id`.
    pub fn error_response(
        unique_id: impl Into<String>,
        error_code: impl Into<String>,
        error_description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            unique_id: unique_id.into(),
            error_code: error_code.into(),
            error_description: error_description.into(),
            error_details: Value::Object(Default::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_call() {
        let text = r#"[2,"m-1","BootNotification",{"chargePointVendor":"Acme","chargePointModel":"X1"}]"#;
        match OcppFrame::parse(text).unwrap() {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => {
                assert_eq!(unique_id, "m-1");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "Acme");
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn parse_call_result() {
        let text = r#"[3,"m-2",{"status":"Accepted"}]"#;
        match OcppFrame::parse(text).unwrap() {
            OcppFrame::CallResult { unique_id, payload } => {
                assert_eq!(unique_id, "m-2");
                assert_eq!(payload["status"], "Accepted");
            }
            other => panic!("expected CallResult, got {:?}", other),
        }
    }

    #[test]
    fn parse_call_error_without_details() {
        let text = r#"[4,"m-3","NotImplemented","no such action"]"#;
        match OcppFrame::parse(text).unwrap() {
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => {
                assert_eq!(unique_id, "m-3");
                assert_eq!(error_code, "NotImplemented");
                assert_eq!(error_description, "no such action");
                assert!(error_details.as_object().unwrap().is_empty());
            }
            other => panic!("expected CallError, got {:?}", other),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(OcppFrame::parse("not json").is_err());
        assert!(OcppFrame::parse("{}").is_err());
        assert!(OcppFrame::parse("[]").is_err());
        assert!(OcppFrame::parse(r#"[9,"m","X",{}]"#).is_err());
        assert!(OcppFrame::parse(r#"[2,"m"]"#).is_err());
        assert!(OcppFrame::parse(r#"[2,7,"X",{}]"#).is_err());
    }

    #[test]
    fn serialize_call_roundtrip() {
        let frame = OcppFrame::Call {
            unique_id: "id1".into(),
            action: "Heartbeat".into(),
            payload: serde_json::json!({}),
        };
        let parsed = OcppFrame::parse(&frame.serialize()).unwrap();
        assert_eq!(parsed.unique_id(), "id1");
        assert!(matches!(parsed, OcppFrame::Call { .. }));
    }

    #[test]
    fn serialize_error_response() {
        let frame = OcppFrame::error_response("id4", "InternalError", "boom");
        let text = frame.serialize();
        assert!(text.starts_with("[4,"));
        let parsed = OcppFrame::parse(&text).unwrap();
        assert!(matches!(parsed, OcppFrame::CallError { .. }));
    }
}
