//! Push payload structures

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The parts of a push payload the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    pub before: String,
    pub after: String,
    pub clone_url: String,
    pub html_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("field '{0}' is missing or not a string")]
    MissingField(&'static str),
}

impl PushEvent {
    /// Parse a webhook body.
    ///
    /// Returns `Ok(None)` for a well-formed payload that is not a push
    /// (it lacks `before` or `after`).
    pub fn parse(body: &[u8]) -> Result<Option<PushEvent>, PayloadError> {
        let payload: Value = serde_json::from_slice(body)?;
        Self::from_payload(&payload)
    }

    pub fn from_payload(payload: &Value) -> Result<Option<PushEvent>, PayloadError> {
        let object = payload.as_object().ok_or(PayloadError::NotAnObject)?;
        if !object.contains_key("before") || !object.contains_key("after") {
            return Ok(None);
        }

        let string_at = |name: &'static str, value: Option<&Value>| {
            value
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or(PayloadError::MissingField(name))
        };

        let repository = payload.get("repository");
        Ok(Some(PushEvent {
            before: string_at("before", payload.get("before"))?,
            after: string_at("after", payload.get("after"))?,
            clone_url: string_at(
                "repository.clone_url",
                repository.and_then(|r| r.get("clone_url")),
            )?,
            html_url: string_at(
                "repository.html_url",
                repository.and_then(|r| r.get("html_url")),
            )?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn push_body() -> Value {
        json!({
            "ref": "refs/heads/main",
            "before": "1111111111111111111111111111111111111111",
            "after": "2222222222222222222222222222222222222222",
            "repository": {
                "clone_url": "https://example.org/acme/engine.git",
                "html_url": "https://example.org/acme/engine"
            }
        })
    }

    #[test]
    fn parses_push_payload() {
        let body = serde_json::to_vec(&push_body()).unwrap();
        let event = PushEvent::parse(&body).unwrap().unwrap();

        assert_eq!(event.before, "1111111111111111111111111111111111111111");
        assert_eq!(event.after, "2222222222222222222222222222222222222222");
        assert_eq!(event.clone_url, "https://example.org/acme/engine.git");
        assert_eq!(event.html_url, "https://example.org/acme/engine");
    }

    #[test]
    fn missing_after_is_not_a_push() {
        let mut body = push_body();
        body.as_object_mut().unwrap().remove("after");
        assert_eq!(PushEvent::from_payload(&body).unwrap(), None);
    }

    #[test]
    fn ping_event_is_not_a_push() {
        let body = json!({"zen": "Keep it logically awesome.", "hook_id": 1});
        assert_eq!(PushEvent::from_payload(&body).unwrap(), None);
    }

    #[test]
    fn missing_repository_is_malformed() {
        let mut body = push_body();
        body.as_object_mut().unwrap().remove("repository");
        let err = PushEvent::from_payload(&body).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::MissingField("repository.clone_url")
        ));
    }

    #[test]
    fn non_string_after_is_malformed() {
        let mut body = push_body();
        body["after"] = Value::Null;
        assert!(matches!(
            PushEvent::from_payload(&body),
            Err(PayloadError::MissingField("after"))
        ));
    }

    #[test]
    fn invalid_json_and_non_objects_are_errors() {
        assert!(matches!(
            PushEvent::parse(b"{not json"),
            Err(PayloadError::InvalidJson(_))
        ));
        assert!(matches!(
            PushEvent::parse(b"[1, 2]"),
            Err(PayloadError::NotAnObject)
        ));
    }
}
