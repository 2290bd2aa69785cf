use serde::{Deserialize, Serialize};
use validator::Validate;

/// Pub/Sub push envelope that triggers a matching run
///
/// The message payload is not interpreted; any delivered message starts a run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PubSubEnvelope {
    #[validate(nested)]
    pub message: PubSubMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PubSubMessage {
    #[serde(default)]
    pub data: Option<String>,
    #[validate(length(min = 1))]
    #[serde(alias = "message_id", rename = "messageId")]
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_requires_message_id() {
        let envelope: PubSubEnvelope = serde_json::from_str(
            r#"{"message": {"data": "e30=", "messageId": ""}, "subscription": "projects/p/subscriptions/s"}"#,
        )
        .unwrap();
        assert!(envelope.validate().is_err());

        let envelope: PubSubEnvelope =
            serde_json::from_str(r#"{"message": {"messageId": "42"}}"#).unwrap();
        assert!(envelope.validate().is_ok());
    }
}
