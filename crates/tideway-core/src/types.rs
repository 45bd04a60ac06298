// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire and domain types shared across the Tideway pipeline.
//!
//! Queue payloads and channel events use camelCase JSON field names; they are
//! consumed by external relays and must stay wire-compatible across versions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Endpoint,
    Channel,
    Storage,
}

/// Interaction mode requested by the client.
///
/// A single variant today; the enum exists so the wire format does not change
/// when additional modes are introduced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Direct chat completion against the conversation history.
    #[default]
    Completion,
}

/// Generation knobs attached to a request.
///
/// Opaque to the queue and the handler; adapters interpret the keys they
/// understand (`maxTokens`, `temperature`, `topP`) and ignore the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelParameters(pub serde_json::Map<String, Value>);

impl ModelParameters {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.0.get("temperature").and_then(Value::as_f64)
    }

    pub fn top_p(&self) -> Option<f64> {
        self.0.get("topP").and_then(Value::as_f64)
    }

    pub fn max_tokens(&self) -> Option<u64> {
        self.0.get("maxTokens").and_then(Value::as_u64)
    }

    /// Insert a knob. Used by producers; the pipeline itself never mutates
    /// parameters after enqueue.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }
}

/// An inference request as carried on the ingestion queue.
///
/// Immutable once enqueued; a redelivery carries the identical payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    /// Groups a conversation; created on the first user turn.
    pub session_id: String,
    /// The requesting user, for the session store's by-user index.
    pub user_id: String,
    /// Selects the endpoint adapter together with `provider_id`.
    pub model_id: String,
    pub provider_id: String,
    /// The user-turn prompt text.
    pub text: String,
    /// Opaque storage key of an uploaded attachment; never the bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<String>,
    #[serde(default)]
    pub mode: InteractionMode,
    #[serde(default, skip_serializing_if = "ModelParameters::is_empty")]
    pub model_parameters: ModelParameters,
}

/// Who produced a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Human,
    Ai,
}

/// One unit of conversation history in the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub session_id: String,
    pub kind: TurnKind,
    pub content: String,
    /// Open JSON mapping (attachment reference, model id, run id, latency).
    pub metadata: Option<String>,
    /// RFC 3339 creation timestamp; turns are ordered by it within a session.
    pub created_at: String,
}

/// A conversation session, keyed by id and queryable by user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One incremental generation fragment on the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEvent {
    pub session_id: String,
    /// Identifies one inference attempt; redelivery starts a new run.
    pub run_id: String,
    /// Monotonic per run, starting at 0. Gaps signal a dropped event and
    /// must not be silently filled by consumers.
    pub sequence_number: u64,
    pub value: String,
}

/// The event union published to the notification channel.
///
/// Consumed by a client-facing relay; the `action` tag and camelCase data
/// keys are the external contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// An incremental token fragment.
    LlmNewToken(TokenEvent),
    /// Terminal success marker carrying the full assembled response.
    #[serde(rename_all = "camelCase")]
    FinalResponse {
        session_id: String,
        content: String,
        metadata: serde_json::Map<String, Value>,
    },
    /// Terminal failure marker. Best-effort: a consumer that never receives
    /// a terminal event must apply its own activity timeout.
    #[serde(rename_all = "camelCase")]
    Error { session_id: String, content: String },
}

impl ChannelEvent {
    pub fn session_id(&self) -> &str {
        match self {
            ChannelEvent::LlmNewToken(token) => &token.session_id,
            ChannelEvent::FinalResponse { session_id, .. } => session_id,
            ChannelEvent::Error { session_id, .. } => session_id,
        }
    }

    /// True for events that end a run from the consumer's perspective.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelEvent::LlmNewToken(_))
    }
}

/// Everything an endpoint adapter needs to perform one inference call.
#[derive(Debug, Clone)]
pub struct EndpointInvocation {
    pub model_id: String,
    /// The current user-turn text.
    pub prompt: String,
    /// Prior turns in creation order; adapters render their own dialogue
    /// template from these.
    pub history: Vec<ConversationTurn>,
    /// Resolved attachment URL, if the request carried an image reference.
    pub image_url: Option<String>,
    pub parameters: ModelParameters,
}

/// The assembled result of one endpoint invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResult {
    pub content: String,
    /// Adapter-supplied metadata (latency, generated token count).
    pub metadata: serde_json::Map<String, Value>,
}

impl FinalResult {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// A leased ingestion-queue message.
///
/// The lease is exclusive until `locked_until`; a handler that neither acks
/// nor releases before then loses the message to redelivery.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueLease {
    pub id: i64,
    /// Stable across redeliveries; assigned at enqueue.
    pub message_id: String,
    /// Verbatim JSON payload as enqueued.
    pub payload: String,
    /// How many times this message has been delivered, this lease included.
    pub receive_count: i64,
    pub enqueued_at: String,
    pub locked_until: String,
}

/// A message that exhausted its redelivery budget.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub id: i64,
    pub message_id: String,
    pub payload: String,
    pub receive_count: i64,
    pub enqueued_at: String,
    pub dead_lettered_at: String,
}

/// Point-in-time queue depth, for operator status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueDepth {
    pub pending: i64,
    pub leased: i64,
    pub dead: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_request_uses_camel_case_wire_keys() {
        let mut params = ModelParameters::default();
        params.insert("maxTokens", 512);
        params.insert("temperature", 0.4);

        let request = InferenceRequest {
            session_id: "sess-1".into(),
            user_id: "user-1".into(),
            model_id: "idefics-80b".into(),
            provider_id: "sagemaker".into(),
            text: "describe the image".into(),
            image_reference: Some("uploads/cat.png".into()),
            mode: InteractionMode::Completion,
            model_parameters: params,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sessionId"], "sess-1");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["modelId"], "idefics-80b");
        assert_eq!(json["providerId"], "sagemaker");
        assert_eq!(json["imageReference"], "uploads/cat.png");
        assert_eq!(json["mode"], "completion");
        assert_eq!(json["modelParameters"]["maxTokens"], 512);
    }

    #[test]
    fn inference_request_optional_fields_default() {
        let json = r#"{
            "sessionId": "s",
            "userId": "u",
            "modelId": "m",
            "providerId": "p",
            "text": "hello"
        }"#;
        let request: InferenceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.mode, InteractionMode::Completion);
        assert!(request.image_reference.is_none());
        assert!(request.model_parameters.is_empty());
    }

    #[test]
    fn unknown_parameter_keys_pass_through_untouched() {
        let json = r#"{"temperature": 0.7, "topP": 0.9, "stopSequences": ["User:"]}"#;
        let params: ModelParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.temperature(), Some(0.7));
        assert_eq!(params.top_p(), Some(0.9));
        assert!(params.max_tokens().is_none());
        assert!(params.0.contains_key("stopSequences"));
    }

    #[test]
    fn channel_events_are_tagged_by_action() {
        let token = ChannelEvent::LlmNewToken(TokenEvent {
            session_id: "s".into(),
            run_id: "r".into(),
            sequence_number: 0,
            value: "Hel".into(),
        });
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["action"], "llm_new_token");
        assert_eq!(json["data"]["sequenceNumber"], 0);
        assert_eq!(json["data"]["runId"], "r");

        let done = ChannelEvent::FinalResponse {
            session_id: "s".into(),
            content: "Hello".into(),
            metadata: serde_json::Map::new(),
        };
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["action"], "final_response");
        assert_eq!(json["data"]["sessionId"], "s");
        assert_eq!(json["data"]["content"], "Hello");
    }

    #[test]
    fn terminal_events_are_distinguished_from_tokens() {
        let token = ChannelEvent::LlmNewToken(TokenEvent {
            session_id: "s".into(),
            run_id: "r".into(),
            sequence_number: 3,
            value: "x".into(),
        });
        assert!(!token.is_terminal());

        let error = ChannelEvent::Error {
            session_id: "s".into(),
            content: "endpoint error".into(),
        };
        assert!(error.is_terminal());
        assert_eq!(error.session_id(), "s");
    }

    #[test]
    fn turn_kind_round_trips_through_strings() {
        use std::str::FromStr;
        assert_eq!(TurnKind::Human.to_string(), "human");
        assert_eq!(TurnKind::Ai.to_string(), "ai");
        assert_eq!(TurnKind::from_str("ai").unwrap(), TurnKind::Ai);
    }
}
