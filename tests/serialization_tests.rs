use serde_json::json;
use triage_voice::protocol::rag::{RagResponse, NO_ANSWER_FALLBACK};
use triage_voice::protocol::realtime::{
    BroadcastPayload, ChannelEvent, LogMessage, RealtimeMessage, ReplyStatus,
};

// =============================================================================
// Realtime frame shapes
// =============================================================================

#[test]
fn join_frame_matches_wire_shape() {
    let frame = RealtimeMessage::join_log_channel("anon-key", "1").unwrap();
    let value = serde_json::to_value(&frame).unwrap();

    assert_eq!(
        value,
        json!({
            "topic": "realtime:agent_logs",
            "event": "phx_join",
            "payload": {
                "config": {
                    "broadcast": { "self": false, "ack": false },
                    "presence": { "key": "" },
                    "postgres_changes": []
                },
                "access_token": "anon-key"
            },
            "ref": "1"
        })
    );
}

#[test]
fn broadcast_frame_matches_wire_shape() {
    let frame = RealtimeMessage::broadcast_log("agent started", "2").unwrap();
    let value = serde_json::to_value(&frame).unwrap();

    assert_eq!(
        value,
        json!({
            "topic": "realtime:agent_logs",
            "event": "broadcast",
            "payload": {
                "type": "broadcast",
                "event": "log",
                "payload": { "message": "agent started" }
            },
            "ref": "2"
        })
    );
}

#[test]
fn broadcast_payload_round_trips_log_message() {
    let frame = RealtimeMessage::broadcast_log("ping", "9").unwrap();
    let payload: BroadcastPayload = serde_json::from_value(frame.payload).unwrap();
    assert_eq!(payload.event, "log");
    let log: LogMessage = serde_json::from_value(payload.payload).unwrap();
    assert_eq!(log.message, "ping");
}

#[test]
fn ok_reply_parses() {
    let incoming = json!({
        "topic": "realtime:agent_logs",
        "event": "phx_reply",
        "payload": { "status": "ok", "response": { "postgres_changes": [] } },
        "ref": "1"
    });

    let frame: RealtimeMessage = serde_json::from_value(incoming).unwrap();
    assert_eq!(frame.event, ChannelEvent::Reply);
    let reply = frame.reply_payload().unwrap();
    assert_eq!(reply.status, ReplyStatus::Ok);
}

#[test]
fn error_reply_parses() {
    let incoming = json!({
        "topic": "realtime:agent_logs",
        "event": "phx_reply",
        "payload": { "status": "error", "response": { "reason": "unauthorized" } },
        "ref": "1"
    });

    let frame: RealtimeMessage = serde_json::from_value(incoming).unwrap();
    let reply = frame.reply_payload().unwrap();
    assert_eq!(reply.status, ReplyStatus::Error);
    assert_eq!(reply.response["reason"], "unauthorized");
}

#[test]
fn unrecognized_event_maps_to_unknown() {
    let incoming = json!({
        "topic": "realtime:agent_logs",
        "event": "presence_state",
        "payload": {},
        "ref": null
    });

    let frame: RealtimeMessage = serde_json::from_value(incoming).unwrap();
    assert_eq!(frame.event, ChannelEvent::Unknown);
    assert!(frame.message_ref.is_none());
}

// =============================================================================
// RAG response shapes
// =============================================================================

#[test]
fn rag_response_returns_answer_text() {
    let parsed: RagResponse = serde_json::from_value(json!({ "response": "Call 911" })).unwrap();
    assert_eq!(parsed.into_answer(), "Call 911");
}

#[test]
fn rag_response_without_field_uses_fallback() {
    let parsed: RagResponse = serde_json::from_value(json!({})).unwrap();
    assert_eq!(parsed.into_answer(), NO_ANSWER_FALLBACK);
    assert_eq!(NO_ANSWER_FALLBACK, "I couldn't find information about that.");
}
