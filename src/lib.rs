#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Voice-assistant worker for emergency-response rooms.
//!
//! The crate wires five externally supplied capabilities (voice-activity
//! detection, speech-to-text, a tool-calling language model, text-to-speech,
//! and turn detection) into a session that joins a realtime audio room,
//! answers by voice, and can call two backend tools: a medical-record lookup
//! and an emergency-information knowledge-base query. Status log lines go
//! out over a separate realtime broadcast channel, best effort.
//!
//! Layers:
//! - [`protocol`]: wire types for the backend HTTP API and the realtime
//!   log channel.
//! - [`transport`]: the HTTP adapter and the realtime websocket connector.
//! - [`sdk`]: the tool registry, broadcaster, pipeline, session, and
//!   worker entrypoint.

pub mod config;
pub mod error;
pub mod protocol;
pub mod sdk;
pub mod transport;

pub use config::{AgentConfig, RealtimeCredentials};
pub use error::{Error, Result};
pub use sdk::{
    run_app, run_assistant, AgentCapabilities, AgentMetrics, AgentSession, AssistantToolkit,
    AudioFrame, AutoSubscribe, ChatContext, ChatRole, JobContext, LanguageModel, LlmResponse,
    LlmTurn, Participant, PipelineEvent, PipelineHandle, Room, SessionState, SpeechToText,
    StatusBroadcaster, TextToSpeech, ToolCall, ToolDefinition, ToolRegistry, ToolResult,
    TurnDetector, UsageCollector, UsageSummary, VoiceActivityDetector, VoicePipeline, Worker,
    WorkerOptions,
};
pub use transport::rest::BackendClient;
