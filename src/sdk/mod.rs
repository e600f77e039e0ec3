//! High-level assistant façade over the wire protocols.
//!
//! The SDK composes the transports into a running voice session: the tool
//! registry and the two assistant tools, the status broadcaster, the
//! capability-driven voice pipeline, the session state machine, and the
//! worker entrypoint. Low-level wire types stay accessible through
//! `crate::protocol` when you need full control.

pub mod assistant;
pub mod broadcast;
pub mod metrics;
pub mod pipeline;
pub mod room;
pub mod session;
pub mod tools;
pub mod worker;

pub use assistant::{AssistantToolkit, EmergencyQueryArgs, MedicalLookupArgs};
pub use broadcast::StatusBroadcaster;
pub use metrics::{log_metrics, AgentMetrics, UsageCollector, UsageSummary};
pub use pipeline::{
    AgentCapabilities, ChatContext, ChatMessage, ChatRole, LanguageModel, LlmResponse, LlmTurn,
    PipelineEvent, PipelineHandle, SpeechToText, TextToSpeech, TokenUsage, TurnDetector,
    VoiceActivityDetector, VoicePipeline,
};
pub use room::{AudioFrame, AutoSubscribe, Participant, Room};
pub use session::{
    run_assistant, AgentSession, SessionState, DEFAULT_INSTRUCTIONS, GREETING,
};
pub use tools::{
    BoxFuture as ToolFuture, ToolCall, ToolDefinition, ToolRegistry, ToolResult,
};
pub use worker::{
    run_app, JobContext, JobProcess, PrewarmedVad, UserData, Worker, WorkerOptions,
};
