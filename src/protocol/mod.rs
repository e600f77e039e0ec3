//! Wire types for the assistant's external interfaces: the medical-data and
//! emergency-info backend, and the realtime log channel.

pub mod medical;
pub mod rag;
pub mod realtime;

pub use medical::{MedicalDataEnvelope, MedicalInfo, MedicalRecord};
pub use rag::{NO_ANSWER_FALLBACK, RagRequest, RagResponse};
pub use realtime::{
    BroadcastPayload, ChannelEvent, JoinConfig, JoinPayload, LogMessage, RealtimeMessage,
    ReplyPayload, ReplyStatus, LOG_CHANNEL, LOG_EVENT,
};
