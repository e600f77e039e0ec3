use crate::config::AgentConfig;
use crate::error::Result;
use crate::sdk::assistant::AssistantToolkit;
use crate::sdk::broadcast::StatusBroadcaster;
use crate::sdk::metrics::{log_metrics, AgentMetrics, UsageCollector, UsageSummary};
use crate::sdk::pipeline::{AgentCapabilities, PipelineEvent, VoicePipeline};
use crate::sdk::room::{AutoSubscribe, Room};
use crate::sdk::tools::ToolRegistry;
use crate::sdk::worker::JobContext;
use crate::transport::rest::BackendClient;
use std::sync::Arc;
use tokio::sync::watch;

/// System instructions seeded into every session's chat context.
pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a voice assistant for emergency preparedness and response. \
     Your interface with users is voice: use short and concise responses, \
     and avoid unpronounceable punctuation. You can look up a person's \
     stored medical record by name and answer emergency preparedness \
     questions from a knowledge base.";

/// Scripted greeting spoken once the pipeline starts.
pub const GREETING: &str = "Hey, how can I help you today?";

/// Session lifecycle. `Active` persists until the runtime tears the job
/// down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    AwaitingParticipant,
    Active,
}

/// One voice-assistant session in one room.
pub struct AgentSession {
    room: Arc<dyn Room>,
    capabilities: AgentCapabilities,
    tools: Arc<ToolRegistry>,
    broadcaster: Arc<StatusBroadcaster>,
    instructions: String,
    state_tx: watch::Sender<SessionState>,
    usage: UsageCollector,
}

impl AgentSession {
    #[must_use]
    pub fn new(
        room: Arc<dyn Room>,
        capabilities: AgentCapabilities,
        tools: ToolRegistry,
        broadcaster: Arc<StatusBroadcaster>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            room,
            capabilities,
            tools: Arc::new(tools),
            broadcaster,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            state_tx,
            usage: UsageCollector::new(),
        }
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Watch session state transitions.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    #[must_use]
    pub fn current_state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    #[must_use]
    pub fn usage_summary(&self) -> UsageSummary {
        self.usage.summary()
    }

    /// Drive the session to completion: connect, wait for a participant,
    /// start the pipeline, greet, then forward pipeline events until the
    /// audio stream ends.
    ///
    /// # Errors
    /// Returns an error if connecting, subscribing, or the greeting fails.
    /// Tool and broadcast failures never surface here.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(room = self.room.name(), "connecting to room");
        self.room.connect(AutoSubscribe::AudioOnly).await?;
        self.state_tx.send_replace(SessionState::Connected);
        // Audio-only subscription leaves nothing to negotiate before the
        // first participant shows up.
        self.state_tx.send_replace(SessionState::AwaitingParticipant);

        let participant = self.room.wait_for_participant().await?;
        tracing::info!(
            identity = %participant.identity,
            "starting voice assistant for participant"
        );
        self.state_tx.send_replace(SessionState::Active);

        let pipeline = VoicePipeline::new(
            self.capabilities.clone(),
            Arc::clone(&self.tools),
            self.instructions.clone(),
        );
        let (handle, mut events) = pipeline.start(Arc::clone(&self.room), &participant).await?;

        handle.say(GREETING, true).await?;
        // Releasing the handle lets the pipeline wind down once the audio
        // stream ends.
        drop(handle);

        while let Some(event) = events.recv().await {
            if let PipelineEvent::MetricsCollected(metrics) = event {
                self.on_metrics(&metrics);
            }
        }

        tracing::info!(usage = ?self.usage.summary(), "session audio stream ended");
        Ok(())
    }

    fn on_metrics(&mut self, metrics: &AgentMetrics) {
        log_metrics(metrics);
        self.usage.collect(metrics);
        match serde_json::to_string(metrics) {
            Ok(payload) => self.broadcaster.broadcast(format!("metrics: {payload}")),
            Err(err) => tracing::warn!(error = %err, "failed to serialize metrics payload"),
        }
    }
}

/// Canonical job entrypoint: build the backend clients and toolkit from
/// configuration, then run a session against the job's room.
///
/// # Errors
/// Returns an error if the backend client cannot be built or the session
/// fails to start.
pub async fn run_assistant(
    ctx: JobContext,
    capabilities: AgentCapabilities,
    config: &AgentConfig,
) -> Result<()> {
    let backend = Arc::new(BackendClient::new(&config.backend_base_url)?);
    let broadcaster = Arc::new(StatusBroadcaster::new(config.realtime.clone()));
    let toolkit = AssistantToolkit::new(backend, Arc::clone(&broadcaster));
    let mut session =
        AgentSession::new(ctx.room, capabilities, toolkit.into_registry(), broadcaster);
    session.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sdk::pipeline::{
        ChatContext, ChatMessage, ChatRole, LanguageModel, LlmResponse, LlmTurn, SpeechToText,
        TextToSpeech, TokenUsage, TurnDetector, VoiceActivityDetector,
    };
    use crate::sdk::room::{AudioFrame, Participant};
    use crate::sdk::tools::{ToolCall, ToolDefinition};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    const SAMPLE_RATE: u32 = 16_000;

    fn speech_frame() -> AudioFrame {
        AudioFrame { samples: vec![512; 160], sample_rate: SAMPLE_RATE }
    }

    fn silence_frame() -> AudioFrame {
        AudioFrame { samples: vec![0; 160], sample_rate: SAMPLE_RATE }
    }

    struct MockRoom {
        inbound: Mutex<Option<Vec<AudioFrame>>>,
        published: Mutex<Vec<AudioFrame>>,
        connect_mode: Mutex<Option<AutoSubscribe>>,
    }

    impl MockRoom {
        fn new(inbound: Vec<AudioFrame>) -> Arc<Self> {
            Arc::new(Self {
                inbound: Mutex::new(Some(inbound)),
                published: Mutex::new(Vec::new()),
                connect_mode: Mutex::new(None),
            })
        }

        fn published_count(&self) -> usize {
            self.published.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Room for MockRoom {
        fn name(&self) -> &str {
            "room-1"
        }

        async fn connect(&self, subscribe: AutoSubscribe) -> Result<()> {
            *self.connect_mode.lock().unwrap() = Some(subscribe);
            Ok(())
        }

        async fn wait_for_participant(&self) -> Result<Participant> {
            Ok(Participant { identity: "user-1".to_string() })
        }

        async fn subscribe_audio(
            &self,
            _participant: &Participant,
        ) -> Result<mpsc::Receiver<AudioFrame>> {
            let frames = self.inbound.lock().unwrap().take().unwrap_or_default();
            let (tx, rx) = mpsc::channel(frames.len().max(1));
            for frame in frames {
                tx.send(frame).await.map_err(|_| Error::ConnectionClosed)?;
            }
            Ok(rx)
        }

        async fn publish_audio(&self, frame: &AudioFrame) -> Result<()> {
            self.published.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }

    struct EnergyVad;

    impl VoiceActivityDetector for EnergyVad {
        fn is_speech(&self, frame: &AudioFrame) -> bool {
            frame.samples.iter().any(|sample| *sample != 0)
        }
    }

    struct FixedStt(String);

    #[async_trait]
    impl SpeechToText for FixedStt {
        async fn transcribe(&self, _frames: &[AudioFrame]) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct AlwaysDone;

    #[async_trait]
    impl TurnDetector for AlwaysDone {
        async fn is_end_of_turn(&self, _transcript: &str) -> Result<bool> {
            Ok(true)
        }
    }

    struct OneFrameTts;

    #[async_trait]
    impl TextToSpeech for OneFrameTts {
        async fn synthesize(&self, _text: &str) -> Result<Vec<AudioFrame>> {
            Ok(vec![silence_frame()])
        }
    }

    struct ScriptedLlm {
        script: Mutex<VecDeque<LlmTurn>>,
        seen_contexts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedLlm {
        fn new(script: Vec<LlmTurn>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen_contexts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn chat(
            &self,
            context: &ChatContext,
            _tools: &[ToolDefinition],
        ) -> Result<LlmResponse> {
            self.seen_contexts.lock().unwrap().push(context.messages().to_vec());
            let turn = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| LlmTurn::Reply("Okay.".to_string()));
            Ok(LlmResponse {
                turn,
                usage: TokenUsage { prompt_tokens: 100, completion_tokens: 7 },
            })
        }
    }

    fn capabilities(llm: Arc<ScriptedLlm>) -> AgentCapabilities {
        AgentCapabilities {
            vad: Arc::new(EnergyVad),
            stt: Arc::new(FixedStt("what are my allergies".to_string())),
            llm,
            tts: Arc::new(OneFrameTts),
            turn_detector: Arc::new(AlwaysDone),
        }
    }

    #[tokio::test]
    async fn session_connects_audio_only_greets_and_activates() {
        let room = MockRoom::new(Vec::new());
        let llm = ScriptedLlm::new(Vec::new());
        let mut session = AgentSession::new(
            Arc::clone(&room) as Arc<dyn Room>,
            capabilities(llm),
            ToolRegistry::new(),
            Arc::new(StatusBroadcaster::disabled()),
        );

        session.run().await.unwrap();

        assert_eq!(session.current_state(), SessionState::Active);
        assert_eq!(
            *room.connect_mode.lock().unwrap(),
            Some(AutoSubscribe::AudioOnly)
        );
        // Only the greeting was spoken.
        assert_eq!(room.published_count(), 1);
    }

    #[tokio::test]
    async fn turn_produces_reply_audio_and_usage() {
        let room = MockRoom::new(vec![speech_frame(), silence_frame()]);
        let llm = ScriptedLlm::new(vec![LlmTurn::Reply("You listed Penicillin.".to_string())]);
        let mut session = AgentSession::new(
            Arc::clone(&room) as Arc<dyn Room>,
            capabilities(Arc::clone(&llm)),
            ToolRegistry::new(),
            Arc::new(StatusBroadcaster::disabled()),
        );

        session.run().await.unwrap();

        // Greeting plus one reply utterance.
        assert_eq!(room.published_count(), 2);
        let summary = session.usage_summary();
        assert_eq!(summary.llm_prompt_tokens, 100);
        assert_eq!(summary.llm_completion_tokens, 7);
        assert!(summary.stt_audio_duration_ms > 0);
    }

    #[tokio::test]
    async fn tool_failure_feeds_error_back_and_session_survives() {
        let room = MockRoom::new(vec![speech_frame(), silence_frame()]);
        let llm = ScriptedLlm::new(vec![
            LlmTurn::ToolCalls(vec![ToolCall {
                name: "lookup_medical".to_string(),
                call_id: "call_1".to_string(),
                arguments: serde_json::json!({"name": "Jane"}),
            }]),
            LlmTurn::Reply("I could not reach your records.".to_string()),
        ]);

        let mut tools = ToolRegistry::new();
        tools.tool(
            "lookup_medical",
            |_args: serde_json::Value| async move {
                Err::<String, _>(Error::MedicalLookup { status: 503 })
            },
        );

        let mut session = AgentSession::new(
            Arc::clone(&room) as Arc<dyn Room>,
            capabilities(Arc::clone(&llm)),
            tools,
            Arc::new(StatusBroadcaster::disabled()),
        );

        session.run().await.unwrap();
        assert_eq!(session.current_state(), SessionState::Active);

        // The second model call saw a tool message carrying the error and
        // the status code.
        let contexts = llm.seen_contexts.lock().unwrap();
        assert_eq!(contexts.len(), 2);
        let tool_msg = contexts[1]
            .iter()
            .find(|msg| msg.role == ChatRole::Tool)
            .expect("tool output message");
        assert!(tool_msg.content.contains("error"));
        assert!(tool_msg.content.contains("503"));

        // Greeting plus the recovery reply.
        assert_eq!(room.published_count(), 2);
    }
}
