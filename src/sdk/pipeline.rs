use crate::error::{Error, Result};
use crate::sdk::metrics::AgentMetrics;
use crate::sdk::room::{AudioFrame, Participant, Room};
use crate::sdk::tools::{ToolCall, ToolDefinition, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Upper bound on model→tool→model rounds within a single user turn.
const MAX_TOOL_STEPS: usize = 5;
const COMMAND_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Conversation history handed to the language model on every turn.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    messages: Vec<ChatMessage>,
}

impl ChatContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a context seeded with system instructions.
    #[must_use]
    pub fn with_system(instructions: impl Into<String>) -> Self {
        let mut ctx = Self::new();
        ctx.append(ChatRole::System, instructions);
        ctx
    }

    pub fn append(&mut self, role: ChatRole, content: impl Into<String>) -> &mut Self {
        self.messages.push(ChatMessage { role, content: content.into() });
        self
    }

    /// Record a tool invocation's output (or error payload) for the model.
    pub fn append_tool_output(&mut self, call_id: &str, name: &str, output: &Value) {
        let content = serde_json::json!({
            "call_id": call_id,
            "name": name,
            "output": output,
        })
        .to_string();
        self.append(ChatRole::Tool, content);
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// What the model decided to do with a turn.
#[derive(Debug, Clone)]
pub enum LlmTurn {
    Reply(String),
    ToolCalls(Vec<ToolCall>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub turn: LlmTurn,
    pub usage: TokenUsage,
}

/// Gate deciding whether a frame contains speech.
pub trait VoiceActivityDetector: Send + Sync {
    fn is_speech(&self, frame: &AudioFrame) -> bool;
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, frames: &[AudioFrame]) -> Result<String>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn chat(&self, context: &ChatContext, tools: &[ToolDefinition]) -> Result<LlmResponse>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<AudioFrame>>;
}

/// Decides when the speaker has finished their conversational turn.
#[async_trait]
pub trait TurnDetector: Send + Sync {
    async fn is_end_of_turn(&self, transcript: &str) -> Result<bool>;
}

/// The five externally supplied capabilities the pipeline composes.
#[derive(Clone)]
pub struct AgentCapabilities {
    pub vad: Arc<dyn VoiceActivityDetector>,
    pub stt: Arc<dyn SpeechToText>,
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Arc<dyn TextToSpeech>,
    pub turn_detector: Arc<dyn TurnDetector>,
}

/// Notifications surfaced to the session while the pipeline runs.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    MetricsCollected(AgentMetrics),
    UserTranscript(String),
    AgentReply(String),
    UtteranceInterrupted,
}

enum Command {
    Say {
        text: String,
        allow_interruptions: bool,
        respond: oneshot::Sender<Result<()>>,
    },
}

/// Handle for talking to a started pipeline.
#[derive(Clone)]
pub struct PipelineHandle {
    sender: mpsc::Sender<Command>,
}

impl PipelineHandle {
    /// Speak one scripted utterance.
    ///
    /// # Errors
    /// Returns an error if the pipeline has stopped or synthesis/publish
    /// fails.
    pub async fn say(&self, text: &str, allow_interruptions: bool) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Say {
                text: text.to_string(),
                allow_interruptions,
                respond: tx,
            })
            .await
            .map_err(|_| Error::ConnectionClosed)?;
        rx.await.map_err(|_| Error::ConnectionClosed)?
    }
}

/// Voice pipeline: VAD-gated audio in, transcription, tool-calling language
/// model, synthesized audio out.
pub struct VoicePipeline {
    capabilities: AgentCapabilities,
    tools: Arc<ToolRegistry>,
    chat: ChatContext,
}

impl VoicePipeline {
    #[must_use]
    pub fn new(
        capabilities: AgentCapabilities,
        tools: Arc<ToolRegistry>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            capabilities,
            tools,
            chat: ChatContext::with_system(instructions),
        }
    }

    /// Start the pipeline against a room and participant. The returned
    /// event receiver closes when the participant's audio stream ends.
    ///
    /// # Errors
    /// Returns an error if the audio subscription fails.
    pub async fn start(
        self,
        room: Arc<dyn Room>,
        participant: &Participant,
    ) -> Result<(PipelineHandle, mpsc::Receiver<PipelineEvent>)> {
        let audio_rx = room.subscribe_audio(participant).await?;
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let task = PipelineTask {
            capabilities: self.capabilities,
            tools: self.tools,
            chat: self.chat,
            room,
            event_tx,
            speech_buf: Vec::new(),
            in_speech: false,
            pending_transcript: String::new(),
        };
        tokio::spawn(task.run(cmd_rx, audio_rx));

        Ok((PipelineHandle { sender: cmd_tx }, event_rx))
    }
}

struct PipelineTask {
    capabilities: AgentCapabilities,
    tools: Arc<ToolRegistry>,
    chat: ChatContext,
    room: Arc<dyn Room>,
    event_tx: mpsc::Sender<PipelineEvent>,
    speech_buf: Vec<AudioFrame>,
    in_speech: bool,
    pending_transcript: String,
}

impl PipelineTask {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut audio_rx: mpsc::Receiver<AudioFrame>,
    ) {
        // The task ends once the participant's audio stream is over and every
        // pending command has been served.
        let mut audio_open = true;
        let mut cmd_open = true;

        while audio_open || cmd_open {
            tokio::select! {
                cmd = cmd_rx.recv(), if cmd_open => {
                    match cmd {
                        Some(Command::Say { text, allow_interruptions, respond }) => {
                            let result = self.speak(&text, allow_interruptions, &mut audio_rx).await;
                            let _ = respond.send(result);
                        }
                        None => cmd_open = false,
                    }
                }
                frame = audio_rx.recv(), if audio_open => {
                    match frame {
                        Some(frame) => {
                            if let Err(err) = self.on_frame(frame, &mut audio_rx).await {
                                tracing::error!(error = %err, "pipeline turn failed");
                            }
                        }
                        None => audio_open = false,
                    }
                }
            }
        }
    }

    async fn on_frame(
        &mut self,
        frame: AudioFrame,
        audio_rx: &mut mpsc::Receiver<AudioFrame>,
    ) -> Result<()> {
        if self.capabilities.vad.is_speech(&frame) {
            self.in_speech = true;
            self.speech_buf.push(frame);
            return Ok(());
        }

        if !self.in_speech {
            return Ok(());
        }

        // Falling edge: the buffered utterance segment is complete.
        self.in_speech = false;
        let frames = std::mem::take(&mut self.speech_buf);
        let audio_duration_ms: u64 = frames.iter().map(AudioFrame::duration_ms).sum();
        let segment_end = Instant::now();

        let text = self.capabilities.stt.transcribe(&frames).await?;
        self.emit_metrics(AgentMetrics::Stt { audio_duration_ms }).await;

        if text.trim().is_empty() {
            return Ok(());
        }

        if self.pending_transcript.is_empty() {
            self.pending_transcript = text;
        } else {
            self.pending_transcript.push(' ');
            self.pending_transcript.push_str(&text);
        }

        if !self
            .capabilities
            .turn_detector
            .is_end_of_turn(&self.pending_transcript)
            .await?
        {
            return Ok(());
        }

        self.emit_metrics(AgentMetrics::EndOfUtterance { delay_ms: elapsed_ms(segment_end) })
            .await;

        let utterance = std::mem::take(&mut self.pending_transcript);
        let _ = self
            .event_tx
            .send(PipelineEvent::UserTranscript(utterance.clone()))
            .await;
        self.chat.append(ChatRole::User, utterance);

        self.run_turn(audio_rx).await
    }

    /// One full model turn, including any tool rounds. Tool failures are
    /// converted into tool-error outputs and fed back to the model; they
    /// never abort the session.
    async fn run_turn(&mut self, audio_rx: &mut mpsc::Receiver<AudioFrame>) -> Result<()> {
        for _ in 0..MAX_TOOL_STEPS {
            let started = Instant::now();
            let response = self
                .capabilities
                .llm
                .chat(&self.chat, self.tools.definitions())
                .await?;
            self.emit_metrics(AgentMetrics::Llm {
                ttft_ms: elapsed_ms(started),
                prompt_tokens: response.usage.prompt_tokens,
                completion_tokens: response.usage.completion_tokens,
            })
            .await;

            match response.turn {
                LlmTurn::ToolCalls(calls) => {
                    for call in calls {
                        let name = call.name.clone();
                        let call_id = call.call_id.clone();
                        let output = match self.tools.dispatch(call).await {
                            Ok(result) => result.output,
                            Err(err) => {
                                tracing::warn!(tool = %name, error = %err, "tool call failed");
                                serde_json::json!({ "error": err.to_string() })
                            }
                        };
                        self.chat.append_tool_output(&call_id, &name, &output);
                    }
                }
                LlmTurn::Reply(text) => {
                    self.chat.append(ChatRole::Assistant, text.clone());
                    let _ = self.event_tx.send(PipelineEvent::AgentReply(text.clone())).await;
                    return self.speak(&text, true, audio_rx).await;
                }
            }
        }

        tracing::warn!("tool call limit reached; abandoning turn");
        Ok(())
    }

    /// Synthesize and publish one utterance, frame by frame. When
    /// interruptions are allowed, inbound speech aborts the remainder of the
    /// utterance and is buffered as the start of the next user turn.
    async fn speak(
        &mut self,
        text: &str,
        allow_interruptions: bool,
        audio_rx: &mut mpsc::Receiver<AudioFrame>,
    ) -> Result<()> {
        let started = Instant::now();
        let frames = self.capabilities.tts.synthesize(text).await?;
        let audio_duration_ms: u64 = frames.iter().map(AudioFrame::duration_ms).sum();
        self.emit_metrics(AgentMetrics::Tts {
            ttfb_ms: elapsed_ms(started),
            audio_duration_ms,
        })
        .await;

        for frame in &frames {
            self.room.publish_audio(frame).await?;

            if allow_interruptions && self.drain_for_interruption(audio_rx) {
                let _ = self.event_tx.send(PipelineEvent::UtteranceInterrupted).await;
                tracing::debug!("utterance interrupted by participant speech");
                break;
            }
        }

        Ok(())
    }

    /// Poll inbound audio without blocking; returns true when speech
    /// arrived. Interrupting speech is kept so the next turn starts from it.
    fn drain_for_interruption(&mut self, audio_rx: &mut mpsc::Receiver<AudioFrame>) -> bool {
        while let Ok(frame) = audio_rx.try_recv() {
            if self.capabilities.vad.is_speech(&frame) {
                self.in_speech = true;
                self.speech_buf.push(frame);
                return true;
            }
        }
        false
    }

    async fn emit_metrics(&self, metrics: AgentMetrics) {
        let _ = self
            .event_tx
            .send(PipelineEvent::MetricsCollected(metrics))
            .await;
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
