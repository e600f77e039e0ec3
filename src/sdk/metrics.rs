use serde::{Deserialize, Serialize};

/// Per-stage metrics emitted by the voice pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMetrics {
    Stt {
        audio_duration_ms: u64,
    },
    Llm {
        ttft_ms: u64,
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    Tts {
        ttfb_ms: u64,
        audio_duration_ms: u64,
    },
    EndOfUtterance {
        delay_ms: u64,
    },
}

/// Running totals across one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageSummary {
    pub llm_prompt_tokens: u64,
    pub llm_completion_tokens: u64,
    pub stt_audio_duration_ms: u64,
    pub tts_audio_duration_ms: u64,
}

/// Accumulates usage from pipeline metrics notifications.
#[derive(Debug, Default)]
pub struct UsageCollector {
    summary: UsageSummary,
}

impl UsageCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, metrics: &AgentMetrics) {
        match metrics {
            AgentMetrics::Stt { audio_duration_ms } => {
                self.summary.stt_audio_duration_ms += audio_duration_ms;
            }
            AgentMetrics::Llm { prompt_tokens, completion_tokens, .. } => {
                self.summary.llm_prompt_tokens += u64::from(*prompt_tokens);
                self.summary.llm_completion_tokens += u64::from(*completion_tokens);
            }
            AgentMetrics::Tts { audio_duration_ms, .. } => {
                self.summary.tts_audio_duration_ms += audio_duration_ms;
            }
            AgentMetrics::EndOfUtterance { .. } => {}
        }
    }

    #[must_use]
    pub fn summary(&self) -> UsageSummary {
        self.summary.clone()
    }
}

/// Log one metrics notification at info level.
pub fn log_metrics(metrics: &AgentMetrics) {
    match metrics {
        AgentMetrics::Stt { audio_duration_ms } => {
            tracing::info!(audio_duration_ms, "STT metrics");
        }
        AgentMetrics::Llm { ttft_ms, prompt_tokens, completion_tokens } => {
            tracing::info!(ttft_ms, prompt_tokens, completion_tokens, "LLM metrics");
        }
        AgentMetrics::Tts { ttfb_ms, audio_duration_ms } => {
            tracing::info!(ttfb_ms, audio_duration_ms, "TTS metrics");
        }
        AgentMetrics::EndOfUtterance { delay_ms } => {
            tracing::info!(delay_ms, "end-of-utterance metrics");
        }
    }
}
