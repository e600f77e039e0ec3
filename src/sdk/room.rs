use crate::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Track subscription mode requested when joining a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoSubscribe {
    /// Subscribe to audio tracks only; the assistant's interface is voice.
    #[default]
    AudioOnly,
    SubscribeAll,
    SubscribeNone,
}

/// A remote participant in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub identity: String,
}

/// A chunk of linear PCM audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Frame duration in milliseconds; zero for an empty or unrated frame.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64).saturating_mul(1000) / u64::from(self.sample_rate)
    }
}

/// The realtime audio room the assistant joins. Implementations wrap the
/// embedding runtime's room handle; this crate only drives the seam.
#[async_trait]
pub trait Room: Send + Sync {
    fn name(&self) -> &str;

    /// Connect to the room with the given subscription mode.
    async fn connect(&self, subscribe: AutoSubscribe) -> Result<()>;

    /// Resolve once a participant is present in the room.
    async fn wait_for_participant(&self) -> Result<Participant>;

    /// Audio frames from the given participant. The channel closes when the
    /// participant leaves or the job is torn down.
    async fn subscribe_audio(&self, participant: &Participant)
        -> Result<mpsc::Receiver<AudioFrame>>;

    /// Publish synthesized assistant audio into the room.
    async fn publish_audio(&self, frame: &AudioFrame) -> Result<()>;
}
