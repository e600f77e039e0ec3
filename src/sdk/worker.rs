use crate::error::{Error, Result};
use crate::sdk::pipeline::VoiceActivityDetector;
use crate::sdk::room::Room;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

pub type JobFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

type EntrypointFn = Arc<dyn Fn(JobContext) -> JobFuture + Send + Sync>;
type PrewarmFn = Arc<dyn Fn(&JobProcess) -> Result<()> + Send + Sync>;

/// Type-keyed shared data living for the lifetime of the worker process.
#[derive(Default)]
pub struct UserData {
    entries: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl UserData {
    pub fn insert<T: Any + Send + Sync>(&self, value: Arc<T>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(TypeId::of::<T>(), value);
        }
    }

    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let value = {
            let entries = self.entries.lock().ok()?;
            entries.get(&TypeId::of::<T>())?.clone()
        };
        value.downcast::<T>().ok()
    }
}

/// The voice-activity detector loaded once per worker process by the prewarm
/// callback and shared across jobs.
pub struct PrewarmedVad(pub Arc<dyn VoiceActivityDetector>);

/// Per-process state shared by every job the worker runs.
#[derive(Default)]
pub struct JobProcess {
    userdata: UserData,
}

impl JobProcess {
    #[must_use]
    pub fn userdata(&self) -> &UserData {
        &self.userdata
    }
}

/// Everything one job needs: the room to join and the process-wide shared
/// data.
pub struct JobContext {
    pub room: Arc<dyn Room>,
    pub proc: Arc<JobProcess>,
}

impl JobContext {
    /// The VAD stashed by the prewarm callback.
    ///
    /// # Errors
    /// Returns an error if no prewarm ran or it stashed nothing.
    #[allow(clippy::result_large_err)]
    pub fn prewarmed_vad(&self) -> Result<Arc<dyn VoiceActivityDetector>> {
        self.proc
            .userdata()
            .get::<PrewarmedVad>()
            .map(|prewarmed| Arc::clone(&prewarmed.0))
            .ok_or_else(|| {
                Error::Capability("voice activity detector was not prewarmed".to_string())
            })
    }
}

/// Worker configuration: the job entrypoint plus an optional prewarm hook.
pub struct WorkerOptions {
    entrypoint: EntrypointFn,
    prewarm: Option<PrewarmFn>,
}

impl WorkerOptions {
    pub fn new<F, Fut>(entrypoint: F) -> Self
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            entrypoint: Arc::new(move |ctx| Box::pin(entrypoint(ctx))),
            prewarm: None,
        }
    }

    /// Hook run once per worker process before any job, typically to load
    /// the VAD model into [`JobProcess`] userdata.
    #[must_use]
    pub fn prewarm<P>(mut self, prewarm: P) -> Self
    where
        P: Fn(&JobProcess) -> Result<()> + Send + Sync + 'static,
    {
        self.prewarm = Some(Arc::new(prewarm));
        self
    }
}

/// A running worker: prewarmed once, launches one session per job.
pub struct Worker {
    entrypoint: EntrypointFn,
    proc: Arc<JobProcess>,
}

impl Worker {
    /// Build the worker and run the prewarm hook.
    ///
    /// # Errors
    /// Returns an error if the prewarm hook fails.
    #[allow(clippy::result_large_err)]
    pub fn new(options: WorkerOptions) -> Result<Self> {
        let proc = Arc::new(JobProcess::default());
        if let Some(prewarm) = &options.prewarm {
            prewarm(&proc)?;
        }
        Ok(Self { entrypoint: options.entrypoint, proc })
    }

    /// Run the entrypoint for one job against the given room.
    ///
    /// # Errors
    /// Propagates the entrypoint's error.
    pub async fn launch_job(&self, room: Arc<dyn Room>) -> Result<()> {
        let ctx = JobContext { room, proc: Arc::clone(&self.proc) };
        (self.entrypoint)(ctx).await
    }
}

/// Worker-style app bootstrap: load `.env.local`, install the tracing
/// subscriber, prewarm, and hand back the worker for the runtime to drive.
///
/// # Errors
/// Returns an error if the prewarm hook fails.
#[allow(clippy::result_large_err)]
pub fn run_app(options: WorkerOptions) -> Result<Worker> {
    crate::config::load_env_file();
    init_tracing();
    Worker::new(options)
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::room::{AudioFrame, AutoSubscribe, Participant};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct NullRoom;

    #[async_trait]
    impl Room for NullRoom {
        fn name(&self) -> &str {
            "null"
        }

        async fn connect(&self, _subscribe: AutoSubscribe) -> Result<()> {
            Ok(())
        }

        async fn wait_for_participant(&self) -> Result<Participant> {
            Ok(Participant { identity: "user-1".to_string() })
        }

        async fn subscribe_audio(
            &self,
            _participant: &Participant,
        ) -> Result<mpsc::Receiver<AudioFrame>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn publish_audio(&self, _frame: &AudioFrame) -> Result<()> {
            Ok(())
        }
    }

    struct NeverSpeech;

    impl VoiceActivityDetector for NeverSpeech {
        fn is_speech(&self, _frame: &AudioFrame) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn prewarm_runs_once_and_vad_is_shared_across_jobs() {
        let prewarm_count = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&prewarm_count);

        let options = WorkerOptions::new(|ctx: JobContext| async move {
            ctx.prewarmed_vad()?;
            Ok(())
        })
        .prewarm(move |proc| {
            count.fetch_add(1, Ordering::SeqCst);
            proc.userdata().insert(Arc::new(PrewarmedVad(Arc::new(NeverSpeech))));
            Ok(())
        });

        let worker = Worker::new(options).unwrap();
        worker.launch_job(Arc::new(NullRoom)).await.unwrap();
        worker.launch_job(Arc::new(NullRoom)).await.unwrap();

        assert_eq!(prewarm_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_prewarm_surfaces_capability_error() {
        let options = WorkerOptions::new(|ctx: JobContext| async move {
            ctx.prewarmed_vad().map(|_| ())
        });

        let worker = Worker::new(options).unwrap();
        let err = worker.launch_job(Arc::new(NullRoom)).await.unwrap_err();
        assert!(matches!(err, Error::Capability(_)));
    }
}
