use crate::sdk::broadcast::StatusBroadcaster;
use crate::sdk::tools::ToolRegistry;
use crate::transport::rest::BackendClient;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

/// Arguments for the `lookup_medical` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MedicalLookupArgs {
    /// The name of the user whose medical record should be looked up.
    pub name: String,
}

/// Arguments for the `query_emergency` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmergencyQueryArgs {
    /// The emergency-preparedness question to ask the knowledge base.
    pub query: String,
}

/// The assistant's two callable tools, bound to the backend and the status
/// broadcaster.
pub struct AssistantToolkit {
    backend: Arc<BackendClient>,
    broadcaster: Arc<StatusBroadcaster>,
}

impl AssistantToolkit {
    #[must_use]
    pub fn new(backend: Arc<BackendClient>, broadcaster: Arc<StatusBroadcaster>) -> Self {
        Self { backend, broadcaster }
    }

    /// Build a registry declaring exactly the two assistant tools.
    #[must_use]
    pub fn into_registry(self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        self.register(&mut registry);
        registry
    }

    /// Declare `lookup_medical` and `query_emergency` on an existing
    /// registry.
    pub fn register(&self, registry: &mut ToolRegistry) {
        let backend = Arc::clone(&self.backend);
        let broadcaster = Arc::clone(&self.broadcaster);
        registry.tool_with_description(
            "lookup_medical",
            "Called when the user asks about their medical data. Returns a summary \
             of the stored medical record for the given user name.",
            move |args: MedicalLookupArgs| {
                let backend = Arc::clone(&backend);
                let broadcaster = Arc::clone(&broadcaster);
                async move {
                    tracing::info!(name = %args.name, "getting medical data");
                    broadcaster.broadcast(format!("Looking up medical data for {}", args.name));
                    match backend.fetch_medical_data(&args.name).await {
                        Ok(envelope) => {
                            broadcaster
                                .broadcast(format!("Medical data lookup for {} complete", args.name));
                            Ok(envelope.summarize())
                        }
                        Err(err) => {
                            broadcaster.broadcast(format!(
                                "Medical data lookup for {} failed: {err}",
                                args.name
                            ));
                            Err(err)
                        }
                    }
                }
            },
        );

        let backend = Arc::clone(&self.backend);
        let broadcaster = Arc::clone(&self.broadcaster);
        registry.tool_with_description(
            "query_emergency",
            "Called when the user asks an emergency-preparedness or safety question. \
             Returns an answer from the emergency information knowledge base.",
            move |args: EmergencyQueryArgs| {
                let backend = Arc::clone(&backend);
                let broadcaster = Arc::clone(&broadcaster);
                async move {
                    tracing::info!(query = %args.query, "querying emergency information");
                    broadcaster.broadcast(format!("Received emergency question: {}", args.query));
                    broadcaster.broadcast("Sending query payload to the emergency knowledge base");
                    match backend.query_emergency_info(&args.query).await {
                        Ok(answer) => {
                            broadcaster.broadcast("Emergency info query complete");
                            Ok(answer)
                        }
                        Err(err) => {
                            broadcaster.broadcast(format!("Emergency info query failed: {err}"));
                            Err(err)
                        }
                    }
                }
            },
        );
    }
}
