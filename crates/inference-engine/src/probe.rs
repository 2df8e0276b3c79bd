//! Model Dependency Probe

use crate::engine::{OnnxModel, ScoringModel};
use crate::InferenceError;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Loads the model artifact; called at most once per probe
pub type ModelLoader =
    Box<dyn Fn() -> Result<Arc<dyn ScoringModel>, InferenceError> + Send + Sync>;

/// Cached verdict on whether the statistical path is usable
#[derive(Clone)]
pub enum DependencyStatus {
    Available {
        model: Arc<dyn ScoringModel>,
        source: String,
    },
    Unavailable {
        reason: String,
    },
}

impl DependencyStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, DependencyStatus::Available { .. })
    }

    /// Diagnostic for an unavailable model
    pub fn reason(&self) -> Option<&str> {
        match self {
            DependencyStatus::Available { .. } => None,
            DependencyStatus::Unavailable { reason } => Some(reason),
        }
    }

    /// Loaded model handle, if any
    pub fn model(&self) -> Option<&dyn ScoringModel> {
        match self {
            DependencyStatus::Available { model, .. } => Some(model.as_ref()),
            DependencyStatus::Unavailable { .. } => None,
        }
    }
}

impl fmt::Debug for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyStatus::Available { model, source } => f
                .debug_struct("Available")
                .field("model", &model.describe())
                .field("source", source)
                .finish(),
            DependencyStatus::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Decides once whether the model artifact can be loaded and caches the
/// loaded handle or the failure reason.
///
/// Construct one at process start and share it by `Arc`. Concurrent first
/// callers block on the same initialization, so the loader runs exactly once.
pub struct DependencyProbe {
    source: String,
    loader: ModelLoader,
    status: OnceLock<DependencyStatus>,
}

impl DependencyProbe {
    /// Probe an ONNX artifact at a fixed path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let source = path.display().to_string();
        Self::with_loader(source, move || {
            OnnxModel::load(&path).map(|model| Arc::new(model) as Arc<dyn ScoringModel>)
        })
    }

    /// Probe with a custom loader
    pub fn with_loader<F>(source: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ScoringModel>, InferenceError> + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            loader: Box::new(loader),
            status: OnceLock::new(),
        }
    }

    /// A probe whose verdict is fixed to unavailable
    pub fn disabled(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::with_loader("disabled", move || {
            Err(InferenceError::ModelLoadError(reason.clone()))
        })
    }

    /// Cached status, running the load on first call
    pub fn probe(&self) -> &DependencyStatus {
        self.status.get_or_init(|| self.load())
    }

    /// Whether the probe has already run
    pub fn is_resolved(&self) -> bool {
        self.status.get().is_some()
    }

    /// Where the model is loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    fn load(&self) -> DependencyStatus {
        match (self.loader)() {
            Ok(model) => {
                info!(
                    source = %self.source,
                    model = %model.describe(),
                    "Statistical model available"
                );
                DependencyStatus::Available {
                    model,
                    source: self.source.clone(),
                }
            }
            Err(e) => {
                warn!(
                    source = %self.source,
                    reason = %e,
                    "Statistical model unavailable, using rule-based scoring"
                );
                DependencyStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl fmt::Debug for DependencyProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyProbe")
            .field("source", &self.source)
            .field("status", &self.status.get())
            .finish()
    }
}
