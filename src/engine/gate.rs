use crate::{KnowledgeError, Result};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::RetrievalEngine;

/// Lifecycle of the engine behind the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

impl GateState {
    #[inline]
    pub fn describe(&self) -> String {
        match self {
            Self::Uninitialized => "not initialized".to_string(),
            Self::Initializing => "initializing".to_string(),
            Self::Ready => "ready".to_string(),
            Self::Failed(message) => format!("failed: {message}"),
        }
    }
}

/// Hands out the engine once background initialization completes.
///
/// The server starts answering protocol traffic immediately while the index
/// and embedding backend come up in a spawned task; tool calls park on
/// [`EngineGate::ready`] until the gate opens or initialization fails.
pub struct EngineGate {
    state: watch::Sender<GateState>,
    engine: OnceLock<Arc<RetrievalEngine>>,
}

impl EngineGate {
    #[inline]
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Uninitialized);
        Self {
            state,
            engine: OnceLock::new(),
        }
    }

    /// Mark initialization as started.
    #[inline]
    pub fn begin(&self) {
        self.state.send_replace(GateState::Initializing);
    }

    /// Publish the engine and wake everyone waiting on [`EngineGate::ready`].
    #[inline]
    pub fn finish(&self, engine: Arc<RetrievalEngine>) {
        if self.engine.set(engine).is_err() {
            warn!("Engine gate finished more than once, keeping the first engine");
            return;
        }
        self.state.send_replace(GateState::Ready);
        info!("Engine initialized, gate open");
    }

    /// Record an initialization failure; waiters get the message as an error.
    #[inline]
    pub fn fail(&self, message: String) {
        error!("Engine initialization failed: {}", message);
        self.state.send_replace(GateState::Failed(message));
    }

    #[inline]
    pub fn state(&self) -> GateState {
        self.state.borrow().clone()
    }

    /// Wait until the engine is available, or fail fast if initialization
    /// already failed.
    #[inline]
    pub async fn ready(&self) -> Result<Arc<RetrievalEngine>> {
        let mut rx = self.state.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            match current {
                GateState::Ready => {
                    return self.engine.get().cloned().ok_or_else(|| {
                        KnowledgeError::Index(
                            "Engine gate is open but holds no engine".to_string(),
                        )
                    });
                }
                GateState::Failed(message) => {
                    return Err(KnowledgeError::Index(format!(
                        "Engine initialization failed: {message}"
                    )));
                }
                GateState::Uninitialized | GateState::Initializing => {
                    rx.changed().await.map_err(|_| {
                        KnowledgeError::Index(
                            "Engine gate dropped before initialization completed".to_string(),
                        )
                    })?;
                }
            }
        }
    }
}

impl Default for EngineGate {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
