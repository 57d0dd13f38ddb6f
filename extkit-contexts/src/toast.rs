//! Transient user notifications.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
}

impl ToastKind {
    /// CSS class of the toast element.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

/// Shows toasts to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: ToastKind);
}

/// Toast animation timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    /// Delay before the show transition starts (ms).
    pub show_delay_ms: u64,
    /// How long the toast stays visible (ms).
    pub show_duration_ms: u64,
    /// Hide transition length before removal (ms).
    pub transition_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            show_delay_ms: 100,
            show_duration_ms: 4000,
            transition_ms: 300,
        }
    }
}

/// Lifecycle stages of one toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Mounted,
    Shown,
    Hidden,
    Removed,
}

/// Plays one toast's lifecycle, reporting each phase as it is reached.
pub async fn play_toast<F>(config: &ToastConfig, mut on_phase: F)
where
    F: FnMut(ToastPhase),
{
    on_phase(ToastPhase::Mounted);
    tokio::time::sleep(Duration::from_millis(config.show_delay_ms)).await;
    on_phase(ToastPhase::Shown);
    tokio::time::sleep(Duration::from_millis(config.show_duration_ms)).await;
    on_phase(ToastPhase::Hidden);
    tokio::time::sleep(Duration::from_millis(config.transition_ms)).await;
    on_phase(ToastPhase::Removed);
}

type Board = Arc<Mutex<Vec<(u64, Toast, ToastPhase)>>>;

/// A toast container: each notification is logged, mounted, and removed
/// again once its lifecycle completes.
#[derive(Clone, Default)]
pub struct ToastBoard {
    config: ToastConfig,
    toasts: Board,
    next_id: Arc<Mutex<u64>>,
}

impl ToastBoard {
    pub fn new(config: ToastConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Toasts still mounted, with their current phase.
    pub fn mounted(&self) -> Vec<(Toast, ToastPhase)> {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, toast, phase)| (toast.clone(), *phase))
            .collect()
    }

    /// Messages of the toasts currently visible.
    pub fn visible(&self) -> Vec<String> {
        self.mounted()
            .into_iter()
            .filter(|(_, phase)| *phase == ToastPhase::Shown)
            .map(|(toast, _)| toast.message)
            .collect()
    }
}

impl Notifier for ToastBoard {
    fn notify(&self, message: &str, kind: ToastKind) {
        match kind {
            ToastKind::Error | ToastKind::Warning => warn!("[toast:{}] {}", kind.as_str(), message),
            ToastKind::Success => info!("[toast:{}] {}", kind.as_str(), message),
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        let toast = Toast {
            message: message.to_string(),
            kind,
        };
        let toasts = self.toasts.clone();
        let config = self.config.clone();
        runtime.spawn(async move {
            play_toast(&config, |phase| {
                let mut board = toasts.lock().unwrap_or_else(PoisonError::into_inner);
                match phase {
                    ToastPhase::Mounted => board.push((id, toast.clone(), phase)),
                    ToastPhase::Removed => board.retain(|(i, _, _)| *i != id),
                    _ => {
                        if let Some(entry) = board.iter_mut().find(|(i, _, _)| *i == id) {
                            entry.2 = phase;
                        }
                    }
                }
            })
            .await;
        });
    }
}
