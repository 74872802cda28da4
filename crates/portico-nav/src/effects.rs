//! Side effects the shell asks its host to perform.
//!
//! The engine never touches the browser or the DOM itself. Every observable
//! action is queued here and consumed by the host with
//! [`Shell::drain_effects`](crate::Shell::drain_effects), in order.

use std::collections::VecDeque;

use serde::Serialize;

use crate::activation::{Alert, ActivationTicket, ConfirmationPrompt};
use crate::messaging::ShellMessage;
use crate::surface::{FrameId, SurfaceKind};

/// Text logged to the host console when an overlay is asked to show `/`.
pub const ABSOLUTE_PATH_PREVENTED: &str = "Navigation with an absolute path prevented.";

/// Effects the host performs on behalf of the shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum ShellEffect {
    /// Push a browser history entry.
    HistoryPush { url: String },
    /// Replace the current browser history entry.
    HistoryReplace { url: String },
    /// Show a user-visible notice.
    Alert(Alert),
    /// Write a warning to the host console.
    ConsoleWarning { text: String },
    /// Show the blocking confirmation for a pending activation.
    ShowConfirmation {
        ticket: ActivationTicket,
        prompt: ConfirmationPrompt,
    },
    /// Remove a confirmation that was answered or superseded.
    DismissConfirmation { ticket: ActivationTicket },
    /// Create an isolated frame and start loading `url` into a surface.
    MountFrame {
        frame: FrameId,
        surface: SurfaceKind,
        url: String,
    },
    /// Hide a frame but keep it alive for later reuse.
    ParkFrame { frame: FrameId },
    /// Show a parked frame again in the primary surface.
    RestoreFrame { frame: FrameId },
    /// Destroy a frame.
    UnmountFrame { frame: FrameId },
    /// Deliver a message across the isolation boundary.
    PostMessage { frame: FrameId, message: ShellMessage },
    /// Split-view collapsed or expanded.
    SplitViewToggled { frame: FrameId, collapsed: bool },
}

/// Ordered outbox of [`ShellEffect`]s.
#[derive(Debug, Default)]
pub struct Effects {
    queue: VecDeque<ShellEffect>,
}

impl Effects {
    pub fn push(&mut self, effect: ShellEffect) {
        self.queue.push_back(effect);
    }

    pub fn warn_console(&mut self, text: impl Into<String>) {
        self.push(ShellEffect::ConsoleWarning { text: text.into() });
    }

    pub fn alert(&mut self, alert: Alert) {
        self.push(ShellEffect::Alert(alert));
    }

    pub fn post(&mut self, frame: FrameId, message: ShellMessage) {
        self.push(ShellEffect::PostMessage { frame, message });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShellEffect> {
        self.queue.iter()
    }

    /// Take every queued effect, oldest first.
    pub fn drain(&mut self) -> Vec<ShellEffect> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_order() {
        let mut effects = Effects::default();
        effects.push(ShellEffect::HistoryPush { url: "/overview".into() });
        effects.warn_console(ABSOLUTE_PATH_PREVENTED);
        effects.alert(Alert::error("Could not find the requested route /x."));
        assert_eq!(effects.len(), 3);

        let drained = effects.drain();
        assert!(effects.is_empty());
        assert_eq!(drained[0], ShellEffect::HistoryPush { url: "/overview".into() });
        assert_eq!(
            drained[1],
            ShellEffect::ConsoleWarning {
                text: "Navigation with an absolute path prevented.".into()
            }
        );
    }

    #[test]
    fn serializes_with_effect_tag() {
        let json = serde_json::to_value(ShellEffect::HistoryReplace { url: "/settings".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"effect": "historyReplace", "url": "/settings"}));
    }
}
