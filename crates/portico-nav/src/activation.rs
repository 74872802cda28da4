//! Per-node activation hooks and the gate that evaluates them.
//!
//! Hooks return an [`Activation`]. Synchronous answers are applied before
//! anything becomes visible; a pending answer parks the navigation behind a
//! confirmation prompt until [`ActivationGate::resolve`] is called with the
//! user's choice. At most one decision is pending; a newer navigation
//! supersedes it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NavError, Result};
use crate::tree::{NodeId, Params};

/// Where a navigation request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationSource {
    /// Host code calling the navigation API.
    Api,
    /// A click in the shell chrome.
    Chrome,
    /// A navigation request from an embedded application.
    Frame,
    /// Initial load or a typed URL.
    DirectEntry,
    /// Browser back/forward.
    History,
}

impl NavigationSource {
    /// Hooks guard in-app navigation only.
    pub fn runs_hooks(self) -> bool {
        matches!(self, NavigationSource::Api | NavigationSource::Chrome | NavigationSource::Frame)
    }
}

/// What a hook sees about the attempted navigation.
#[derive(Debug, Clone)]
pub struct ActivationContext<'a> {
    pub node: NodeId,
    pub label: &'a str,
    pub path: &'a str,
    pub path_params: &'a Params,
    pub synced_params: &'a Params,
    pub source: NavigationSource,
}

/// User-visible alert shown instead of navigating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Info,
    Warning,
    Error,
}

impl Alert {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            text: text.into(),
        }
    }
}

/// Blocking confirmation shown while a decision is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationPrompt {
    pub header: String,
    pub body: String,
    pub confirm_label: String,
    pub dismiss_label: String,
}

impl Default for ConfirmationPrompt {
    fn default() -> Self {
        Self {
            header: "Confirmation".to_string(),
            body: "Are you sure you want to do this?".to_string(),
            confirm_label: "Yes".to_string(),
            dismiss_label: "No".to_string(),
        }
    }
}

/// A hook's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Allow,
    Deny { alert: Option<Alert> },
    Redirect(String),
    /// Ask the user first. On confirm, navigate to `follow_up` (or the
    /// original target when `None`).
    Pending {
        prompt: ConfirmationPrompt,
        follow_up: Option<String>,
    },
}

impl Activation {
    pub fn deny() -> Self {
        Activation::Deny { alert: None }
    }

    pub fn deny_with_alert(text: impl Into<String>) -> Self {
        Activation::Deny {
            alert: Some(Alert::info(text)),
        }
    }

    pub fn confirm(prompt: ConfirmationPrompt) -> Self {
        Activation::Pending {
            prompt,
            follow_up: None,
        }
    }

    pub fn confirm_then(prompt: ConfirmationPrompt, follow_up: impl Into<String>) -> Self {
        Activation::Pending {
            prompt,
            follow_up: Some(follow_up.into()),
        }
    }
}

pub trait ActivationHook {
    fn on_activation(&mut self, ctx: &ActivationContext<'_>) -> Activation;
}

impl<F> ActivationHook for F
where
    F: FnMut(&ActivationContext<'_>) -> Activation,
{
    fn on_activation(&mut self, ctx: &ActivationContext<'_>) -> Activation {
        self(ctx)
    }
}

/// Identifies one pending decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivationTicket {
    pub seq: u64,
}

impl fmt::Display for ActivationTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "activation#{}", self.seq)
    }
}

/// The user's answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Confirmation {
    Confirm,
    Dismiss,
}

/// Gate verdict, uniform over sync and async hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Option<Alert>),
    Redirect(String),
    Pending(ActivationTicket, ConfirmationPrompt),
}

#[derive(Debug, Clone)]
struct PendingDecision {
    ticket: ActivationTicket,
    node: NodeId,
    target: String,
    follow_up: String,
}

/// A resolved pending decision: where to go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proceed {
    pub node: NodeId,
    pub path: String,
}

#[derive(Default)]
pub struct ActivationGate {
    hooks: HashMap<String, Box<dyn ActivationHook>>,
    pending: Option<PendingDecision>,
}

impl fmt::Debug for ActivationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationGate")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("pending", &self.pending)
            .finish()
    }
}

impl ActivationGate {
    pub fn register(&mut self, name: impl Into<String>, hook: Box<dyn ActivationHook>) {
        self.hooks.insert(name.into(), hook);
    }

    pub fn has_hook(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Evaluate the hook named by a node for navigation `seq`.
    ///
    /// `target` is the resolved path the navigation would commit to.
    pub fn activate(
        &mut self,
        hook: Option<&str>,
        ctx: &ActivationContext<'_>,
        seq: u64,
    ) -> Result<Decision> {
        let Some(name) = hook else {
            return Ok(Decision::Allow);
        };
        let hook = self
            .hooks
            .get_mut(name)
            .ok_or_else(|| NavError::UnknownHook(name.to_string()))?;

        let decision = match hook.on_activation(ctx) {
            Activation::Allow => Decision::Allow,
            Activation::Deny { alert } => Decision::Deny(alert),
            Activation::Redirect(path) => Decision::Redirect(path),
            Activation::Pending { prompt, follow_up } => {
                let ticket = ActivationTicket { seq };
                if let Some(previous) = self.pending.take() {
                    debug!(superseded = %previous.ticket, "pending activation superseded");
                }
                self.pending = Some(PendingDecision {
                    ticket,
                    node: ctx.node,
                    target: ctx.path.to_string(),
                    follow_up: follow_up.unwrap_or_else(|| ctx.path.to_string()),
                });
                Decision::Pending(ticket, prompt)
            }
        };
        debug!(hook = name, path = ctx.path, ?decision, "activation hook evaluated");
        Ok(decision)
    }

    pub fn pending(&self) -> Option<ActivationTicket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    /// Drop the pending decision because navigation `seq` superseded it.
    pub fn supersede(&mut self, seq: u64) -> Option<ActivationTicket> {
        match &self.pending {
            Some(pending) if pending.ticket.seq < seq => self.pending.take().map(|p| p.ticket),
            _ => None,
        }
    }

    /// Apply the user's answer to a pending decision.
    pub fn resolve(&mut self, ticket: ActivationTicket, answer: Confirmation) -> Result<Proceed> {
        let pending = match &self.pending {
            Some(pending) if pending.ticket == ticket => self.pending.take(),
            _ => None,
        }
        .ok_or(NavError::StaleAsyncResult(ticket.seq))?;

        match answer {
            Confirmation::Confirm => Ok(Proceed {
                node: pending.node,
                path: pending.follow_up,
            }),
            Confirmation::Dismiss => Err(NavError::ActivationCancelled(pending.target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(params: &'a Params, path: &'a str) -> ActivationContext<'a> {
        let root = crate::tree::NodeTree::from_config(&[]).unwrap().root();
        ActivationContext {
            node: root,
            label: "Node with node activation hook",
            path,
            path_params: params,
            synced_params: params,
            source: NavigationSource::Api,
        }
    }

    #[test]
    fn absent_hook_allows() {
        let mut gate = ActivationGate::default();
        let params = Params::new();
        assert_eq!(gate.activate(None, &ctx(&params, "/a"), 1).unwrap(), Decision::Allow);
    }

    #[test]
    fn unknown_hook_is_an_error() {
        let mut gate = ActivationGate::default();
        let params = Params::new();
        assert!(matches!(
            gate.activate(Some("missing"), &ctx(&params, "/a"), 1),
            Err(NavError::UnknownHook(name)) if name == "missing"
        ));
    }

    #[test]
    fn sync_denial_carries_alert() {
        let mut gate = ActivationGate::default();
        gate.register(
            "deny",
            Box::new(|_: &ActivationContext<'_>| {
                Activation::deny_with_alert("Showing an alert instead of navigating")
            }),
        );
        let params = Params::new();
        let decision = gate.activate(Some("deny"), &ctx(&params, "/a"), 1).unwrap();
        assert_eq!(
            decision,
            Decision::Deny(Some(Alert::info("Showing an alert instead of navigating")))
        );
        assert!(gate.pending().is_none());
    }

    #[test]
    fn pending_confirm_proceeds_to_follow_up() {
        let mut gate = ActivationGate::default();
        gate.register(
            "confirm",
            Box::new(|ctx: &ActivationContext<'_>| {
                Activation::confirm_then(ConfirmationPrompt::default(), format!("{}/navigated", ctx.path))
            }),
        );
        let params = Params::new();
        let Decision::Pending(ticket, _) = gate.activate(Some("confirm"), &ctx(&params, "/a"), 4).unwrap()
        else {
            panic!("expected pending decision");
        };
        assert_eq!(gate.pending(), Some(ticket));

        let proceed = gate.resolve(ticket, Confirmation::Confirm).unwrap();
        assert_eq!(proceed.path, "/a/navigated");
        assert!(gate.pending().is_none());

        // Answering twice is stale.
        assert!(matches!(
            gate.resolve(ticket, Confirmation::Confirm),
            Err(NavError::StaleAsyncResult(4))
        ));
    }

    #[test]
    fn dismiss_cancels() {
        let mut gate = ActivationGate::default();
        gate.register(
            "confirm",
            Box::new(|_: &ActivationContext<'_>| Activation::confirm(ConfirmationPrompt::default())),
        );
        let params = Params::new();
        let Decision::Pending(ticket, _) = gate.activate(Some("confirm"), &ctx(&params, "/a"), 2).unwrap()
        else {
            panic!("expected pending decision");
        };
        assert!(matches!(
            gate.resolve(ticket, Confirmation::Dismiss),
            Err(NavError::ActivationCancelled(path)) if path == "/a"
        ));
    }

    #[test]
    fn newer_navigation_supersedes_pending() {
        let mut gate = ActivationGate::default();
        gate.register(
            "confirm",
            Box::new(|_: &ActivationContext<'_>| Activation::confirm(ConfirmationPrompt::default())),
        );
        let params = Params::new();
        let Decision::Pending(ticket, _) = gate.activate(Some("confirm"), &ctx(&params, "/a"), 2).unwrap()
        else {
            panic!("expected pending decision");
        };
        assert_eq!(gate.supersede(2), None);
        assert_eq!(gate.supersede(3), Some(ticket));
        assert!(matches!(
            gate.resolve(ticket, Confirmation::Confirm),
            Err(NavError::StaleAsyncResult(2))
        ));
    }
}
