#![allow(dead_code)]

use anyhow::Result;
use portico_nav::config::ShellConfig;
use portico_nav::{Activation, ActivationContext, ConfirmationPrompt, FrameId, Shell, ShellEffect};

pub const DENIED_ALERT: &str = "Showing an alert instead of navigating";

pub fn config() -> Result<ShellConfig> {
    Ok(serde_json::from_str(include_str!("../fixtures/shell.json"))?)
}

/// A shell over the fixture with its hooks registered, loaded at `/`.
pub fn shell() -> Result<Shell> {
    shell_with(config()?)
}

pub fn shell_with(config: ShellConfig) -> Result<Shell> {
    let mut shell = Shell::new(config)?;
    shell.register_activation_hook("denyNavigation", |_ctx: &ActivationContext<'_>| {
        Activation::deny_with_alert(DENIED_ALERT)
    });
    shell.register_activation_hook("confirmNavigation", |_ctx: &ActivationContext<'_>| {
        Activation::confirm(ConfirmationPrompt::default())
    });
    shell.load("/")?;
    shell.drain_effects();
    Ok(shell)
}

pub fn path(shell: &Shell) -> String {
    shell
        .route()
        .map(|route| route.path.clone())
        .unwrap_or_default()
}

pub fn primary(shell: &Shell) -> FrameId {
    shell.primary_frame().map(|frame| frame.id).expect("primary frame mounted")
}

pub fn frame(raw: u64) -> FrameId {
    serde_json::from_value(serde_json::json!(raw)).expect("frame ids are plain numbers")
}

pub fn side_labels(shell: &Shell) -> Vec<String> {
    shell
        .chrome()
        .side_nav
        .as_ref()
        .map(|side| side.items().map(|item| item.label.clone()).collect())
        .unwrap_or_default()
}

pub fn console_warnings(effects: &[ShellEffect]) -> Vec<&str> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            ShellEffect::ConsoleWarning { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
