//! Error types for the navigation engine.

use thiserror::Error;

use crate::surface::SurfaceKind;

/// Result type for navigation operations.
pub type Result<T> = std::result::Result<T, NavError>;

/// Errors that can occur while resolving, gating or hosting a navigation.
///
/// Every variant is recoverable: the shell and its other surfaces keep
/// running whatever is returned.
#[derive(Error, Debug)]
pub enum NavError {
    /// A node without a concrete view was reached and no default child leads to one.
    #[error("no resolvable leaf below {0}")]
    NoResolvableLeaf(String),

    /// An overlay surface was asked to host the root path.
    #[error("navigation with an absolute root path prevented for {0:?}")]
    AbsoluteRootInOverlay(SurfaceKind),

    /// A synchronous activation hook vetoed the navigation.
    #[error("activation of {0} denied")]
    ActivationDenied(String),

    /// The user dismissed an asynchronous activation confirmation.
    #[error("activation of {0} cancelled")]
    ActivationCancelled(String),

    /// A decision or load result arrived for a superseded navigation.
    #[error("stale async result #{0}")]
    StaleAsyncResult(u64),

    /// Path segments matched no node.
    #[error("path not found: {path} (matched up to {matched})")]
    PathNotFound { path: String, matched: String },

    /// A default-child chain loops back onto itself.
    #[error("cyclic default child chain at {0}")]
    CyclicDefaultChild(String),

    /// Node configuration violates a structural rule.
    #[error("invalid navigation config: {0}")]
    InvalidConfig(String),

    /// A node references a hook or provider that was never registered.
    #[error("unknown hook or provider: {0}")]
    UnknownHook(String),

    /// A message arrived from a frame the shell does not host.
    #[error("unknown frame #{0}")]
    UnknownFrame(u64),

    /// A message from an embedded application could not be decoded.
    #[error("malformed message: {0}")]
    Message(#[from] serde_json::Error),

    /// A path could not be parsed.
    #[error("invalid path {0}")]
    InvalidPath(String),
}

impl NavError {
    /// Whether the shell shows a notice to the user for this error.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            NavError::NoResolvableLeaf(_) | NavError::PathNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_results_are_silent() {
        assert!(!NavError::StaleAsyncResult(3).is_user_visible());
        assert!(!NavError::ActivationDenied("/a".into()).is_user_visible());
        assert!(NavError::NoResolvableLeaf("/projects/pr2/emptyViewUrl".into()).is_user_visible());
    }

    #[test]
    fn messages_name_the_path() {
        let err = NavError::PathNotFound {
            path: "/projects/pr1/settings_ft".into(),
            matched: "/projects/pr1".into(),
        };
        assert_eq!(
            err.to_string(),
            "path not found: /projects/pr1/settings_ft (matched up to /projects/pr1)"
        );
    }
}
