//! Navigation and view-composition engine for micro-frontend shells.
//!
//! A [`Shell`] resolves URL paths against a tree of navigation nodes, gates
//! navigations through per-node activation hooks, hosts the resolved view
//! in the primary surface or in a modal, drawer or split-view overlay, and
//! keeps history and the navigation chrome consistent with the result.
//!
//! The engine performs no IO. Hosts feed it URLs, clicks and frame messages
//! and carry out the [`ShellEffect`]s it queues.

pub mod activation;
pub mod chrome;
pub mod effects;
pub mod error;
pub mod history;
pub mod messaging;
pub mod route;
pub mod shell;
pub mod surface;
pub mod toggles;
pub mod tree;

pub use activation::{
    Activation, ActivationContext, ActivationHook, ActivationTicket, Alert, AlertKind, Confirmation,
    ConfirmationPrompt, NavigationSource,
};
pub use chrome::{ChromeState, NavItem, SideNav, TabNav};
pub use effects::ShellEffect;
pub use error::{NavError, Result};
pub use history::HistoryEntry;
pub use messaging::{FrameMessage, NavigationRequest, ShellMessage};
pub use route::{Location, ResolvedRoute};
pub use shell::{Navigated, Navigator, Shell};
pub use surface::{FrameId, OverlayOptions, SurfaceHandle, SurfaceKind, SurfaceState};
pub use toggles::FeatureToggles;
pub use tree::{ChildrenProvider, NodeId, NodeTree, Params};

pub use portico_config as config;
