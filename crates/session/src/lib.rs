//! Page state and UI handlers for the flood map.
//!
//! Every handler is a method on [`AppState`] that mutates state and returns
//! the [`Effect`]s the host must perform, in order. Nothing here touches the
//! DOM, so the whole interaction model is testable natively.

pub mod charts;
pub mod config;
pub mod effect;
pub mod modal;
pub mod panel;
pub mod scroll;
pub mod search;
pub mod state;

pub use config::*;
pub use effect::*;
pub use modal::ModalId;
pub use panel::{DropPlacement, Sidebar};
pub use state::AppState;
