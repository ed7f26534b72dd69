//! A client for the tmux control-mode protocol.
//!
//! Spawns (or attaches to) a `tmux -C` server, writes commands to its
//! stdin, and decodes its notification stream on stdout. Correlates each
//! command with its response via a FIFO request queue, parses tmux's
//! layout strings into a tree, and posts everything else — pane output,
//! layout changes, session/window lifecycle events — to a channel the
//! embedding front end drains on its own thread.
//!
//! Rendering, window/tab management UI, and general tmux feature coverage
//! beyond the notifications in [`types::Notification`] are out of scope;
//! this crate only drives the protocol.
//!
//! See [`session::ControlSession`] for the main entry point.

pub mod dispatcher;
pub mod error;
pub mod keys;
pub mod layout;
pub mod notification;
pub mod request_queue;
pub mod session;
pub mod types;

pub use dispatcher::{Dispatcher, UiEvent};
pub use error::{Result, TmuxError};
pub use keys::translate_keypress;
pub use layout::{parse_layout, project_layouts, WidgetDescription, WidgetKind};
pub use notification::{decode_octal_escapes, NotificationDecoder};
pub use request_queue::{PendingCallback, RequestQueue};
pub use session::ControlSession;
pub use types::{LayoutTree, Notification, PaneId, SessionConfig, SessionId, SplitOrientation, WindowId};
