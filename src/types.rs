//! Shared data types: layout trees, notifications, and session configuration.

use std::fmt;

/// A tmux pane id, e.g. `%3`. Kept as the raw token tmux prints rather than
/// stripping the sigil, since callers (and `send-keys -t`) pass it straight
/// back to tmux verbatim.
pub type PaneId = String;

/// A tmux window id, e.g. `@1`.
pub type WindowId = String;

/// A tmux session id, e.g. `$0`.
pub type SessionId = String;

/// A parsed tmux layout tree (see `parse_layout` in [`crate::layout`]).
///
/// tmux's own bracket convention is preserved here: `{…}` is a horizontal
/// split (panes side by side), `[…]` is a vertical split (panes stacked).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutTree {
    /// A single pane occupying a rectangle.
    Pane {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        pane_id: PaneId,
    },
    /// `{…}` — panes arranged side by side.
    HorizontalSplit {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        children: Vec<LayoutTree>,
    },
    /// `[…]` — panes stacked top to bottom.
    VerticalSplit {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        children: Vec<LayoutTree>,
    },
}

impl LayoutTree {
    /// Outer geometry of this node.
    pub fn geometry(&self) -> (u32, u32, u32, u32) {
        match self {
            LayoutTree::Pane {
                width,
                height,
                x,
                y,
                ..
            }
            | LayoutTree::HorizontalSplit {
                width,
                height,
                x,
                y,
                ..
            }
            | LayoutTree::VerticalSplit {
                width,
                height,
                x,
                y,
                ..
            } => (*width, *height, *x, *y),
        }
    }

    /// Collect every pane id in this subtree, depth-first, left to right.
    pub fn pane_ids(&self) -> Vec<PaneId> {
        let mut out = Vec::new();
        self.collect_pane_ids(&mut out);
        out
    }

    fn collect_pane_ids(&self, out: &mut Vec<PaneId>) {
        match self {
            LayoutTree::Pane { pane_id, .. } => out.push(pane_id.clone()),
            LayoutTree::HorizontalSplit { children, .. }
            | LayoutTree::VerticalSplit { children, .. } => {
                for child in children {
                    child.collect_pane_ids(out);
                }
            }
        }
    }
}

/// The full set of notifications the control-mode protocol emits that this
/// client understands. Unknown markers are logged and dropped by the
/// decoder rather than represented here (see `Notification::decode`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The `%begin … %end` / `%begin … %error` envelope framing a command's
    /// response.
    Result {
        begin_timestamp: String,
        code: String,
        lines: Vec<String>,
        end_timestamp: String,
        error: bool,
    },
    /// `%exit [reason]`
    Exit { reason: Option<String> },
    /// `%layout-change`. tmux supplies four fields; only `window_id` and the
    /// parsed layout are consumed by the projector today, but
    /// `window_visible_layout` and `window_flags` are retained so a future
    /// consumer does not require a decoder change (see Open Question c in
    /// SPEC_FULL.md).
    LayoutChange {
        window_id: WindowId,
        window_layout: LayoutTree,
        window_visible_layout: Option<String>,
        window_flags: Option<String>,
    },
    /// `%output %pane_id data…` — data is the space-rejoined remainder of
    /// the line, still octal-escaped (see [`crate::notification::decode_octal_escapes`]).
    Output { pane_id: PaneId, data: String },
    /// `%session-changed $id name`
    SessionChanged {
        session_id: SessionId,
        session_name: String,
    },
    /// `%session-renamed $id name`
    SessionRenamed {
        session_id: SessionId,
        session_name: String,
    },
    /// `%sessions-changed`
    SessionsChanged,
    /// `%unlinked-window-add @id`
    UnlinkedWindowAdd { window_id: WindowId },
    /// `%window-add @id`
    WindowAdd { window_id: WindowId },
    /// `%window-close @id`
    WindowClose { window_id: WindowId },
    /// `%window-renamed @id name`
    WindowRenamed {
        window_id: WindowId,
        window_name: String,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Result { error, .. } if *error => write!(f, "%error"),
            Notification::Result { .. } => write!(f, "%begin"),
            Notification::Exit { .. } => write!(f, "%exit"),
            Notification::LayoutChange { .. } => write!(f, "%layout-change"),
            Notification::Output { .. } => write!(f, "%output"),
            Notification::SessionChanged { .. } => write!(f, "%session-changed"),
            Notification::SessionRenamed { .. } => write!(f, "%session-renamed"),
            Notification::SessionsChanged => write!(f, "%sessions-changed"),
            Notification::UnlinkedWindowAdd { .. } => write!(f, "%unlinked-window-add"),
            Notification::WindowAdd { .. } => write!(f, "%window-add"),
            Notification::WindowClose { .. } => write!(f, "%window-close"),
            Notification::WindowRenamed { .. } => write!(f, "%window-renamed"),
        }
    }
}

/// Orientation of a pane split, as requested by the caller of
/// [`crate::session::ControlSession::run_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOrientation {
    Horizontal,
    Vertical,
}

/// Knobs a front end supplies when opening a [`crate::session::ControlSession`].
///
/// This is not a file-backed configuration layer — no TOML/YAML parsing is
/// in scope here — it is the single seam through which the embedder's own
/// config system feeds the handful of things the client needs to know.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path or name of the tmux binary to invoke. Overridable so tests can
    /// point at a fake stand-in script.
    pub tmux_binary: String,
    /// The tmux session name to create or attach to.
    pub session_name: String,
    /// Optional `ssh` target to tunnel the tmux invocation through.
    pub remote: Option<String>,
    /// Initial client viewport size, in columns/rows.
    pub initial_size: (u32, u32),
}

impl SessionConfig {
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            tmux_binary: "tmux".to_string(),
            session_name: session_name.into(),
            remote: None,
            initial_size: (80, 24),
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn with_tmux_binary(mut self, binary: impl Into<String>) -> Self {
        self.tmux_binary = binary.into();
        self
    }

    pub fn with_initial_size(mut self, width: u32, height: u32) -> Self {
        self.initial_size = (width, height);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pane_ids_nested() {
        let tree = LayoutTree::HorizontalSplit {
            width: 80,
            height: 24,
            x: 0,
            y: 0,
            children: vec![
                LayoutTree::Pane {
                    width: 40,
                    height: 24,
                    x: 0,
                    y: 0,
                    pane_id: "1".to_string(),
                },
                LayoutTree::VerticalSplit {
                    width: 40,
                    height: 24,
                    x: 40,
                    y: 0,
                    children: vec![
                        LayoutTree::Pane {
                            width: 40,
                            height: 12,
                            x: 40,
                            y: 0,
                            pane_id: "2".to_string(),
                        },
                        LayoutTree::Pane {
                            width: 40,
                            height: 12,
                            x: 40,
                            y: 12,
                            pane_id: "3".to_string(),
                        },
                    ],
                },
            ],
        };
        assert_eq!(tree.pane_ids(), vec!["1", "2", "3"]);
    }

    #[test]
    fn session_config_builder() {
        let cfg = SessionConfig::new("dev")
            .with_remote("host")
            .with_initial_size(100, 40);
        assert_eq!(cfg.session_name, "dev");
        assert_eq!(cfg.remote.as_deref(), Some("host"));
        assert_eq!(cfg.initial_size, (100, 40));
    }
}
