//! Notification Dispatcher: turns decoded notifications into either a
//! popped request-queue callback (`%begin` envelopes) or a posted
//! [`UiEvent`] the embedder drains on its own thread.
//!
//! The core never touches widget state itself — it only ever posts to this
//! channel. The embedder (GTK idle callback, winit redraw-requested, a
//! per-frame poll, whatever its own event loop looks like) is responsible
//! for draining it and applying the resulting mutations.

use std::sync::mpsc;

use crate::layout::parse_layout;
use crate::notification::decode_octal_escapes;
use crate::request_queue::{PendingCallback, RequestQueue};
use crate::types::{LayoutTree, Notification, PaneId};

/// Events posted to the embedder. Everything that mutates the pane-id ↔
/// terminal map or the widget tree arrives this way rather than through a
/// direct call from the reader thread.
#[derive(Debug)]
pub enum UiEvent {
    /// Decoded, still-undecoded-from-octal-escapes output bytes for a pane.
    Output { pane_id: PaneId, bytes: Vec<u8> },
    /// A `layout-change` or `window-close` notification arrived; the
    /// embedder should call `garbage_collect_panes()` to reconcile.
    GarbageCollectPanes,
    /// Response to `split_window`/`new_window`: the new pane id paired
    /// with the marker the caller supplied when issuing the command.
    PaneCreated { pane_id: PaneId, marker: String },
    /// Response to `garbage_collect_panes`: the full set of pane ids tmux
    /// currently knows about. The embedder should close any terminal
    /// whose pane id is not in this set.
    PanesAlive { pane_ids: Vec<PaneId> },
    /// Response to `initial_layout`: one parsed tree per window.
    InitialLayout { windows: Vec<LayoutTree> },
    /// A notification with no dedicated reaction above (`session-changed`,
    /// `session-renamed`, `sessions-changed`, `window-add`,
    /// `unlinked-window-add`, `window-renamed`, `exit`), passed through
    /// unchanged so the embedder can still observe it.
    Notification(Notification),
    /// The child tmux process exited; the session is now unbound.
    SessionEnded,
}

/// Routes decoded notifications to request-queue callbacks or to the
/// [`UiEvent`] channel. Cheap to clone — it only wraps a channel sender —
/// so the reader thread can own its own copy.
#[derive(Clone)]
pub struct Dispatcher {
    sender: mpsc::Sender<UiEvent>,
}

impl Dispatcher {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    /// Handle one decoded notification. `%begin` envelopes pop and invoke
    /// the next queued callback (even on `%error` — the slot must still be
    /// drained); everything else is posted to the UI channel.
    pub fn dispatch(&self, notification: Notification, queue: &mut RequestQueue) {
        match notification {
            Notification::Result { lines, error, .. } => match queue.pop() {
                Some(callback) => {
                    if error {
                        log::warn!("tmux command failed: {lines:?}");
                    }
                    callback(&lines);
                }
                None => {
                    log::error!(
                        "received a tmux command response with no pending callback; request queue is desynced"
                    );
                }
            },
            Notification::Output { pane_id, data } => {
                let bytes = decode_octal_escapes(&data);
                let _ = self.sender.send(UiEvent::Output { pane_id, bytes });
            }
            Notification::LayoutChange { .. } | Notification::WindowClose { .. } => {
                let _ = self.sender.send(UiEvent::GarbageCollectPanes);
            }
            other => {
                let _ = self.sender.send(UiEvent::Notification(other));
            }
        }
    }

    /// Called by the reader loop once the child's stdout hits EOF.
    pub fn notify_child_exit(&self) {
        let _ = self.sender.send(UiEvent::SessionEnded);
    }

    /// Callback for `split-window`/`new-window`: the single response line
    /// is `<pane_id> <marker>`.
    pub fn pane_id_result_callback(&self) -> PendingCallback {
        let sender = self.sender.clone();
        Box::new(move |lines: &[String]| {
            let Some(line) = lines.first() else {
                log::warn!("pane_id_result callback invoked with no response lines");
                return;
            };
            let mut parts = line.splitn(2, ' ');
            match (parts.next(), parts.next()) {
                (Some(pane_id), Some(marker)) => {
                    let _ = sender.send(UiEvent::PaneCreated {
                        pane_id: pane_id.to_string(),
                        marker: marker.to_string(),
                    });
                }
                _ => log::warn!("malformed pane_id_result line: {line:?}"),
            }
        })
    }

    /// Callback for `list-panes -F "#D"`: one pane id per line.
    pub fn garbage_collect_panes_result_callback(&self) -> PendingCallback {
        let sender = self.sender.clone();
        Box::new(move |lines: &[String]| {
            let pane_ids = lines.iter().filter(|l| !l.is_empty()).cloned().collect();
            let _ = sender.send(UiEvent::PanesAlive { pane_ids });
        })
    }

    /// Callback for `list-windows -F "#{window_layout}"`: one layout
    /// string per line. Lines that fail to parse are logged and skipped
    /// rather than failing the whole batch.
    pub fn initial_layout_result_callback(&self) -> PendingCallback {
        let sender = self.sender.clone();
        Box::new(move |lines: &[String]| {
            let windows = lines
                .iter()
                .filter_map(|line| match parse_layout(line) {
                    Ok(tree) => Some(tree),
                    Err(e) => {
                        log::warn!("failed to parse window layout {line:?}: {e}");
                        None
                    }
                })
                .collect();
            let _ = sender.send(UiEvent::InitialLayout { windows });
        })
    }

    /// Callback for `capture-pane`: the response lines are the pane's
    /// scrollback rows, joined back with newlines. This is raw text from
    /// the envelope body, not an `%output` notification, so no octal
    /// unescape is applied.
    pub fn initial_output_result_callback(&self, pane_id: PaneId) -> PendingCallback {
        let sender = self.sender.clone();
        Box::new(move |lines: &[String]| {
            let text = lines.join("\n");
            let _ = sender.send(UiEvent::Output {
                pane_id: pane_id.clone(),
                bytes: text.into_bytes(),
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> (Dispatcher, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel();
        (Dispatcher::new(tx), rx)
    }

    #[test]
    fn begin_result_pops_and_invokes_callback() {
        let (dispatcher, _rx) = dispatcher();
        let mut queue = RequestQueue::new();
        let invoked = std::sync::Arc::new(std::sync::Mutex::new(None));
        let invoked2 = std::sync::Arc::clone(&invoked);
        queue.push(Box::new(move |lines: &[String]| {
            *invoked2.lock().unwrap() = Some(lines.to_vec());
        }));

        dispatcher.dispatch(
            Notification::Result {
                begin_timestamp: "1".into(),
                code: "0".into(),
                lines: vec!["ok".into()],
                end_timestamp: "2".into(),
                error: false,
            },
            &mut queue,
        );

        assert_eq!(*invoked.lock().unwrap(), Some(vec!["ok".to_string()]));
        assert!(queue.is_empty());
    }

    #[test]
    fn error_result_still_pops_callback() {
        let (dispatcher, _rx) = dispatcher();
        let mut queue = RequestQueue::new();
        let invoked = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let invoked2 = std::sync::Arc::clone(&invoked);
        queue.push(Box::new(move |_| {
            invoked2.store(true, std::sync::atomic::Ordering::SeqCst);
        }));

        dispatcher.dispatch(
            Notification::Result {
                begin_timestamp: "1".into(),
                code: "0".into(),
                lines: vec!["boom".into()],
                end_timestamp: "2".into(),
                error: true,
            },
            &mut queue,
        );

        assert!(invoked.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn output_notification_posts_decoded_bytes() {
        let (dispatcher, rx) = dispatcher();
        let mut queue = RequestQueue::new();
        dispatcher.dispatch(
            Notification::Output {
                pane_id: "%1".into(),
                data: r"hi\040there".into(),
            },
            &mut queue,
        );
        match rx.recv().unwrap() {
            UiEvent::Output { pane_id, bytes } => {
                assert_eq!(pane_id, "%1");
                assert_eq!(bytes, b"hi there");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn layout_change_schedules_gc() {
        let (dispatcher, rx) = dispatcher();
        let mut queue = RequestQueue::new();
        let tree = parse_layout("abcd,80x24,0,0,1").unwrap();
        dispatcher.dispatch(
            Notification::LayoutChange {
                window_id: "@1".into(),
                window_layout: tree,
                window_visible_layout: None,
                window_flags: None,
            },
            &mut queue,
        );
        assert!(matches!(rx.recv().unwrap(), UiEvent::GarbageCollectPanes));
    }

    #[test]
    fn pane_id_result_callback_parses_line() {
        let (dispatcher, rx) = dispatcher();
        let cb = dispatcher.pane_id_result_callback();
        cb(&["%3 my-marker".to_string()]);
        match rx.recv().unwrap() {
            UiEvent::PaneCreated { pane_id, marker } => {
                assert_eq!(pane_id, "%3");
                assert_eq!(marker, "my-marker");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn garbage_collect_callback_collects_pane_ids() {
        let (dispatcher, rx) = dispatcher();
        let cb = dispatcher.garbage_collect_panes_result_callback();
        cb(&["%1".to_string(), "%2".to_string()]);
        match rx.recv().unwrap() {
            UiEvent::PanesAlive { pane_ids } => {
                assert_eq!(pane_ids, vec!["%1".to_string(), "%2".to_string()]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn child_exit_posts_session_ended() {
        let (dispatcher, rx) = dispatcher();
        dispatcher.notify_child_exit();
        assert!(matches!(rx.recv().unwrap(), UiEvent::SessionEnded));
    }
}
