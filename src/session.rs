//! The Control Session: owns the child tmux process, its piped stdin and
//! stdout, the reader worker, the request queue, and the public command
//! API.
//!
//! Architecturally this follows the same shape as a scripting engine's
//! child-process wrapper: one blocking reader thread draining stdout line
//! by line into a shared buffer/queue, a caller thread that only writes
//! and never blocks on a response, and a `Drop` impl that kills and reaps
//! the child. Unlike a gateway that writes control-mode commands into an
//! *existing* terminal's PTY, this session spawns (or attaches) its own
//! dedicated child process with its own pipes.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use winit::keyboard::{Key, ModifiersState};

use crate::dispatcher::{Dispatcher, UiEvent};
use crate::error::{Result, TmuxError};
use crate::keys::translate_keypress;
use crate::notification::NotificationDecoder;
use crate::request_queue::{PendingCallback, RequestQueue};
use crate::types::{PaneId, SessionConfig, SplitOrientation};

fn recover<T>(poisoned: std::sync::PoisonError<T>) -> T {
    log::warn!("tmux control session mutex poisoned, recovering");
    poisoned.into_inner()
}

/// A tmux control-mode session: `Unbound` until `new_session` or
/// `attach_session` spawns the child, `Bound` while it's alive.
pub struct ControlSession {
    config: SessionConfig,
    child: Option<Child>,
    stdin: Option<Arc<Mutex<ChildStdin>>>,
    queue: Arc<Mutex<RequestQueue>>,
    dispatcher: Dispatcher,
    reader_handle: Option<thread::JoinHandle<()>>,
    last_size: (u32, u32),
}

impl ControlSession {
    /// Create a new, unbound session. Returns the session plus the
    /// receiving half of the UI-event channel the embedder should drain
    /// on its own thread (see `crate::dispatcher`).
    pub fn new(config: SessionConfig) -> (Self, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel();
        let initial_size = config.initial_size;
        let session = Self {
            config,
            child: None,
            stdin: None,
            queue: Arc::new(Mutex::new(RequestQueue::new())),
            dispatcher: Dispatcher::new(tx),
            reader_handle: None,
            last_size: initial_size,
        };
        (session, rx)
    }

    pub fn is_bound(&self) -> bool {
        self.child.is_some()
    }

    pub fn last_size(&self) -> (u32, u32) {
        self.last_size
    }

    fn tmux_command(&self, args: &[String]) -> Command {
        if let Some(remote) = &self.config.remote {
            let mut cmd = Command::new("ssh");
            cmd.arg(remote)
                .arg("--")
                .arg(&self.config.tmux_binary)
                .arg("-2")
                .arg("-C")
                .args(args);
            cmd
        } else {
            let mut cmd = Command::new(&self.config.tmux_binary);
            cmd.arg("-2").arg("-C").args(args);
            cmd
        }
    }

    /// Spawn the child and wire up stdin/stderr, recording it as bound.
    /// Returns the child's stdout so the caller can push the request-queue
    /// slot for the startup envelope *before* handing it to
    /// [`ControlSession::start_reader`] — starting the reader any earlier
    /// would let a fast startup envelope be popped from an empty queue.
    fn spawn(&mut self, args: Vec<String>) -> Result<std::process::ChildStdout> {
        let mut command = self.tmux_command(&args);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TmuxError::ProtocolFraming("child process has no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TmuxError::ProtocolFraming("child process has no stdout".into()))?;
        let stderr = child.stderr.take();

        self.stdin = Some(Arc::new(Mutex::new(stdin)));
        self.child = Some(child);

        if let Some(stderr) = stderr {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                    log::warn!("tmux stderr: {line}");
                }
            });
        }

        Ok(stdout)
    }

    /// Start the blocking reader loop over `stdout`. Must only be called
    /// once the caller has already pushed the request-queue slot for
    /// whatever startup envelope the server is about to send (the attach
    /// no-op, or new-session's pane-id callback) — see `spawn`.
    fn start_reader(&mut self, stdout: std::process::ChildStdout) {
        let queue = Arc::clone(&self.queue);
        let dispatcher = self.dispatcher.clone();
        self.reader_handle = Some(thread::spawn(move || {
            let mut decoder = NotificationDecoder::new();
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => match decoder.feed_line(&line) {
                        Ok(Some(notification)) => {
                            let mut guard = queue.lock().unwrap_or_else(recover);
                            dispatcher.dispatch(notification, &mut guard);
                        }
                        Ok(None) => {}
                        Err(e) => log::warn!("failed to decode tmux notification line {line:?}: {e}"),
                    },
                    Err(e) => {
                        log::warn!("error reading tmux control stream: {e}");
                        break;
                    }
                }
            }
            dispatcher.notify_child_exit();
        }));
    }

    /// Write one command line to the child's stdin and push its callback
    /// (or a no-op) onto the request queue. Every code path that talks to
    /// an already-bound session funnels through here so the FIFO always
    /// stays aligned with the server's emission order.
    fn write_command(&mut self, command: &str, callback: Option<PendingCallback>) -> Result<()> {
        let Some(stdin) = self.stdin.clone() else {
            log::warn!("no tmux connection; dropping command: {command}");
            return Err(TmuxError::NoConnection);
        };
        {
            let mut stdin = stdin.lock().unwrap_or_else(recover);
            writeln!(stdin, "{command}")?;
            stdin.flush()?;
        }
        let mut queue = self.queue.lock().unwrap_or_else(recover);
        match callback {
            Some(cb) => queue.push(cb),
            None => queue.push_noop(),
        }
        Ok(())
    }

    /// Highest-level entry point: binds a new session if unbound, splits
    /// the given pane if `orientation` is set, otherwise opens a new
    /// window.
    pub fn run_command(
        &mut self,
        command: Option<&str>,
        marker: &str,
        cwd: Option<&str>,
        orientation: Option<SplitOrientation>,
        pane_id: Option<&PaneId>,
    ) -> Result<()> {
        if !self.is_bound() {
            return self.new_session(cwd, command, marker);
        }
        match orientation {
            Some(orientation) => {
                let pane_id = pane_id
                    .ok_or_else(|| TmuxError::ProtocolFraming("split requires a pane id".into()))?;
                self.split_window(orientation, pane_id, command, marker)
            }
            None => self.new_window(cwd, command, marker),
        }
    }

    pub fn split_window(
        &mut self,
        orientation: SplitOrientation,
        pane_id: &PaneId,
        command: Option<&str>,
        marker: &str,
    ) -> Result<()> {
        let flag = match orientation {
            SplitOrientation::Horizontal => "-h",
            SplitOrientation::Vertical => "-v",
        };
        let mut line = format!("split-window {flag} -t {pane_id} -P -F \"#D {marker}\"");
        if let Some(command) = command {
            line.push_str(&format!(" \"{command}\""));
        }
        let callback = self.dispatcher.pane_id_result_callback();
        self.write_command(&line, Some(callback))
    }

    pub fn new_window(&mut self, _cwd: Option<&str>, command: Option<&str>, marker: &str) -> Result<()> {
        let mut line = format!("new-window -P -F \"#D {marker}\"");
        if let Some(command) = command {
            line.push_str(&format!(" \"{command}\""));
        }
        let callback = self.dispatcher.pane_id_result_callback();
        self.write_command(&line, Some(callback))
    }

    /// Attach to an already-running session. Pushes a no-op to consume
    /// the server's unsolicited startup envelope, then requests the
    /// initial layout.
    pub fn attach_session(&mut self) -> Result<()> {
        let name = self.config.session_name.clone();
        let stdout = self.spawn(vec!["attach-session".to_string(), "-t".to_string(), name])?;
        self.queue.lock().unwrap_or_else(recover).push_noop();
        self.start_reader(stdout);
        self.initial_layout()
    }

    /// Kill any prior server, then spawn a brand new session. Clears the
    /// request queue (any callbacks queued against the now-dead prior
    /// session are discarded, not invoked) and pushes the pane-id
    /// callback for the initial pane's creation response.
    pub fn new_session(&mut self, cwd: Option<&str>, command: Option<&str>, marker: &str) -> Result<()> {
        self.kill_server();

        // OpenSSH re-joins a remote command's argv with spaces and hands it
        // to the remote shell, which re-splits on whitespace; without
        // quoting, `-F #D marker` arrives as two words and tmux treats
        // `marker` as the session's initial command. Single-quote the whole
        // format value for the remote case, matching the original client.
        let format_arg = if self.config.remote.is_some() {
            format!("'#D {marker}'")
        } else {
            format!("#D {marker}")
        };

        let mut args = vec![
            "new-session".to_string(),
            "-s".to_string(),
            self.config.session_name.clone(),
            "-P".to_string(),
            "-F".to_string(),
            format_arg,
        ];
        if self.config.remote.is_none()
            && let Some(cwd) = cwd
        {
            args.push("-c".to_string());
            args.push(cwd.to_string());
        }
        if let Some(command) = command {
            args.push(command.to_string());
        }

        // The queue slot for the startup envelope must exist before the
        // reader thread starts, or a fast startup envelope races the push
        // and is popped from an empty queue (see `spawn`/`start_reader`).
        let stdout = self.spawn(args)?;
        {
            let mut queue = self.queue.lock().unwrap_or_else(recover);
            queue.clear();
            queue.push(self.dispatcher.pane_id_result_callback());
        }
        self.start_reader(stdout);
        Ok(())
    }

    pub fn refresh_client(&mut self, width: u32, height: u32) -> Result<()> {
        self.last_size = (width, height);
        self.write_command(&format!("refresh-client -C {width},{height}"), None)
    }

    pub fn send_content(&mut self, content: &str, pane_id: &PaneId) -> Result<()> {
        let quote = if content.contains('\'') { '"' } else { '\'' };
        self.write_command(
            &format!("send-keys -t {pane_id} -l {quote}{content}{quote}"),
            None,
        )
    }

    /// Translate a key event and send the resulting bytes, if any. Events
    /// that translate to nothing (e.g. Alt+Ctrl combinations swallowed by
    /// the translator) are silently dropped, matching tmux's own
    /// behavior for unmapped keys.
    pub fn send_keypress(&mut self, key: &Key, modifiers: ModifiersState, pane_id: &PaneId) -> Result<()> {
        match translate_keypress(key, modifiers) {
            Some(content) => self.send_content(&content, pane_id),
            None => Ok(()),
        }
    }

    pub fn toggle_zoom(&mut self, pane_id: &PaneId) -> Result<()> {
        self.write_command(&format!("resize-pane -Z -t {pane_id}"), None)
    }

    pub fn initial_layout(&mut self) -> Result<()> {
        let name = self.config.session_name.clone();
        let callback = self.dispatcher.initial_layout_result_callback();
        self.write_command(
            &format!("list-windows -t {name} -F \"#{{window_layout}}\""),
            Some(callback),
        )
    }

    pub fn initial_output(&mut self, pane_id: &PaneId) -> Result<()> {
        let callback = self.dispatcher.initial_output_result_callback(pane_id.clone());
        self.write_command(
            &format!("capture-pane -J -p -t {pane_id} -eC -S - -E -"),
            Some(callback),
        )
    }

    pub fn garbage_collect_panes(&mut self) -> Result<()> {
        let name = self.config.session_name.clone();
        let callback = self.dispatcher.garbage_collect_panes_result_callback();
        self.write_command(&format!("list-panes -s -t {name} -F \"#D\""), Some(callback))
    }

    /// Synchronously kill the tmux server this session targets. Used to
    /// guarantee a clean slate before `new_session`; best-effort if no
    /// server is running.
    pub fn kill_server(&self) {
        let mut command = if let Some(remote) = &self.config.remote {
            let mut cmd = Command::new("ssh");
            cmd.arg(remote).arg("--").arg(&self.config.tmux_binary);
            cmd
        } else {
            Command::new(&self.config.tmux_binary)
        };
        command
            .arg("kill-server")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match command.status() {
            Ok(_) => {}
            Err(e) => log::debug!("tmux kill-server failed (no server running?): {e}"),
        }
    }
}

impl Drop for ControlSession {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_session_drops_commands() {
        let (mut session, _rx) = ControlSession::new(SessionConfig::new("test"));
        assert!(!session.is_bound());
        let err = session.refresh_client(80, 24).unwrap_err();
        assert!(matches!(err, TmuxError::NoConnection));
    }

    #[test]
    fn new_session_config_defaults() {
        let (session, _rx) = ControlSession::new(SessionConfig::new("dev"));
        assert_eq!(session.last_size(), (80, 24));
    }
}
