//! Decoding of the tmux control-mode notification stream.
//!
//! Every line the server writes begins with `%`. [`NotificationDecoder`]
//! classifies the marker and builds a [`Notification`]. The `%begin …
//! %end`/`%error` envelope spans multiple lines, so the decoder is
//! stateful: lines that arrive while an envelope is open are accumulated
//! verbatim until the terminator.
//!
//! Decoder-local failures (unknown marker, wrong token arity) are returned
//! as `Err` rather than panicking; per the crate's error-handling design
//! the caller logs and drops them instead of tearing down the session.

use crate::error::{Result, TmuxError};
use crate::layout::parse_layout;
use crate::types::Notification;

#[derive(Debug)]
enum State {
    Idle,
    InEnvelope {
        begin_timestamp: String,
        code: String,
        lines: Vec<String>,
    },
}

/// Stateful line-by-line decoder for the notification stream.
///
/// Feed it one line at a time (without the trailing newline) via
/// [`NotificationDecoder::feed_line`]. Most lines immediately yield a
/// `Notification`; lines inside a `%begin … %end`/`%error` envelope return
/// `Ok(None)` until the envelope closes.
#[derive(Debug, Default)]
pub struct NotificationDecoder {
    state: State,
}

impl Default for State {
    fn default() -> Self {
        State::Idle
    }
}

impl NotificationDecoder {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    pub fn feed_line(&mut self, line: &str) -> Result<Option<Notification>> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::InEnvelope {
                begin_timestamp,
                code,
                mut lines,
            } => {
                if let Some(rest) = line.strip_prefix("%end") {
                    return Ok(Some(finish_envelope(begin_timestamp, code, lines, rest, false)));
                }
                if let Some(rest) = line.strip_prefix("%error") {
                    return Ok(Some(finish_envelope(begin_timestamp, code, lines, rest, true)));
                }
                lines.push(line.to_string());
                self.state = State::InEnvelope {
                    begin_timestamp,
                    code,
                    lines,
                };
                Ok(None)
            }
            State::Idle => self.decode_marker_line(line),
        }
    }

    fn decode_marker_line(&mut self, line: &str) -> Result<Option<Notification>> {
        let body = line
            .strip_prefix('%')
            .ok_or_else(|| TmuxError::ProtocolFraming(format!("line missing '%' prefix: {line:?}")))?;
        let mut parts = body.splitn(2, ' ');
        let marker = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").to_string();

        match marker {
            "begin" => {
                let mut tokens = rest.split_whitespace();
                let begin_timestamp = tokens
                    .next()
                    .ok_or_else(|| TmuxError::ProtocolFraming("missing %begin timestamp".into()))?
                    .to_string();
                let code = tokens
                    .next()
                    .ok_or_else(|| TmuxError::ProtocolFraming("missing %begin code".into()))?
                    .to_string();
                self.state = State::InEnvelope {
                    begin_timestamp,
                    code,
                    lines: Vec::new(),
                };
                Ok(None)
            }
            "exit" => Ok(Some(Notification::Exit {
                reason: if rest.is_empty() { None } else { Some(rest) },
            })),
            "layout-change" => {
                let mut tokens = rest.split_whitespace();
                let window_id = tokens
                    .next()
                    .ok_or_else(|| TmuxError::ProtocolFraming("missing layout-change window_id".into()))?
                    .to_string();
                let window_layout_str = tokens.next().ok_or_else(|| {
                    TmuxError::ProtocolFraming("missing layout-change window_layout".into())
                })?;
                let window_layout = parse_layout(window_layout_str)?;
                let window_visible_layout = tokens.next().map(|s| s.to_string());
                let window_flags = tokens.next().map(|s| s.to_string());
                Ok(Some(Notification::LayoutChange {
                    window_id,
                    window_layout,
                    window_visible_layout,
                    window_flags,
                }))
            }
            "output" => {
                let mut tokens = rest.splitn(2, ' ');
                let pane_id = tokens
                    .next()
                    .ok_or_else(|| TmuxError::ProtocolFraming("missing %output pane_id".into()))?
                    .to_string();
                // Space-rejoin of the remaining tokens is intentional and lossy for
                // multi-space runs; see Open Question (a) in SPEC_FULL.md.
                let data = tokens.next().unwrap_or("").to_string();
                Ok(Some(Notification::Output { pane_id, data }))
            }
            "session-changed" => {
                let mut tokens = rest.splitn(2, ' ');
                let session_id = tokens
                    .next()
                    .ok_or_else(|| TmuxError::ProtocolFraming("missing session-changed id".into()))?
                    .to_string();
                let session_name = tokens.next().unwrap_or("").to_string();
                Ok(Some(Notification::SessionChanged {
                    session_id,
                    session_name,
                }))
            }
            "session-renamed" => {
                let mut tokens = rest.splitn(2, ' ');
                let session_id = tokens
                    .next()
                    .ok_or_else(|| TmuxError::ProtocolFraming("missing session-renamed id".into()))?
                    .to_string();
                let session_name = tokens.next().unwrap_or("").to_string();
                Ok(Some(Notification::SessionRenamed {
                    session_id,
                    session_name,
                }))
            }
            "sessions-changed" => Ok(Some(Notification::SessionsChanged)),
            "unlinked-window-add" => Ok(Some(Notification::UnlinkedWindowAdd { window_id: rest })),
            "window-add" => Ok(Some(Notification::WindowAdd { window_id: rest })),
            "window-close" => Ok(Some(Notification::WindowClose { window_id: rest })),
            "window-renamed" => {
                let mut tokens = rest.splitn(2, ' ');
                let window_id = tokens
                    .next()
                    .ok_or_else(|| TmuxError::ProtocolFraming("missing window-renamed id".into()))?
                    .to_string();
                let window_name = tokens.next().unwrap_or("").to_string();
                Ok(Some(Notification::WindowRenamed {
                    window_id,
                    window_name,
                }))
            }
            other => Err(TmuxError::ProtocolFraming(format!("unknown marker: %{other}"))),
        }
    }
}

fn finish_envelope(
    begin_timestamp: String,
    code: String,
    lines: Vec<String>,
    terminator_rest: &str,
    error: bool,
) -> Notification {
    let end_timestamp = terminator_rest
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string();
    Notification::Result {
        begin_timestamp,
        code,
        lines,
        end_timestamp,
        error,
    }
}

/// Decode tmux's `\ooo` (three-digit octal) byte escaping used in `%output`
/// payloads, plus `\\` for a literal backslash. Any other escape sequence
/// is passed through with the backslash preserved rather than erroring —
/// output decoding must never abort a session over a stray byte.
pub fn decode_octal_escapes(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'\\' {
                out.push(b'\\');
                i += 2;
                continue;
            }
            if i + 3 < bytes.len()
                && bytes[i + 1].is_ascii_digit()
                && bytes[i + 2].is_ascii_digit()
                && bytes[i + 3].is_ascii_digit()
            {
                let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
                out.push(value);
                i += 4;
                continue;
            }
            out.push(b'\\');
            i += 1;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}
