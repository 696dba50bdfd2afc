//! Terminal progress sinks.

use std::io::{ErrorKind, Write};

use autohangup_core::progress::{ProgressError, ProgressSink};
use autohangup_core::{format_remaining, Event};

/// Rewrites a single status line on stderr, like an ongoing notification.
pub struct StatusLine;

impl ProgressSink for StatusLine {
    fn publish(&self, remaining_ms: u64) -> Result<(), ProgressError> {
        let mut err = std::io::stderr().lock();
        write!(err, "\r\x1b[2KAuto Hangup: {}", format_remaining(remaining_ms))
            .and_then(|_| err.flush())
            .map_err(|e| ProgressError::Denied(e.to_string()))
    }

    fn clear(&self) {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r\x1b[2K").and_then(|_| err.flush());
    }
}

/// Emits one JSON `Event::Progress` per sample on stdout.
pub struct JsonLines;

impl ProgressSink for JsonLines {
    fn publish(&self, remaining_ms: u64) -> Result<(), ProgressError> {
        let line = serde_json::to_string(&Event::progress(remaining_ms))
            .map_err(|e| ProgressError::Denied(e.to_string()))?;
        write_line(&mut std::io::stdout().lock(), &line)
    }
}

/// A reader that hung up (`| head`) is `Closed`, anything else `Denied`.
fn write_line<W: Write>(out: &mut W, line: &str) -> Result<(), ProgressError> {
    writeln!(out, "{line}")
        .and_then(|_| out.flush())
        .map_err(|e| match e.kind() {
            ErrorKind::BrokenPipe => ProgressError::Closed,
            _ => ProgressError::Denied(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing(ErrorKind);

    impl Write for Failing {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(self.0.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_sample() {
        let mut out = Vec::new();
        write_line(&mut out, r#"{"type":"progress"}"#).unwrap();
        write_line(&mut out, r#"{"type":"progress"}"#).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }

    #[test]
    fn broken_pipe_is_closed() {
        assert_eq!(
            write_line(&mut Failing(ErrorKind::BrokenPipe), "{}"),
            Err(ProgressError::Closed)
        );
        assert!(matches!(
            write_line(&mut Failing(ErrorKind::Other), "{}"),
            Err(ProgressError::Denied(_))
        ));
    }
}
