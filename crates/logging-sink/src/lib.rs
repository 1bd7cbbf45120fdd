//! Message sink abstraction, plus the console sink used during
//! daemonization fd-handoff.
//!
//! The takeover message and the fd `dup2`s during daemonization must be
//! observed atomically by readers — both go
//! through the same mutex in [`ConsoleSink`]. Everywhere else, `Sink` is
//! just "somewhere a formatted line goes" so pipes don't need to know
//! whether they're writing to a terminal, `/dev/null`, or a test buffer.

use std::sync::Mutex;

/// Something a pipe can hand a formatted line to.
pub trait Sink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Discards everything written to it.
#[derive(Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn write_line(&self, _line: &str) {}
}

/// Collects lines in memory; used by tests that assert on sink output.
#[derive(Debug, Default)]
pub struct VecSink {
    lines: Mutex<Vec<String>>,
}

impl VecSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Sink for VecSink {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_owned());
    }
}

/// Writes to the process's stdout, serialized by a mutex so an in-flight
/// daemonization fd-handoff (see [`ConsoleSink::takeover`]) can't interleave
/// with a concurrent line write.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    lock: Mutex<()>,
}

impl ConsoleSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Performs the console takeover sequence under the sink's mutex: logs
    /// the takeover message, then (unix only) `dup2`s `new_fd` onto
    /// `target_fd`. Both steps happen while holding the lock so a
    /// concurrent [`Sink::write_line`] caller never observes the message
    /// without the fd swap, or vice versa.
    #[cfg(unix)]
    pub fn takeover(&self, new_fd: std::os::fd::RawFd, target_fd: std::os::fd::RawFd) -> std::io::Result<()> {
        use std::os::fd::RawFd;

        let _guard = self.lock.lock().unwrap();
        self.write_line_locked("console handed off for daemonization");
        let result: RawFd = unsafe { libc::dup2(new_fd, target_fd) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    fn write_line_locked(&self, line: &str) {
        println!("{line}");
    }
}

impl Sink for ConsoleSink {
    fn write_line(&self, line: &str) {
        let _guard = self.lock.lock().unwrap();
        self.write_line_locked(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_records_lines_in_order() {
        let sink = VecSink::new();
        sink.write_line("first");
        sink.write_line("second");
        assert_eq!(sink.lines(), vec!["first", "second"]);
    }

    #[test]
    fn null_sink_discards_everything() {
        let sink = NullSink;
        sink.write_line("ignored");
    }
}
