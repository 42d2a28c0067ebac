// src/backends/console.rs

//! The text fallback: writes each frame to stdout and/or stderr.
//!
//! Detection always succeeds so selection can never end empty. Output is
//! only produced for the streams enabled in the config.

use super::{Backend, BackendKind, Frame, NativeEvent, WaitOutcome};
use crate::config::Config;
use crate::os::epoll::EventMonitor;
use anyhow::{Context, Result};
use log::{debug, info, trace};
use std::io::{self, Write};
use std::time::Duration;

pub struct ConsoleBackend {
    monitor: Option<EventMonitor>,
    to_stdout: bool,
    to_stderr: bool,
}

impl ConsoleBackend {
    pub fn new() -> Self {
        Self {
            monitor: None,
            to_stdout: false,
            to_stderr: false,
        }
    }

    fn flush(&self) -> Result<()> {
        if self.to_stdout {
            io::stdout().flush().context("ConsoleBackend: Failed to flush stdout")?;
        }
        if self.to_stderr {
            io::stderr().flush().context("ConsoleBackend: Failed to flush stderr")?;
        }
        Ok(())
    }
}

impl Default for ConsoleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ConsoleBackend {
    fn name(&self) -> &str {
        "console"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Console
    }

    fn detect(&self, _config: &Config) -> bool {
        true
    }

    fn initialize(&mut self, config: &Config) -> Result<()> {
        self.to_stdout = config.output.out_to_console;
        self.to_stderr = config.output.out_to_stderr;
        // No descriptors are registered: the monitor only gives us an
        // interruptible bounded sleep when this is the lead backend.
        self.monitor = Some(EventMonitor::new().context("ConsoleBackend: Failed to create event monitor")?);
        info!(
            "ConsoleBackend initialized (stdout: {}, stderr: {})",
            self.to_stdout, self.to_stderr
        );
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        let flushed = self.flush();
        self.monitor = None;
        debug!("ConsoleBackend shut down");
        flushed
    }

    fn main_loop_wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        let monitor = match self.monitor.as_mut() {
            Some(monitor) => monitor,
            None => return Ok(WaitOutcome::TimedOut),
        };
        if timeout.is_zero() {
            return Ok(WaitOutcome::TimedOut);
        }
        Ok(monitor.wait(timeout)?.into())
    }

    fn drain_events(&mut self) -> Result<Vec<NativeEvent>> {
        Ok(Vec::new())
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        if !self.to_stdout && !self.to_stderr {
            return Ok(());
        }
        let text = frame.content.to_text();
        trace!("ConsoleBackend: writing {} bytes", text.len());
        if self.to_stdout {
            io::stdout()
                .write_all(text.as_bytes())
                .context("ConsoleBackend: Failed to write to stdout")?;
        }
        if self.to_stderr {
            io::stderr()
                .write_all(text.as_bytes())
                .context("ConsoleBackend: Failed to write to stderr")?;
        }
        self.flush()
    }

    fn cleanup(&mut self) {
        if let Err(e) = self.flush() {
            debug!("ConsoleBackend: flush during cleanup failed: {:#}", e);
        }
    }

    fn sigterm_cleanup(&mut self) {
        self.cleanup();
    }
}
