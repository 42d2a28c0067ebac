// src/backends/file.rs

//! Writes every frame to files: one rewritten in place, one appended to.

use super::{Backend, BackendKind, Frame, NativeEvent, WaitOutcome};
use crate::config::Config;
use crate::os::epoll::EventMonitor;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Default)]
pub struct FileBackend {
    overwrite_path: Option<PathBuf>,
    append: Option<File>,
    monitor: Option<EventMonitor>,
}

impl FileBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_overwrite(&self, text: &str) -> Result<()> {
        let Some(path) = &self.overwrite_path else {
            return Ok(());
        };
        let mut file = File::create(path)
            .with_context(|| format!("FileBackend: Failed to truncate {}", path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("FileBackend: Failed to write {}", path.display()))?;
        Ok(())
    }

    fn write_append(&mut self, text: &str) -> Result<()> {
        let Some(file) = self.append.as_mut() else {
            return Ok(());
        };
        file.seek(SeekFrom::End(0))
            .context("FileBackend: Failed to seek append file")?;
        file.write_all(text.as_bytes())
            .context("FileBackend: Failed to append frame")?;
        Ok(())
    }

    fn flush(&mut self) {
        if let Some(file) = self.append.as_mut() {
            if let Err(e) = file.flush() {
                debug!("FileBackend: flush failed: {}", e);
            }
        }
    }
}

impl Backend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn detect(&self, config: &Config) -> bool {
        config.output.overwrite_file.is_some() || config.output.append_file.is_some()
    }

    fn initialize(&mut self, config: &Config) -> Result<()> {
        self.overwrite_path = config.output.overwrite_file.clone();
        if let Some(path) = &config.output.append_file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("FileBackend: Failed to open {} for appending", path.display()))?;
            self.append = Some(file);
        }
        self.monitor = Some(EventMonitor::new().context("FileBackend: Failed to create event monitor")?);
        info!(
            "FileBackend initialized (overwrite: {:?}, append: {:?})",
            self.overwrite_path, config.output.append_file
        );
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.flush();
        self.append = None;
        self.overwrite_path = None;
        self.monitor = None;
        Ok(())
    }

    fn main_loop_wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        // Files have no event source; the empty monitor is a signal-aware sleep.
        match self.monitor.as_mut() {
            Some(monitor) if !timeout.is_zero() => Ok(monitor.wait(timeout)?.into()),
            _ => Ok(WaitOutcome::TimedOut),
        }
    }

    fn drain_events(&mut self) -> Result<Vec<NativeEvent>> {
        Ok(Vec::new())
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        let text = frame.content.to_text();
        self.write_overwrite(&text)?;
        self.write_append(&text)
    }

    fn cleanup(&mut self) {
        self.flush();
    }

    fn sigterm_cleanup(&mut self) {
        self.flush();
    }
}
