// src/content.rs

//! Producers of the text the display shows.
//!
//! The pipeline does not know what the lines mean. It asks a `ContentSource`
//! for fresh lines once per refresh tick and hands them to every active
//! backend.

use anyhow::{Context, Result};
use log::trace;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One refresh worth of display text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedContent {
    pub lines: Vec<String>,
}

impl RenderedContent {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Width of the widest line, in characters.
    pub fn columns(&self) -> usize {
        self.lines
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
    }

    pub fn rows(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    /// All lines joined with newlines, with a trailing newline.
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

pub trait ContentSource {
    /// Recomputes the displayed values.
    fn refresh(&mut self) -> Result<RenderedContent>;
}

/// Load average, uptime and memory figures read from a procfs mount.
#[derive(Debug)]
pub struct ProcStatusSource {
    root: PathBuf,
}

impl Default for ProcStatusSource {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcStatusSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn uptime_line(&self) -> Result<String> {
        let text = self.read("uptime")?;
        let secs: f64 = text
            .split_whitespace()
            .next()
            .context("Empty uptime file")?
            .parse()
            .context("Malformed uptime value")?;
        let secs = secs as u64;
        let (days, rem) = (secs / 86_400, secs % 86_400);
        let (hours, rem) = (rem / 3_600, rem % 3_600);
        let minutes = rem / 60;
        Ok(if days > 0 {
            format!("Uptime: {}d {}h {:02}m", days, hours, minutes)
        } else {
            format!("Uptime: {}h {:02}m", hours, minutes)
        })
    }

    fn load_line(&self) -> Result<String> {
        let text = self.read("loadavg")?;
        let fields: Vec<&str> = text.split_whitespace().take(4).collect();
        if fields.len() < 4 {
            anyhow::bail!("Malformed loadavg: {:?}", text.trim());
        }
        Ok(format!(
            "Load: {} {} {}  Procs: {}",
            fields[0], fields[1], fields[2], fields[3]
        ))
    }

    fn memory_line(&self) -> Result<String> {
        let text = self.read("meminfo")?;
        let field = |name: &str| -> Option<u64> {
            text.lines()
                .find(|l| l.starts_with(name))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|v| v.parse().ok())
        };
        let total = field("MemTotal:").context("meminfo has no MemTotal")?;
        let available = field("MemAvailable:").context("meminfo has no MemAvailable")?;
        let used = total.saturating_sub(available);
        let percent = if total > 0 { used * 100 / total } else { 0 };
        Ok(format!(
            "RAM: {} / {} MiB ({}%)",
            used / 1024,
            total / 1024,
            percent
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentSource for ProcStatusSource {
    fn refresh(&mut self) -> Result<RenderedContent> {
        let lines = vec![self.uptime_line()?, self.load_line()?, self.memory_line()?];
        trace!("ProcStatusSource: refreshed {} lines", lines.len());
        Ok(RenderedContent::new(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_proc() -> Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("uptime"), "93784.52 180000.00\n")?;
        std::fs::write(dir.path().join("loadavg"), "0.52 0.61 0.70 2/345 12345\n")?;
        std::fs::write(
            dir.path().join("meminfo"),
            "MemTotal:       16384000 kB\nMemFree:         1000000 kB\nMemAvailable:    8192000 kB\n",
        )?;
        Ok(dir)
    }

    #[test]
    fn it_should_render_status_lines_from_procfs() -> Result<()> {
        let dir = fake_proc()?;
        let mut source = ProcStatusSource::new(dir.path());
        let content = source.refresh()?;
        assert_eq!(
            content.lines,
            vec![
                "Uptime: 1d 2h 03m".to_string(),
                "Load: 0.52 0.61 0.70  Procs: 2/345".to_string(),
                "RAM: 8000 / 16000 MiB (50%)".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn it_should_fail_with_context_when_a_file_is_missing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let err = ProcStatusSource::new(dir.path()).refresh().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read"));
        Ok(())
    }

    #[test]
    fn it_should_measure_content_in_characters() {
        let content = RenderedContent::new(vec!["ab".into(), "héllo".into(), String::new()]);
        assert_eq!(content.columns(), 5);
        assert_eq!(content.rows(), 3);
        assert_eq!(content.to_text(), "ab\nhéllo\n\n");
    }
}
