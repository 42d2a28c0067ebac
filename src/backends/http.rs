// src/backends/http.rs

//! Serves the most recent frame as a self-refreshing HTML page.

use super::{Backend, BackendKind, Frame, NativeEvent, WaitOutcome};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, trace, warn};
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server};

pub struct HttpBackend {
    server: Option<Server>,
    /// Request accepted by `main_loop_wait`, answered in `drain_events`.
    pending: Option<Request>,
    page: String,
    refresh_secs: u64,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            server: None,
            pending: None,
            page: String::new(),
            refresh_secs: 1,
        }
    }

    fn respond(&self, request: Request) -> Result<()> {
        let header = Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
            .map_err(|_| anyhow!("HttpBackend: invalid Content-Type header"))?;
        trace!("HttpBackend: {} {}", request.method(), request.url());
        request
            .respond(Response::from_string(self.page.clone()).with_header(header))
            .context("HttpBackend: Failed to send response")
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps the frame text in a page that reloads itself every `refresh_secs`.
pub fn render_page(text: &str, refresh_secs: u64) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    format!(
        "<!DOCTYPE html><html><head><meta http-equiv=\"refresh\" content=\"{}\">\
         <title>sysview</title></head><body><pre>{}</pre></body></html>",
        refresh_secs, escaped
    )
}

impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Http
    }

    fn has_event_source(&self) -> bool {
        true
    }

    fn detect(&self, config: &Config) -> bool {
        config.output.http_port != 0
    }

    fn initialize(&mut self, config: &Config) -> Result<()> {
        let addr = ("0.0.0.0", config.output.http_port);
        let server = Server::http(addr)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("HttpBackend: Failed to bind port {}", config.output.http_port))?;
        self.refresh_secs = config.display.update_interval().as_secs().max(1);
        self.page = render_page("", self.refresh_secs);
        self.server = Some(server);
        info!("HttpBackend listening on port {}", config.output.http_port);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.pending = None;
        if let Some(server) = self.server.take() {
            server.unblock();
            debug!("HttpBackend: server stopped");
        }
        Ok(())
    }

    fn main_loop_wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        let Some(server) = self.server.as_ref() else {
            return Ok(WaitOutcome::TimedOut);
        };
        if self.pending.is_some() {
            return Ok(WaitOutcome::Ready);
        }
        let request = if timeout.is_zero() {
            server.try_recv()
        } else {
            server.recv_timeout(timeout)
        }
        .context("HttpBackend: Failed to accept request")?;
        Ok(match request {
            Some(request) => {
                self.pending = Some(request);
                WaitOutcome::Ready
            }
            None => WaitOutcome::TimedOut,
        })
    }

    fn drain_events(&mut self) -> Result<Vec<NativeEvent>> {
        if let Some(request) = self.pending.take() {
            self.respond(request)?;
        }
        while let Some(server) = self.server.as_ref() {
            match server.try_recv() {
                Ok(Some(request)) => self.respond(request)?,
                Ok(None) => break,
                Err(e) => {
                    warn!("HttpBackend: accept failed: {}", e);
                    break;
                }
            }
        }
        Ok(Vec::new())
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.page = render_page(&frame.content.to_text(), self.refresh_secs);
        Ok(())
    }

    fn cleanup(&mut self) {
        self.pending = None;
    }

    fn sigterm_cleanup(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_escape_markup_in_the_page() {
        let page = render_page("a<b> & \"c\"\n", 3);
        assert!(page.contains("content=\"3\""));
        assert!(page.contains("<pre>a&lt;b&gt; &amp; &quot;c&quot;\n</pre>"));
    }

    #[test]
    fn it_should_stay_disabled_on_port_zero() {
        let config = Config::default();
        assert!(!HttpBackend::new().detect(&config));
    }
}
