// src/os/epoll.rs

//! Thin `epoll` wrapper over raw `libc` calls. Backends register the
//! descriptors of their native event sources here and block in `events` for
//! at most the scheduler's timeout.

use anyhow::{Context, Result};
use bitflags::bitflags;
use log::{debug, trace, warn};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EpollFlags: u32 {
        const EPOLLIN = libc::EPOLLIN as u32;
        const EPOLLPRI = libc::EPOLLPRI as u32;
        const EPOLLERR = libc::EPOLLERR as u32;
        const EPOLLHUP = libc::EPOLLHUP as u32;
        const EPOLLRDHUP = libc::EPOLLRDHUP as u32;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
enum EpollCtlOp {
    Add = libc::EPOLL_CTL_ADD,
    Del = libc::EPOLL_CTL_DEL,
}

/// A ready descriptor: the token it was registered with and what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyEvent {
    pub token: u64,
    pub flags: EpollFlags,
}

const MAX_EVENTS: usize = 16;

#[derive(Debug)]
pub struct EventMonitor {
    epoll_fd: RawFd,
    buffer: [libc::epoll_event; MAX_EVENTS],
    ready: Vec<ReadyEvent>,
}

impl EventMonitor {
    pub fn new() -> Result<Self> {
        // SAFETY: epoll_create1 takes no pointers; the result is checked below.
        let epoll_fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll_fd == -1 {
            return Err(io::Error::last_os_error())
                .context("Failed to create epoll instance (epoll_create1)");
        }
        debug!("EventMonitor created with epoll_fd: {}", epoll_fd);
        Ok(Self {
            epoll_fd,
            // SAFETY: epoll_event is plain old data; all-zero is a valid value.
            buffer: [unsafe { std::mem::zeroed() }; MAX_EVENTS],
            ready: Vec::with_capacity(MAX_EVENTS),
        })
    }

    fn ctl(&self, op: EpollCtlOp, fd: RawFd, token: u64, flags: EpollFlags) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: flags.bits(),
            u64: token,
        };
        // SAFETY: `event` outlives the call and `epoll_fd` is owned by self.
        if unsafe { libc::epoll_ctl(self.epoll_fd, op as libc::c_int, fd, &mut event) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn add(&self, fd: RawFd, token: u64, flags: EpollFlags) -> Result<()> {
        self.ctl(EpollCtlOp::Add, fd, token, flags)
            .with_context(|| format!("Failed to add fd {} to epoll (token: {})", fd, token))?;
        trace!("EventMonitor: watching fd {} as token {} ({:?})", fd, token, flags);
        Ok(())
    }

    pub fn delete(&self, fd: RawFd) -> Result<()> {
        self.ctl(EpollCtlOp::Del, fd, 0, EpollFlags::empty())
            .with_context(|| format!("Failed to delete fd {} from epoll", fd))?;
        trace!("EventMonitor: stopped watching fd {}", fd);
        Ok(())
    }

    /// Waits up to `timeout` for registered descriptors to become ready.
    /// A signal interrupting the wait yields an empty slice, not an error.
    pub fn events(&mut self, timeout: Duration) -> Result<&[ReadyEvent]> {
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        // SAFETY: the buffer holds MAX_EVENTS entries and lives as long as self.
        let count = unsafe {
            libc::epoll_wait(
                self.epoll_fd,
                self.buffer.as_mut_ptr(),
                MAX_EVENTS as libc::c_int,
                timeout_ms,
            )
        };

        self.ready.clear();
        if count == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                trace!("EventMonitor: epoll_wait interrupted (EINTR)");
                return Ok(&self.ready);
            }
            return Err(err).context("epoll_wait failed in EventMonitor");
        }

        self.ready.extend(self.buffer[..count as usize].iter().map(|e| ReadyEvent {
            token: e.u64,
            flags: EpollFlags::from_bits_truncate(e.events),
        }));
        trace!("EventMonitor: {} ready after waiting up to {}ms", count, timeout_ms);
        Ok(&self.ready)
    }

    /// Like `events`, but distinguishes a signal wake from a plain timeout.
    pub fn wait(&mut self, timeout: Duration) -> Result<WaitResult> {
        let before = std::time::Instant::now();
        let ready = self.events(timeout)?.len();
        Ok(if ready > 0 {
            WaitResult::Ready(ready)
        } else if before.elapsed() < timeout {
            WaitResult::Interrupted
        } else {
            WaitResult::TimedOut
        })
    }
}

/// Outcome of `EventMonitor::wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Ready(usize),
    TimedOut,
    Interrupted,
}

impl Drop for EventMonitor {
    fn drop(&mut self) {
        // SAFETY: epoll_fd was returned by epoll_create1 and is closed only here.
        if unsafe { libc::close(self.epoll_fd) } == -1 {
            warn!(
                "Failed to close epoll_fd {} in EventMonitor::drop: {}",
                self.epoll_fd,
                io::Error::last_os_error()
            );
        } else {
            debug!("Closed epoll_fd {}", self.epoll_fd);
        }
    }
}
