//! Notice board — user-visible status messages.
//!
//! Info, success and warning notices expire on their own.  Errors stay until
//! the user dismisses them, so a failed generation job cannot disappear
//! silently.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use fundboard_proto::config::NoticeConfig;
use fundboard_proto::protocol::{Notice, Severity};

struct Entry {
    notice: Notice,
    expires: Option<Instant>,
}

pub struct NoticeBoard {
    entries: VecDeque<Entry>,
    next_id: u64,
    info_ttl: Duration,
    warning_ttl: Duration,
    max_queued: usize,
}

impl NoticeBoard {
    pub fn new(config: &NoticeConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 0,
            info_ttl: Duration::from_secs(config.info_secs),
            warning_ttl: Duration::from_secs(config.warning_secs),
            max_queued: config.max_queued.max(1),
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity) -> Notice {
        // Remove duplicates (same message)
        let message = message.into();
        self.entries.retain(|e| e.notice.message != message);

        self.next_id += 1;
        let notice = Notice {
            id: self.next_id,
            severity,
            message,
            raised_at: chrono::Local::now(),
        };
        let expires = match severity {
            Severity::Info | Severity::Success => Some(Instant::now() + self.info_ttl),
            Severity::Warning => Some(Instant::now() + self.warning_ttl),
            Severity::Error => None,
        };
        self.entries.push_back(Entry {
            notice: notice.clone(),
            expires,
        });

        // Cap queue by dropping the oldest expiring notice.  Errors are never
        // evicted; only `dismiss` removes them.
        while self.entries.len() > self.max_queued {
            match self.entries.iter().position(|e| e.expires.is_some()) {
                Some(victim) => {
                    self.entries.remove(victim);
                }
                None => break,
            }
        }
        notice
    }

    pub fn success(&mut self, message: impl Into<String>) -> Notice {
        self.push(message, Severity::Success)
    }

    pub fn error(&mut self, message: impl Into<String>) -> Notice {
        self.push(message, Severity::Error)
    }

    /// Returns whether a notice was removed.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.notice.id != id);
        self.entries.len() != before
    }

    /// Drop expired notices.  Returns whether anything changed.
    pub fn sweep(&mut self) -> bool {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&mut self, now: Instant) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.expires.map_or(true, |deadline| deadline > now));
        self.entries.len() != before
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.entries.iter().map(|e| e.notice.clone()).collect()
    }
}
