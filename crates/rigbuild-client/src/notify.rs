use std::sync::Mutex;

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// Transient user-facing message (the storefront's toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

impl dyn Notifier {
    pub fn success(&self, message: impl Into<String>) {
        self.notify(Notice {
            level: Level::Success,
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(Notice {
            level: Level::Error,
            message: message.into(),
        });
    }
}

/// Sends notices to the log only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            Level::Success => info!(target: "rigbuild::notice", "{}", notice.message),
            Level::Error => warn!(target: "rigbuild::notice", "{}", notice.message),
        }
    }
}

/// Collects notices until drained.
#[derive(Default)]
pub struct Recorder(Mutex<Vec<Notice>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.0
            .lock()
            .map(|mut v| std::mem::take(&mut *v))
            .unwrap_or_default()
    }
}

impl Notifier for Recorder {
    fn notify(&self, notice: Notice) {
        LogNotifier.notify(notice.clone());
        if let Ok(mut v) = self.0.lock() {
            v.push(notice);
        }
    }
}
