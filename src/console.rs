//! Editor log channel.
//!
//! The pattern engine itself never logs. The editor, storage watcher and CLI
//! report through here so a front end can collect messages (REPL prints
//! them between prompts) instead of having them interleave with input.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: Level,
    pub text: String,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.label(), self.text)
    }
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
static SUBSCRIBERS: Lazy<Mutex<Vec<(usize, Sender<LogMessage>)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// A subscription to console log messages.
///
/// Dropping this value unsubscribes it.
pub struct Subscription {
    id: usize,
    rx: Receiver<LogMessage>,
}

impl Subscription {
    pub fn drain(&self) -> Vec<LogMessage> {
        self.rx.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut subs) = SUBSCRIBERS.lock() {
            subs.retain(|(id, _)| *id != self.id);
        }
    }
}

pub fn subscribe() -> Subscription {
    let (tx, rx) = mpsc::channel();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    if let Ok(mut subs) = SUBSCRIBERS.lock() {
        subs.push((id, tx));
    }
    Subscription { id, rx }
}

pub fn info(msg: impl Into<String>) {
    publish(Level::Info, msg.into());
}

pub fn warn(msg: impl Into<String>) {
    publish(Level::Warn, msg.into());
}

pub fn error(msg: impl Into<String>) {
    publish(Level::Error, msg.into());
}

fn publish(level: Level, text: String) {
    let message = LogMessage { level, text };

    let Ok(mut subs) = SUBSCRIBERS.lock() else {
        eprintln!("{}", message);
        return;
    };
    if subs.is_empty() {
        // Nobody is collecting; warnings and errors still reach stderr.
        match message.level {
            Level::Warn | Level::Error => eprintln!("{}", message),
            Level::Info => {}
        }
        return;
    }

    // Broadcast to all subscribers; drop any that have gone away.
    subs.retain(|(_, tx)| tx.send(message.clone()).is_ok());
}
