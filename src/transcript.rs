//! Human readable record of a session.
//!
//! Every reply line the engine reads is appended verbatim, followed by one
//! line per failed operation (`FtpConnect <message>` and so on). The handle
//! is cheap to clone so a front end can keep one and render it while the
//! session owns another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub at: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<TranscriptLine>>>,
}

impl Transcript {
    pub fn new() -> Transcript {
        Transcript::default()
    }

    pub fn append<S: Into<String>>(&self, text: S) {
        self.lock().push(TranscriptLine {
            at: Utc::now(),
            text: text.into(),
        });
    }

    /// Snapshot of the text of every line, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lock().iter().map(|line| line.text.clone()).collect()
    }

    /// Snapshot including timestamps.
    pub fn entries(&self) -> Vec<TranscriptLine> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// All lines joined with `\n`, ready for a text box.
    pub fn render(&self) -> String {
        let lines = self.lock();
        let mut out = String::new();
        for line in lines.iter() {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TranscriptLine>> {
        // A panic while holding the lock cannot leave a half-pushed line.
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
