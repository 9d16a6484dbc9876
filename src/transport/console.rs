use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};

use super::Notifier;

/// Writes each notification as a line on stdout.
///
/// Used by the daemon when no radio transport is attached.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    sent: AtomicU64,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, payload: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(payload);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", text).context("write notification")?;
        stdout.flush().context("flush notification")?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
