use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Restores cooked mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        crossterm::terminal::enable_raw_mode().context("Failed to enable raw terminal mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

/// Ends the frame loop early: Ctrl-C or the stop key.
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    stop_key: Option<char>,
    _raw: Option<RawModeGuard>,
}

impl StopSignal {
    /// Only stops when [`StopSignal::raise`] is called
    #[cfg(test)]
    pub fn manual() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            stop_key: None,
            _raw: None,
        }
    }

    /// Installs the Ctrl-C handler and, on an interactive terminal, watches
    /// for `stop_key`. Call at most once per process.
    pub fn install(stop_key: char) -> Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        let f = flag.clone();
        ctrlc::set_handler(move || {
            f.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl-C handler")?;

        let (stop_key, raw) = if std::io::stdin().is_terminal() {
            (Some(stop_key), Some(RawModeGuard::enable()?))
        } else {
            (None, None)
        };

        Ok(Self { flag, stop_key, _raw: raw })
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn watches_keys(&self) -> bool {
        self.stop_key.is_some()
    }

    pub fn should_stop(&self) -> Result<bool> {
        if self.flag.load(Ordering::SeqCst) {
            return Ok(true);
        }

        let Some(stop_key) = self.stop_key else {
            return Ok(false);
        };

        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                // raw mode swallows SIGINT, so Ctrl-C arrives as a key
                let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
                if key.code == KeyCode::Char(stop_key) || ctrl_c {
                    crate::utils::logger::info("Stop requested from keyboard");
                    self.raise();
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_signal() {
        let stop = StopSignal::manual();
        assert!(!stop.watches_keys());
        assert!(!stop.should_stop().unwrap());

        stop.raise();
        assert!(stop.should_stop().unwrap());
    }
}
