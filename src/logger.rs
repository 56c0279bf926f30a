//! Session log. Every `log_info!` / `log_warn!` / `log_err!` line of one run
//! lands in `MaskPick/maskpick.log` under the platform data directory
//! (`%APPDATA%`, `~/Library/Application Support`, `$XDG_DATA_HOME` or
//! `~/.local/share`). The file is truncated by [`init`].
//!
//! Nothing is written before [`init`], so the library and its tests stay
//! off the file system.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

struct SessionLog {
    path: PathBuf,
    file: Mutex<File>,
}

static SESSION: OnceLock<SessionLog> = OnceLock::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        })
    }
}

/// Where this session logs to, once [`init`] succeeded.
pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|s| s.path.as_path())
}

fn append(line: &str) {
    if let Some(session) = SESSION.get()
        && let Ok(mut file) = session.file.lock()
    {
        // A full disk must not take the viewer down
        let _ = writeln!(file, "{}", line);
    }
}

/// Backend of the logging macros.
pub fn write(level: Level, msg: &str) {
    append(&format_line(clock_of_day(unix_seconds()), level, msg));
}

fn format_line(clock: String, level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", clock, level, msg)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*))
    };
}

/// Open (truncating) the session log and hook panics into it.
/// Later calls are ignored.
pub fn init() {
    if SESSION.get().is_some() {
        return;
    }
    let path = data_dir().join("MaskPick").join("maskpick.log");
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("maskpick: no session log ({}): {}", path.display(), e);
            return;
        }
    };
    if SESSION.set(SessionLog { path: path.clone(), file: Mutex::new(file) }).is_err() {
        return;
    }

    append(&format!(
        "MaskPick {} session, unix time {}, log {}",
        env!("CARGO_PKG_VERSION"),
        unix_seconds(),
        path.display()
    ));

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write(Level::Panic, &info.to_string());
        previous(info);
    }));
}

fn data_dir() -> PathBuf {
    let env_path = |key: &str| std::env::var_os(key).map(PathBuf::from);
    if cfg!(target_os = "windows")
        && let Some(appdata) = env_path("APPDATA")
    {
        return appdata;
    }
    if cfg!(target_os = "macos")
        && let Some(home) = env_path("HOME")
    {
        return home.join("Library/Application Support");
    }
    env_path("XDG_DATA_HOME")
        .or_else(|| env_path("HOME").map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// `HH:MM:SS` (UTC) for a unix timestamp.
fn clock_of_day(unix: u64) -> String {
    let day = unix % 86_400;
    format!("{:02}:{:02}:{:02}", day / 3600, day % 3600 / 60, day % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_clock_and_level() {
        assert_eq!(clock_of_day(86_400 + 3 * 3600 + 4 * 60 + 5), "03:04:05");
        assert_eq!(
            format_line(clock_of_day(0), Level::Warn, "fetch slow"),
            "[00:00:00] [WARN] fetch slow"
        );
    }

    #[test]
    fn macros_are_silent_without_init() {
        crate::log_info!("nothing {}", 1);
        crate::log_err!("nothing");
        assert!(log_path().is_none());
    }
}
