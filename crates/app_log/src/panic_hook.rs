//! Crash reports for panics on any thread

use backtrace::Backtrace;
use chrono::{DateTime, Local};
use std::any::Any;
use std::path::{Path, PathBuf};

/// Install a hook that reports panics and writes a dump into `dump_dir`
///
/// Falls back to the system temp dir when `dump_dir` cannot be created.
pub fn init_panic_hook(dump_dir: PathBuf) {
    std::panic::set_hook(Box::new(move |info| {
        let now = Local::now();
        let thread = std::thread::current();
        let report = format!(
            "=== file_manager {} panicked ===\n\
             Time:     {}\n\
             Thread:   {}\n\
             Location: {}\n\
             Message:  {}\n\n\
             {:?}",
            env!("CARGO_PKG_VERSION"),
            now.to_rfc3339(),
            thread.name().unwrap_or("<unnamed>"),
            info.location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            panic_message(info.payload()),
            Backtrace::new()
        );

        eprintln!("{}", report);
        // A panicking worker thread does not take the subscriber down with it
        tracing::error!(target: "panic", "{}", report);

        let path = dump_path(&dump_dir, now);
        match std::fs::write(&path, &report) {
            Ok(()) => eprintln!("Crash report written to {}", path.display()),
            Err(e) => eprintln!("Failed to write crash report {}: {}", path.display(), e),
        }
    }));
    tracing::debug!("Panic hook installed");
}

fn dump_path(dump_dir: &Path, now: DateTime<Local>) -> PathBuf {
    let dir = if std::fs::create_dir_all(dump_dir).is_ok() {
        dump_dir.to_path_buf()
    } else {
        std::env::temp_dir()
    };
    dir.join(format!("crash_{}.txt", now.format("%Y%m%d_%H%M%S")))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string payload>"
    }
}
