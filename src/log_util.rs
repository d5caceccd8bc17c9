use chrono::Utc;
use std::{
    env,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::PathBuf,
};

const LOG_FILENAME: &str = "studyprep-debug.log";

/// Append a timestamped line to the shared debug log. Errors are reported to
/// stderr only; logging never interferes with the caller.
pub fn log_debug(message: &str) {
    if let Err(err) = append_line(message) {
        eprintln!("[studyprep::log_util] failed to write debug log: {}", err);
    }
}

fn append_line(message: &str) -> io::Result<()> {
    let path = resolve_log_path()?;
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "[{}] {}", Utc::now().to_rfc3339(), message)?;
    Ok(())
}

fn resolve_log_path() -> io::Result<PathBuf> {
    let mut dir = env::current_dir()?;
    dir.push("output");
    fs::create_dir_all(&dir)?;
    dir.push(LOG_FILENAME);
    Ok(dir)
}
