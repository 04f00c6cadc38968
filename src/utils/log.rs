use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const LOG_DIR: &str = "logs";

fn open_append(filename: &str) -> io::Result<std::fs::File> {
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(format!("{}/{}", LOG_DIR, filename))
}

/// Appends a timestamped line to a log file under `logs/`.
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    let mut file = open_append(filename)?;
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "[{}] {}", timestamp, message)?;
    file.flush()
}

/// Appends a row to a CSV log, writing the header first if the file is new.
pub fn log_csv(filename: &str, headers: &[&str], data: &[String]) -> io::Result<()> {
    let path = format!("{}/{}", LOG_DIR, filename);
    let file_exists = Path::new(&path).exists();

    let mut file = open_append(filename)?;
    if !file_exists && !headers.is_empty() {
        writeln!(file, "{}", headers.join(","))?;
    }
    writeln!(file, "{}", data.join(","))?;
    file.flush()
}
