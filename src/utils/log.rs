// utils/log.rs

use std::{
    collections::VecDeque,
    fs::{
        self,
        File,
    },
    io::{
        self,
        BufRead,
        BufReader,
        BufWriter,
        ErrorKind,
        Write,
    },
    path::Path,
    str::FromStr,
    sync::OnceLock,
};

use tempfile::NamedTempFile;
use tracing::{
    debug,
    error,
    level_filters::LevelFilter,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{
        RollingFileAppender,
        Rotation,
    },
};
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{
        time,
        writer::{
            BoxMakeWriter,
            MakeWriterExt,
        },
    },
};

use crate::config::CONFIG;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Crates whose debug output drowns ours
const QUIET: &[&str] = &["hyper=warn", "hyper_util=warn", "h2=warn", "tower=warn"];

/// # Trims a log file until it's under a maximum size
///
/// Trimming means deleting lines from the top of the file
///
/// # Arguments
/// * `path`        - The path to the log file to be trimmed
/// * `max_size`    - The maximum size of the log file, in bytes
///
/// # Returns
/// Bytes trimmed
///
/// # Errors
/// - Log file does not exist (`NotFound` should be handled when called)
/// - Other I/O errors
pub fn trim_log<P: AsRef<Path>>(path: P, max_size: u64) -> io::Result<u64> {
    let path = path.as_ref();
    let size = fs::metadata(path)?.len();

    if size <= max_size {
        return Ok(0);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut lines = VecDeque::new();
    let mut total_size = 0;

    for line in reader.lines() {
        let line = line?;
        let line_size = (line.len() + 1) as u64; // account for \n

        total_size += line_size;
        lines.push_back((line, line_size));

        while total_size > max_size {
            if let Some((_, removed_size)) = lines.pop_front() {
                total_size -= removed_size;
            }
        }
    }

    // Keep the temp file beside the log so persist() is a rename, not a cross-device copy
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp_file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut temp_file);
        for (line, _) in &lines {
            writeln!(writer, "{line}")?;
        }
    }

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(size - total_size)
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, String> {
    let file = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| format!("{path:?} is not a file path"))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file)
        .build(dir)
        .map_err(|e| e.to_string())
}

pub fn log() {
    let file_writer = match file_appender(&CONFIG.log_file) {
        | Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            if LOG_GUARD.set(guard).is_err() {
                eprintln!("The log() function was called more than once.");
                eprintln!("Please report this as a bug.");
            }
            Some(writer)
        },
        | Err(e) => {
            eprintln!("Failed to open log file {:?}: {e}", CONFIG.log_file);
            eprintln!("Logging to the console only");
            None
        },
    };

    let writer = match file_writer {
        | Some(f) if CONFIG.log_to_console => BoxMakeWriter::new(f.and(io::stdout)),
        | Some(f) => BoxMakeWriter::new(f),
        | None => BoxMakeWriter::new(io::stdout),
    };

    let level = LevelFilter::from_str(&CONFIG.log_level).unwrap_or(LevelFilter::DEBUG);
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var("LOG_LEVEL")
        .from_env_lossy();

    for directive in QUIET {
        if let Ok(d) = directive.parse::<Directive>() {
            filter = filter.add_directive(d);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .with_target(true)
        .with_line_number(true)
        .with_timer(time::uptime())
        .with_writer(writer)
        .compact()
        .init();
}

/// # Initialize logging
///
/// This function wraps all the logging setup, including trimming. Trimming happens before the
/// appender opens the file, since it replaces the file.
pub fn init() {
    let trimmed = trim_log(&CONFIG.log_file, CONFIG.log_max_size);
    log();
    match trimmed {
        | Ok(b) => debug!("Trimmed {b} bytes from log file"),
        | Err(e) if e.kind() == ErrorKind::NotFound => {},
        | Err(e) => error!("Failed to trim bytes from log file: {e}"),
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::tempdir;

    use super::trim_log;

    #[test]
    fn small_log_is_untouched() {
        let tmp = tempdir().unwrap();
        let log = tmp.path().join("t.log");
        fs::write(&log, "one\ntwo\n").unwrap();

        assert_eq!(trim_log(&log, 1024).unwrap(), 0);
        assert_eq!(fs::read_to_string(&log).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn trims_from_the_top() {
        let tmp = tempdir().unwrap();
        let log = tmp.path().join("t.log");
        fs::write(&log, "first\nsecond\nthird\n").unwrap();

        let trimmed = trim_log(&log, 13).unwrap();
        assert_eq!(trimmed, 6);
        assert_eq!(fs::read_to_string(&log).unwrap(), "second\nthird\n");
    }

    #[test]
    fn missing_log_is_not_found() {
        let tmp = tempdir().unwrap();
        let err = trim_log(tmp.path().join("nope.log"), 10).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
