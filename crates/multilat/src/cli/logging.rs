use std::fs;
use std::path::PathBuf;

use file_rotate::{
    compression::Compression,
    suffix::AppendCount,
    ContentLimit, FileRotate,
};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub verbose: bool,
    /// When set, a JSON log file per role is written here, rotated by
    /// size.
    pub log_dir: Option<PathBuf>,
    pub max_size_mb: u64,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_dir: None,
            max_size_mb: 100,
            max_files: 10,
        }
    }
}

fn make_rotating_writer(
    path: PathBuf,
    max_size_mb: u64,
    max_files: usize,
) -> FileRotate<AppendCount> {
    FileRotate::new(
        path,
        AppendCount::new(max_files),
        ContentLimit::Bytes((max_size_mb * 1024 * 1024) as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    )
}

struct RotatingWriter {
    writer: std::sync::Arc<std::sync::Mutex<FileRotate<AppendCount>>>,
}

impl RotatingWriter {
    fn new(rotate: FileRotate<AppendCount>) -> Self {
        Self {
            writer: std::sync::Arc::new(std::sync::Mutex::new(rotate)),
        }
    }
}

impl<'a> MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingWriterGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriterGuard {
            guard: self.writer.lock().unwrap(),
        }
    }
}

struct RotatingWriterGuard<'a> {
    guard: std::sync::MutexGuard<'a, FileRotate<AppendCount>>,
}

impl<'a> std::io::Write for RotatingWriterGuard<'a> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.guard.flush()
    }
}

pub fn init_logging(role: &str, config: LoggingConfig) -> anyhow::Result<()> {
    let level = if config.verbose { "debug" } else { "info" };

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_filter(
            EnvFilter::from_default_env().add_directive(format!("multilat={level}").parse()?),
        );

    match &config.log_dir {
        Some(log_dir) => {
            fs::create_dir_all(log_dir)?;

            let writer = RotatingWriter::new(make_rotating_writer(
                log_dir.join(format!("{role}.jsonl")),
                config.max_size_mb,
                config.max_files,
            ));

            let file_layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(format!("multilat={level}")));

            tracing_subscriber::registry()
                .with(console_layer)
                .with(file_layer)
                .init();

            tracing::info!(
                role,
                log_dir = %log_dir.display(),
                max_size_mb = config.max_size_mb,
                max_files = config.max_files,
                "logging initialized"
            );
        }
        None => {
            tracing_subscriber::registry().with(console_layer).init();
        }
    }

    Ok(())
}
