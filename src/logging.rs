#[cfg(any(feature = "app", test))]
use std::any::Any;
use std::path::{Path, PathBuf};

pub const LOG_ENV_VAR: &str = "PLAN_FOCUS_LOG";
pub const LOG_FILE_BASENAME: &str = "plan-focus";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;

/// Resolves the logger spec: `PLAN_FOCUS_LOG`, then `RUST_LOG`, then the build default.
pub fn log_spec(plan_focus_log: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,plan_focus=debug"
    } else {
        "warn,plan_focus=info"
    };
    plan_focus_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

/// Where and how the CLI writes its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub spec: String,
    pub dir: PathBuf,
    /// Echo info and above to stdout as well as the file.
    pub echo_stdout: bool,
}

impl LogConfig {
    pub fn new(data_dir: &Path, plan_focus_log: Option<String>, rust_log: Option<String>) -> Self {
        Self {
            spec: log_spec(plan_focus_log, rust_log),
            dir: data_dir.to_path_buf(),
            echo_stdout: cfg!(debug_assertions),
        }
    }

    pub fn from_env(data_dir: &Path) -> Self {
        Self::new(
            data_dir,
            std::env::var(LOG_ENV_VAR).ok(),
            std::env::var("RUST_LOG").ok(),
        )
    }

    pub fn log_file(&self) -> PathBuf {
        self.dir.join(format!("{LOG_FILE_BASENAME}.{LOG_FILE_SUFFIX}"))
    }
}

#[cfg(feature = "app")]
pub fn init_logging(data_dir: &Path) -> Result<(), flexi_logger::FlexiLoggerError> {
    start_logger(&LogConfig::from_env(data_dir))
}

#[cfg(feature = "app")]
fn start_logger(config: &LogConfig) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(&config.dir)?;
    let files = FileSpec::default()
        .directory(&config.dir)
        .basename(LOG_FILE_BASENAME)
        .suffix(LOG_FILE_SUFFIX);
    let echo = if config.echo_stdout {
        Duplicate::Info
    } else {
        Duplicate::None
    };

    // A CLI run is short; flush on exit rather than on a timer.
    Logger::try_with_str(&config.spec)?
        .log_to_file(files)
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stdout(echo)
        .start()?;

    install_panic_hook();
    log::debug!("logging to {} spec={}", config.log_file().display(), config.spec);
    Ok(())
}

#[cfg(any(feature = "app", test))]
fn panic_text(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "<non-string panic payload>"
    }
}

/// Routes panics into the log file before the default hook prints them.
#[cfg(feature = "app")]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unknown>".to_string());
        log::error!("panic at {location}: {}", panic_text(info.payload()));
        default_hook(info);
    }));
}
