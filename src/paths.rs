use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// File name of the persisted settings, next to the executable.
pub const CONFIG_FILE_NAME: &str = "undercut_helper_config.json";

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the session log file: `<exe_dir>/logs/undercut_helper.log`
pub fn get_log_file() -> PathBuf {
    get_logs_dir().join("undercut_helper.log")
}

/// Returns the default config path: `<exe_dir>/undercut_helper_config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join(CONFIG_FILE_NAME)
}

/// Returns the price history CSV: `<exe_dir>/price_history.csv`
pub fn get_history_path() -> PathBuf {
    get_exe_dir().join("price_history.csv")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())
}
