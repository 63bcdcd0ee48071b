//! Configuration management for VirusGuard.

use crate::core::error::{Error, Result};
use crate::core::types::ScanMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest accepted folder-scan parallelism.
pub const MIN_PARALLELISM: usize = 1;
/// Largest accepted folder-scan parallelism.
pub const MAX_PARALLELISM: usize = 8;
/// Default folder-scan parallelism.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan-related settings
    pub scan: ScanConfig,
    /// Heuristic thresholds and rule sets
    pub detection: DetectionConfig,
    /// Signature, quarantine and report locations
    pub paths: PathsConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigSave(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| Error::ConfigSave(format!("Failed to write config file: {}", e)))
    }

    /// Load configuration from default location, or create default if not exists.
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            match Self::load(&config_path).and_then(|c| c.validate().map(|_| c)) {
                Ok(config) => return config,
                Err(e) => {
                    log::warn!("Failed to load config, using defaults: {}", e);
                    return Self::default();
                }
            }
        }

        let config = Self::default();

        if let Err(e) = config.save(&config_path) {
            log::warn!("Failed to save default config: {}", e);
        }

        config
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    /// Get the application data directory.
    pub fn data_dir() -> PathBuf {
        #[cfg(windows)]
        {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData"))
                .join("VirusGuard")
        }

        #[cfg(not(windows))]
        {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("virusguard")
        }
    }

    /// Create quarantine, report and log directories if missing.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.paths.quarantine_dir(),
            self.paths.reports_dir(),
            self.logging.log_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| Error::DirectoryAccess { path: dir, source: e })?;
        }
        Ok(())
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        validate_parallelism(self.scan.max_parallelism)?;

        for (field, value) in [
            ("detection.fast_mode_threshold", self.detection.fast_mode_threshold),
            ("detection.full_mode_threshold", self.detection.full_mode_threshold),
        ] {
            if value == 0 || value > 100 {
                return Err(Error::config_invalid(field, "Must be between 1 and 100"));
            }
        }

        let entropy = self.detection.entropy_threshold;
        if !(entropy > 0.0 && entropy <= 8.0) {
            return Err(Error::config_invalid(
                "detection.entropy_threshold",
                "Must be greater than 0 and at most 8",
            ));
        }

        if self.logging.keep_logs_days == 0 {
            return Err(Error::config_invalid(
                "logging.keep_logs_days",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Check a parallelism bound against the supported range.
pub fn validate_parallelism(value: usize) -> Result<()> {
    if !(MIN_PARALLELISM..=MAX_PARALLELISM).contains(&value) {
        return Err(Error::config_invalid(
            "scan.max_parallelism",
            format!(
                "Must be between {} and {} (got {})",
                MIN_PARALLELISM, MAX_PARALLELISM, value
            ),
        ));
    }
    Ok(())
}

/// Scan-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Default scan mode
    pub mode: ScanMode,
    /// File and directory name fragments to skip (case-insensitive)
    pub exclude_patterns: Vec<String>,
    /// Number of concurrent file scans in a folder scan
    pub max_parallelism: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Fast,
            exclude_patterns: default_exclude_patterns(),
            max_parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// Build-output and VCS directories that are never worth scanning.
pub fn default_exclude_patterns() -> Vec<String> {
    ["bin", "obj", ".git", ".vs", "node_modules", "packages"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Heuristic thresholds and rule sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Risk score at which a Fast scan flags a file
    pub fast_mode_threshold: u8,
    /// Risk score at which a Full scan flags a file
    pub full_mode_threshold: u8,
    /// Files above this size (MB) get the large-file finding
    pub large_file_threshold_mb: u64,
    /// Dangerous files below this size (KB) get the small-executable finding
    pub small_executable_threshold_kb: u64,
    /// Shannon entropy (bits per byte) at which content counts as packed
    pub entropy_threshold: f64,
    /// Entropy is only computed for files up to this size (MB)
    pub entropy_max_file_mb: u64,
    /// Executable/script extensions
    pub dangerous_extensions: Vec<String>,
    /// Document/media extensions commonly used as a disguise
    pub spoofed_extensions: Vec<String>,
    /// Script extensions
    pub script_extensions: Vec<String>,
    /// Path fragments of locations malware likes to drop into
    pub suspicious_locations: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fast_mode_threshold: 80,
            full_mode_threshold: 70,
            large_file_threshold_mb: 100,
            small_executable_threshold_kb: 10,
            entropy_threshold: 7.5,
            entropy_max_file_mb: 10,
            dangerous_extensions: to_strings(&[
                "exe", "com", "scr", "pif", "bat", "cmd", "ps1", "vbs", "vbe", "js", "jse", "ws",
                "wsf", "wsc", "wsh", "msc", "msi", "msp", "hta", "cpl", "reg", "dll", "sys",
            ]),
            spoofed_extensions: to_strings(&[
                "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "jpg", "jpeg", "png",
                "gif", "mp3", "mp4", "avi",
            ]),
            script_extensions: to_strings(&["js", "vbs", "ps1", "bat", "cmd", "wsf", "hta"]),
            suspicious_locations: to_strings(&[
                "temp",
                "tmp",
                "appdata",
                "startup",
                "start menu",
                "roaming",
                "downloads",
                "desktop",
            ]),
        }
    }
}

impl DetectionConfig {
    /// Risk threshold for the given mode.
    pub fn threshold_for(&self, mode: ScanMode) -> u8 {
        match mode {
            ScanMode::Fast => self.fast_mode_threshold,
            ScanMode::Full => self.full_mode_threshold,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Storage locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Signature list (JSON)
    pub signatures_path: Option<PathBuf>,
    /// Quarantine store
    pub quarantine_path: Option<PathBuf>,
    /// Scan report directory
    pub reports_path: Option<PathBuf>,
}

impl PathsConfig {
    /// Get the effective signature file.
    pub fn signatures_file(&self) -> PathBuf {
        self.signatures_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("signatures.json"))
    }

    /// Get the effective quarantine directory.
    pub fn quarantine_dir(&self) -> PathBuf {
        self.quarantine_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("quarantine"))
    }

    /// Get the effective reports directory.
    pub fn reports_dir(&self) -> PathBuf {
        self.reports_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("reports"))
    }

    /// Point every location under one root directory.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            signatures_path: Some(root.join("signatures.json")),
            quarantine_path: Some(root.join("quarantine")),
            reports_path: Some(root.join("reports")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Days to keep log files
    pub keep_logs_days: u32,
    /// Path for log files
    pub log_path: Option<PathBuf>,
    /// Enable verbose console output
    pub verbose_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            keep_logs_days: 30,
            log_path: None,
            verbose_console: false,
        }
    }
}

impl LoggingConfig {
    /// Get the effective log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("logs"))
    }
}
