// src/config/settings.rs
use crate::{
    cli::Commands,
    types::PriorityMode,
    utils::{error::MinerError, logging::{LogOptions, parse_level}},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Settings shared between the service, the client and the control API
pub type SharedSettings = Arc<RwLock<Settings>>;

const DEFAULT_LANGUAGE: &str = "English";
const SETTINGS_FILE_NAME: &str = "settings.toml";
const JOURNAL_FILE_NAME: &str = "journal.json";
const LOG_FILE_NAME: &str = "log.txt";
const WEBUI_DIR_NAME: &str = "webui";

/// Persisted part of the configuration (TOML)
///
/// Every field has a default, so a partial or missing file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    /// Proxy URL used by the client, empty for none
    pub proxy: String,
    /// Interface language
    pub language: String,
    /// Dark theme flag for graphical front-ends
    pub dark_mode: bool,
    /// Games never mined
    pub exclude: BTreeSet<String>,
    /// Games mined first, in order
    pub priority: Vec<String>,
    /// Start minimized to tray
    pub autostart_tray: bool,
    /// Connection quality multiplier for request timeouts
    pub connection_quality: u32,
    /// Show tray notifications
    pub tray_notifications: bool,
    /// Also mine badge and emote drops
    pub enable_badges_emotes: bool,
    /// Check drop availability before watching
    pub available_drops_check: bool,
    /// Campaign ordering mode
    pub priority_mode: PriorityMode,
    /// Level override for the watchdog log target
    pub logging_watchdog_level: Option<String>,
    /// Level override for the watch log target
    pub logging_watch_level: Option<String>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            proxy: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            dark_mode: false,
            exclude: BTreeSet::new(),
            priority: Vec::new(),
            autostart_tray: false,
            connection_quality: 1,
            tray_notifications: true,
            enable_badges_emotes: false,
            available_drops_check: false,
            priority_mode: PriorityMode::PriorityOnly,
            logging_watchdog_level: None,
            logging_watch_level: None,
        }
    }
}

/// Process-level options taken from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeArgs {
    /// Number of `-v` flags
    pub verbose: u8,
    /// Log to file instead of stdout
    pub log: bool,
    /// Control API binding, if enabled
    pub bind: Option<String>,
    /// App data directory
    pub data_dir: PathBuf,
    /// Settings file location
    pub settings_path: PathBuf,
}

impl RuntimeArgs {
    /// Resolves paths from parsed flags
    ///
    /// The data directory defaults to the working directory and the settings
    /// file to `settings.toml` inside it.
    pub fn from_commands(cmd: &Commands) -> Self {
        let data_dir = cmd
            .data_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let settings_path = cmd
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join(SETTINGS_FILE_NAME));
        Self {
            verbose: cmd.verbose,
            log: cmd.log,
            bind: cmd.bind.clone(),
            data_dir,
            settings_path,
        }
    }

    /// Runtime args rooted at `data_dir`, with every flag off
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            verbose: 0,
            log: false,
            bind: None,
            settings_path: data_dir.join(SETTINGS_FILE_NAME),
            data_dir,
        }
    }
}

/// A single validated change to the persisted settings
///
/// This is the only path through which settings change after startup.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsUpdate {
    /// New interface language
    Language(String),
    /// New proxy URL (empty clears it)
    Proxy(String),
    /// New priority list
    Priority(Vec<String>),
    /// New exclusion set
    Exclude(BTreeSet<String>),
    /// New campaign ordering mode
    PriorityMode(PriorityMode),
    /// Toggle availability checks
    AvailableDropsCheck(bool),
    /// Toggle badge/emote drops
    EnableBadgesEmotes(bool),
    /// New connection quality
    ConnectionQuality(u32),
    /// Toggle tray notifications
    TrayNotifications(bool),
    /// Toggle start-in-tray
    AutostartTray(bool),
}

impl SettingsUpdate {
    /// Validates one JSON field into an update
    ///
    /// # Errors
    /// Returns a human-readable message naming the field when the key is
    /// unknown or the value has the wrong type.
    pub fn from_field(key: &str, value: &Value) -> Result<Self, String> {
        let invalid = || format!("Unsupported or invalid field: {}", key);
        match key {
            "language" => value
                .as_str()
                .map(|s| SettingsUpdate::Language(s.to_string()))
                .ok_or_else(invalid),
            "proxy" => {
                let raw = value.as_str().ok_or_else(invalid)?;
                if !raw.is_empty() {
                    url::Url::parse(raw).map_err(|e| format!("proxy: {}", e))?;
                }
                Ok(SettingsUpdate::Proxy(raw.to_string()))
            }
            "priority" => string_list(value)
                .map(SettingsUpdate::Priority)
                .ok_or_else(invalid),
            "exclude" => string_list(value)
                .map(|items| SettingsUpdate::Exclude(items.into_iter().collect()))
                .ok_or_else(invalid),
            "priority_mode" => {
                let name = value.as_str().ok_or_else(invalid)?;
                name.parse()
                    .map(SettingsUpdate::PriorityMode)
                    .map_err(|e| format!("priority_mode: {}", e))
            }
            "available_drops_check" => value
                .as_bool()
                .map(SettingsUpdate::AvailableDropsCheck)
                .ok_or_else(invalid),
            "enable_badges_emotes" => value
                .as_bool()
                .map(SettingsUpdate::EnableBadgesEmotes)
                .ok_or_else(invalid),
            "connection_quality" => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(SettingsUpdate::ConnectionQuality)
                .ok_or_else(invalid),
            "tray_notifications" => value
                .as_bool()
                .map(SettingsUpdate::TrayNotifications)
                .ok_or_else(invalid),
            "autostart_tray" => value
                .as_bool()
                .map(SettingsUpdate::AutostartTray)
                .ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Merged configuration: command-line flags over the settings file
///
/// Built once at startup. Reads go through named accessors, writes through
/// [`Settings::apply`], and [`Settings::save`] only touches disk when
/// something changed (or when forced).
#[derive(Debug, Clone)]
pub struct Settings {
    file: SettingsFile,
    args: RuntimeArgs,
    altered: bool,
}

impl Settings {
    /// Loads the settings file named by `args`, falling back to defaults
    /// when it does not exist
    ///
    /// # Errors
    /// Returns `MinerError` if the file exists but cannot be read or parsed.
    pub fn load(args: RuntimeArgs) -> Result<Self, MinerError> {
        let file = load_file(&args.settings_path)?;
        Ok(Self {
            file,
            args,
            altered: false,
        })
    }

    /// Builds settings from already-loaded parts
    pub fn new(file: SettingsFile, args: RuntimeArgs) -> Self {
        Self {
            file,
            args,
            altered: false,
        }
    }

    /// Wraps the settings for sharing
    pub fn into_shared(self) -> SharedSettings {
        Arc::new(RwLock::new(self))
    }

    /// Persisted values
    pub fn file(&self) -> &SettingsFile {
        &self.file
    }

    /// Command-line values
    pub fn args(&self) -> &RuntimeArgs {
        &self.args
    }

    /// Control API binding, if enabled
    pub fn bind(&self) -> Option<&str> {
        self.args.bind.as_deref()
    }

    /// Location of the persisted activity journal
    pub fn journal_path(&self) -> PathBuf {
        self.args.data_dir.join(JOURNAL_FILE_NAME)
    }

    /// Location of the log file used with `--log`
    pub fn log_path(&self) -> PathBuf {
        self.args.data_dir.join(LOG_FILE_NAME)
    }

    /// Directory the control API serves its web UI from
    pub fn webui_dir(&self) -> PathBuf {
        self.args.data_dir.join(WEBUI_DIR_NAME)
    }

    /// Logging options derived from flags and per-target file overrides
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            verbosity: self.args.verbose,
            log_file: self.args.log.then(|| self.log_path()),
            watchdog_level: parse_level(self.file.logging_watchdog_level.as_deref()),
            watch_level: parse_level(self.file.logging_watch_level.as_deref()),
        }
    }

    /// True when there are unsaved changes
    pub fn is_altered(&self) -> bool {
        self.altered
    }

    /// Applies one validated update
    pub fn apply(&mut self, update: SettingsUpdate) {
        let file = &mut self.file;
        match update {
            SettingsUpdate::Language(v) => file.language = v,
            SettingsUpdate::Proxy(v) => file.proxy = v,
            SettingsUpdate::Priority(v) => file.priority = v,
            SettingsUpdate::Exclude(v) => file.exclude = v,
            SettingsUpdate::PriorityMode(v) => file.priority_mode = v,
            SettingsUpdate::AvailableDropsCheck(v) => file.available_drops_check = v,
            SettingsUpdate::EnableBadgesEmotes(v) => file.enable_badges_emotes = v,
            SettingsUpdate::ConnectionQuality(v) => file.connection_quality = v,
            SettingsUpdate::TrayNotifications(v) => file.tray_notifications = v,
            SettingsUpdate::AutostartTray(v) => file.autostart_tray = v,
        }
        self.altered = true;
    }

    /// Writes the settings file if altered, or unconditionally with `force`
    ///
    /// Creates the parent directory if it does not exist.
    ///
    /// # Errors
    /// Returns `MinerError` if serialization or the write fails; the
    /// in-memory settings stay altered so a later save can retry.
    pub fn save(&mut self, force: bool) -> Result<(), MinerError> {
        if !(self.altered || force) {
            return Ok(());
        }
        let path = &self.args.settings_path;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(&self.file)?;
        std::fs::write(path, content)?;
        self.altered = false;
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<SettingsFile, MinerError> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        MinerError::ConfigError(format!(
            "Failed to read settings at {}: {}",
            path.display(),
            e
        ))
    })?;
    toml::from_str(&content)
        .map_err(|e| MinerError::ConfigError(format!("Invalid settings format: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_settings(dir: &Path) -> Settings {
        Settings::load(RuntimeArgs::in_dir(dir)).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = temp_settings(dir.path());
        assert_eq!(settings.file(), &SettingsFile::default());
        assert!(!settings.is_altered());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.toml"),
            "language = \"Deutsch\"\npriority_mode = \"ENDING_SOONEST\"\n",
        )
        .unwrap();
        let settings = temp_settings(dir.path());
        assert_eq!(settings.file().language, "Deutsch");
        assert_eq!(settings.file().priority_mode, PriorityMode::EndingSoonest);
        assert_eq!(settings.file().connection_quality, 1);
        assert!(settings.file().tray_notifications);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.toml"), "language = [").unwrap();
        let result = Settings::load(RuntimeArgs::in_dir(dir.path()));
        assert!(matches!(result, Err(MinerError::ConfigError(_))));
    }

    #[test]
    fn save_skips_unaltered_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = temp_settings(dir.path());
        settings.save(false).unwrap();
        assert!(!dir.path().join("settings.toml").exists());
        settings.save(true).unwrap();
        assert!(dir.path().join("settings.toml").exists());
    }

    #[test]
    fn applied_updates_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = temp_settings(dir.path());
        settings.apply(SettingsUpdate::Priority(vec!["Game A".into(), "Game B".into()]));
        settings.apply(SettingsUpdate::ConnectionQuality(3));
        assert!(settings.is_altered());
        settings.save(false).unwrap();
        assert!(!settings.is_altered());

        let reloaded = temp_settings(dir.path());
        assert_eq!(reloaded.file().priority, vec!["Game A", "Game B"]);
        assert_eq!(reloaded.file().connection_quality, 3);
    }

    #[test]
    fn field_validation_checks_types() {
        assert_eq!(
            SettingsUpdate::from_field("connection_quality", &json!(4)),
            Ok(SettingsUpdate::ConnectionQuality(4))
        );
        assert!(SettingsUpdate::from_field("connection_quality", &json!("high")).is_err());
        assert!(SettingsUpdate::from_field("tray_notifications", &json!(1)).is_err());
        assert!(SettingsUpdate::from_field("priority", &json!(["a", 2])).is_err());
        assert!(SettingsUpdate::from_field("priority_mode", &json!("FASTEST")).is_err());
        assert!(SettingsUpdate::from_field("proxy", &json!("not a url")).is_err());
        assert!(SettingsUpdate::from_field("dark_mode", &json!(true)).is_err());
        assert_eq!(
            SettingsUpdate::from_field("exclude", &json!(["b", "a", "b"])),
            Ok(SettingsUpdate::Exclude(
                ["a".to_string(), "b".to_string()].into_iter().collect()
            ))
        );
        assert_eq!(
            SettingsUpdate::from_field("proxy", &json!("")),
            Ok(SettingsUpdate::Proxy(String::new()))
        );
    }

    #[test]
    fn log_options_follow_flags_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = SettingsFile::default();
        file.logging_watchdog_level = Some("warn".into());
        let mut args = RuntimeArgs::in_dir(dir.path());
        args.log = true;
        args.verbose = 1;
        let settings = Settings::new(file, args);
        let opts = settings.log_options();
        assert_eq!(opts.verbosity, 1);
        assert_eq!(opts.log_file, Some(dir.path().join("log.txt")));
        assert_eq!(opts.watchdog_level, Some(log::LevelFilter::Warn));
        assert_eq!(opts.watch_level, None);
    }
}
