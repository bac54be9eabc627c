//! Configuration – reads/writes `~/.roverlink/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use roverlink_codec::Framing;
use roverlink_types::RoverError;

/// Persisted user configuration stored in `~/.roverlink/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Page or socket URL of the robot. HTTP URLs are rewritten to the
    /// robot's `/ws` endpoint; `ws://` URLs are taken as given.
    #[serde(default = "default_robot_url")]
    pub robot_url: String,

    /// Wire framing for this link. Both ends must agree.
    #[serde(default)]
    pub framing: Framing,

    /// Forward-range polling interval in milliseconds.
    #[serde(default = "default_range_poll_ms")]
    pub range_poll_ms: u64,

    /// Proximity cutoff in centimeters for the safety interlock.
    #[serde(default = "default_cutoff_cm")]
    pub proximity_cutoff_cm: f64,

    /// Terminal verbosity: below 2, drivetrain and range chatter is
    /// hidden.
    #[serde(default = "default_log_level")]
    pub log_level: u8,
}

fn default_robot_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_range_poll_ms() -> u64 {
    2000
}
fn default_cutoff_cm() -> f64 {
    roverlink_client::DEFAULT_PROXIMITY_CUTOFF_CM
}
fn default_log_level() -> u8 {
    4
}

impl Default for Config {
    fn default() -> Self {
        Config {
            robot_url: default_robot_url(),
            framing: Framing::default(),
            range_poll_ms: default_range_poll_ms(),
            proximity_cutoff_cm: default_cutoff_cm(),
            log_level: default_log_level(),
        }
    }
}

/// Return the path to `~/.roverlink/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".roverlink").join("config.toml")
}

/// Load the config from disk with `ROVERLINK_*` overrides applied.
/// Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, RoverError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Load the config from a specific path, without env overrides.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, RoverError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| RoverError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| RoverError::Config(format!("failed to parse config: {}", e)))?;
    Ok(Some(cfg))
}

/// Apply `ROVERLINK_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVERLINK_URL` | `robot_url` |
/// | `ROVERLINK_FRAMING` | `framing` (`pipe` / `json`) |
/// | `ROVERLINK_RANGE_POLL_MS` | `range_poll_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROVERLINK_URL") {
        cfg.robot_url = v;
    }
    if let Ok(v) = std::env::var("ROVERLINK_FRAMING") {
        match v.to_lowercase().as_str() {
            "pipe" => cfg.framing = Framing::Pipe,
            "json" => cfg.framing = Framing::Json,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("ROVERLINK_RANGE_POLL_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.range_poll_ms = ms;
    }
}

/// Save the config to disk, creating `~/.roverlink/` if necessary.
pub fn save(cfg: &Config) -> Result<(), RoverError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), RoverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RoverError::Config(format!("failed to create config directory: {}", e)))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| RoverError::Config(format!("failed to set directory permissions: {}", e)))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RoverError::Config(format!("failed to serialize config: {}", e)))?;
    fs::write(path, raw)
        .map_err(|e| RoverError::Config(format!("failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.framing, Framing::Json);
        assert_eq!(loaded.range_poll_ms, 2000);
    }

    #[test]
    fn config_path_points_to_roverlink_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".roverlink"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "robot_url = \"http://rover.local\"\n").unwrap();

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.robot_url, "http://rover.local");
        assert_eq!(cfg.framing, Framing::Json);
        assert_eq!(cfg.proximity_cutoff_cm, 10.0);
    }

    #[test]
    fn apply_env_overrides_changes_url() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVERLINK_URL", "http://rover-two.local") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.robot_url, "http://rover-two.local");
        unsafe { std::env::remove_var("ROVERLINK_URL") };
    }

    #[test]
    fn apply_env_overrides_changes_framing() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVERLINK_FRAMING", "pipe") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.framing, Framing::Pipe);
        unsafe { std::env::remove_var("ROVERLINK_FRAMING") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_poll_interval() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVERLINK_RANGE_POLL_MS", "soon") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.range_poll_ms, 2000);
        unsafe { std::env::remove_var("ROVERLINK_RANGE_POLL_MS") };
    }

    #[cfg(unix)]
    #[test]
    fn config_directory_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        let dir_mode = dir_meta.permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700, "config directory must have 0o700 permissions");
    }
}
