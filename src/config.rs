//! YAML configuration: named color schemes and display loops.
//!
//! ```yaml
//! schemes:
//!   sunset: ["0:30@orange", "30:60@purple"]
//!   off: ["-"]
//! loops:
//!   evening: ["sunset@10m", "off@1h", "break"]
//! ```

use crate::display::{Display, DisplayError};
use crate::loops::LoopStep;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SYSTEM_CONFIG: &str = "/etc/wledctl.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config i/o: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Scheme name to its range specs, one color stage each.
    #[serde(default)]
    pub schemes: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub loops: BTreeMap<String, Vec<LoopStep>>,
}

impl Config {
    /// Load from `path` (`~` expands to the home directory). A missing or
    /// empty file is an empty config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = expand_user(path.as_ref());

        let nonempty = fs::metadata(&path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);

        if !nonempty {
            tracing::debug!(path = %path.display(), "no config file, using empty config");
            return Ok(Self::default());
        }

        let data = fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    /// Write to `path`, creating its directory (owner-only) if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = expand_user(path.as_ref());

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.is_dir() {
                create_private_dir(dir)?;
            }
        }

        fs::write(&path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// The range specs of a scheme; empty when unknown.
    pub fn scheme(&self, name: &str) -> &[String] {
        self.schemes.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Load each named scheme into the display's transition effect, then
    /// flush once. Later schemes replace earlier ones.
    pub fn apply_schemes<W: Write>(
        &self,
        display: &mut Display<W>,
        schemes: &[String],
        effect: &str,
    ) -> Result<(), ConfigError> {
        for name in schemes {
            let specs = self.scheme(name);

            if specs.is_empty() {
                tracing::warn!(scheme = %name, "unknown or empty scheme, skipping");
                continue;
            }

            display.set_transition_effect(effect, specs)?;
        }

        display.flush()?;
        Ok(())
    }
}

/// `<config dir>/wledctl/wledctl.yaml`, or `/etc/wledctl.yaml` when the
/// platform has no per-user config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("wledctl").join("wledctl.yaml"))
        .unwrap_or_else(|| PathBuf::from(SYSTEM_CONFIG))
}

fn expand_user(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::display::DisplayOptions;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sample() -> Config {
        let mut config = Config::default();
        config
            .schemes
            .insert("warm".into(), vec!["0:2@orange".into(), "red".into()]);
        config.schemes.insert("blue".into(), vec!["#0000ff".into()]);
        config.loops.insert(
            "cycle".into(),
            vec![LoopStep::from("warm@1s"), LoopStep::from("break")],
        );
        config
    }

    #[test]
    fn missing_file_is_empty_config() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn empty_file_is_empty_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "").unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn save_then_load_preserves_everything() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("wledctl.yaml");

        sample().save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), sample());
    }

    #[cfg(unix)]
    #[test]
    fn save_creates_private_directory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let nested = dir.path().join("conf");
        sample().save(nested.join("wledctl.yaml")).unwrap();

        let mode = fs::metadata(&nested).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn parses_yaml() {
        let yaml = "schemes:\n  night: ['0:10@-', '*@#110000']\nloops:\n  l: ['night@5s']\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.scheme("night"), &["0:10@-", "*@#110000"]);
        assert_eq!(config.loops["l"], vec![LoopStep::from("night@5s")]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "schemes: {}\ncolours: {}\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn unknown_scheme_is_empty() {
        assert!(sample().scheme("missing").is_empty());
    }

    #[test]
    fn apply_schemes_flushes_once_with_last_scheme() {
        let options = DisplayOptions {
            frame_interval: Duration::ZERO,
            ..DisplayOptions::default()
        };
        let mut display = Display::with_options(Vec::<u8>::new(), 2, options);

        sample()
            .apply_schemes(&mut display, &["warm".into(), "missing".into(), "blue".into()], "fill")
            .unwrap();

        assert_eq!(display.transition_args, vec!["#0000ff".to_string()]);
        assert_eq!(display.front_buffer.color_at(1), Some(Color::rgb(0, 0, 255)));
        assert_eq!(display.sink().len(), 2 + 4 * 2);
    }

    #[test]
    fn apply_schemes_reports_unknown_effect() {
        let mut display = Display::new(Vec::<u8>::new(), 2);
        let err = sample()
            .apply_schemes(&mut display, &["blue".into()], "wobble")
            .unwrap_err();

        assert!(matches!(err, ConfigError::Display(DisplayError::Effect(_))));
        assert!(display.sink().is_empty());
    }

    #[test]
    fn default_path_ends_in_config_file_name() {
        let path = default_config_path();
        assert!(path.ends_with("wledctl.yaml"));
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_user(Path::new("~/x.yaml")), home.join("x.yaml"));
        }
        assert_eq!(expand_user(Path::new("/etc/x")), PathBuf::from("/etc/x"));
    }
}
