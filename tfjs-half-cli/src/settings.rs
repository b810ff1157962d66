//! Layered settings for the `tfjs-half` command.
//!
//! Uses `figment`: defaults -> user config -> working-directory config ->
//! `--config` file -> `TFJS_HALF_*` environment -> command-line flags.
//! The default directories exist only here; the core crate never assumes them.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tfjs_half_core::ConverterConfig;

/// Settings file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "tfjs-half.toml";

/// Prefix for environment overrides, e.g. `TFJS_HALF_OUTPUT_DIR`.
pub const ENV_PREFIX: &str = "TFJS_HALF_";

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Source model directory.
    pub input_dir: PathBuf,
    /// Destination directory for the float16 model.
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("public/my_model"),
            output_dir: PathBuf::from("temp_quantized"),
        }
    }
}

impl Settings {
    pub fn converter_config(&self) -> ConverterConfig {
        ConverterConfig::new(&self.input_dir, &self.output_dir)
    }
}

/// Values given on the command line. `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

/// User-level settings file (`~/.config/tfjs-half/config.toml` on Linux).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "tfjs-half", "tfjs-half")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load settings from layered sources.
///
/// Priority (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables prefixed with `TFJS_HALF_`
/// 3. Explicit `config_file`
/// 4. `<working_dir>/tfjs-half.toml`
/// 5. User config
/// 6. Built-in defaults
pub fn load_settings(
    working_dir: &Path,
    config_file: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<Settings, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    let local_config = working_dir.join(LOCAL_CONFIG_FILE);
    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    // An explicit file must exist; figment treats a missing file as empty.
    if let Some(path) = config_file {
        if !path.exists() {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            ))));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    figment = figment.merge(Serialized::defaults(overrides));

    figment.extract().map_err(Box::new)
}
