use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};

/// Environment variable that turns the node cache off when set to `false`.
pub const CACHE_TOGGLE_ENV: &str = "NODE_MODULES_CACHE";

/// Buildpack configuration, usually read from `nodepack.toml`.
///
/// ```toml
/// [cache]
/// disabled = false
///
/// [tools]
/// node = "node"
/// npm = "npm"
/// yarn = "yarn"
/// ```
///
/// Every key is optional. The value is built once by the caller and then
/// handed to the cache operations, which never look at the environment
/// themselves.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct BuildpackConfig {
    pub cache: CacheSettings,
    pub tools: ToolNames,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CacheSettings {
    /// Skip both restoring and saving the cache.
    pub disabled: bool,
}

/// Binaries probed with `--version` to build the cache signature.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ToolNames {
    pub node: String,
    pub npm: String,
    pub yarn: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            node: "node".to_string(),
            npm: "npm".to_string(),
            yarn: "yarn".to_string(),
        }
    }
}

impl BuildpackConfig {
    /// Loads a config from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or deserialized.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<BuildpackConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Loads `path` when it exists, otherwise returns the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<BuildpackConfig> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(BuildpackConfig::default())
        }
    }

    /// Saves the config to the given path in pretty TOML format.
    ///
    /// # Errors
    /// Returns an error if the file can't be written or serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)?;
        crate::util::ensure_parent(&path)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Applies the `NODE_MODULES_CACHE` toggle from the process environment.
    pub fn apply_env(self) -> Self {
        let toggle = std::env::var(CACHE_TOGGLE_ENV).ok();
        self.apply_toggle(toggle.as_deref())
    }

    /// Applies a `NODE_MODULES_CACHE` value. Only the literal `false`
    /// disables the cache; any other value leaves the config as it was.
    pub fn apply_toggle(mut self, value: Option<&str>) -> Self {
        if value == Some("false") {
            self.cache.disabled = true;
        }
        self
    }
}
