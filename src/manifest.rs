use std::io::ErrorKind;
use std::path::{Component, Path};
use serde::Deserialize;
use anyhow::{bail, Context, Result};
use crate::cache::SIGNATURE_FILE;
use crate::util::validate_relative;

/// The parts of an application's `package.json` the buildpack cares about.
///
/// Unknown keys are ignored.
#[derive(Deserialize, Debug, Default)]
pub struct PackageJson {
    /// Directories to cache between builds (preferred spelling).
    #[serde(rename = "cacheDirectories", default)]
    pub cache_directories: Vec<String>,
    /// Legacy spelling of `cacheDirectories`.
    #[serde(rename = "cache_directories", default)]
    pub cache_directories_legacy: Vec<String>,
}

impl PackageJson {
    /// Loads `package.json` from the build directory.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or isn't valid JSON.
    pub fn load<P: AsRef<Path>>(build_dir: P) -> Result<Option<PackageJson>> {
        let path = build_dir.as_ref().join("package.json");
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Could not read {}", path.display())),
        };
        let package = serde_json::from_str(&content)
            .with_context(|| format!("Could not parse {}", path.display()))?;
        Ok(Some(package))
    }

    /// The declared cache directories: `cacheDirectories` if non-empty,
    /// otherwise `cache_directories`, otherwise nothing.
    pub fn cache_dirs(&self) -> &[String] {
        if !self.cache_directories.is_empty() {
            &self.cache_directories
        } else {
            &self.cache_directories_legacy
        }
    }
}

/// Returns the cache directories declared in `<build_dir>/package.json`.
///
/// A missing `package.json`, or one without either key, yields an empty list,
/// which means the default directory set is used.
///
/// # Errors
/// Fails if the manifest is unreadable or malformed. Each declared directory
/// must name something below the build directory and must not shadow the
/// cache's signature file.
pub fn find_cache_dirs<P: AsRef<Path>>(build_dir: P) -> Result<Vec<String>> {
    let package = match PackageJson::load(build_dir)? {
        Some(package) => package,
        None => return Ok(Vec::new()),
    };
    let dirs = package.cache_dirs().to_vec();
    for dir in &dirs {
        validate_cache_dir(dir)
            .with_context(|| format!("Invalid cache directory in package.json: '{}'", dir))?;
    }
    Ok(dirs)
}

fn validate_cache_dir(dir: &str) -> Result<()> {
    validate_relative(dir)?;
    let first = Path::new(dir).components().find_map(|c| match c {
        Component::Normal(name) => Some(name),
        _ => None,
    });
    if first.is_some_and(|name| name == SIGNATURE_FILE) {
        bail!("'{}' is reserved for the cache signature", SIGNATURE_FILE);
    }
    Ok(())
}
