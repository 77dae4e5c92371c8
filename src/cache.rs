//! Signature-gated build cache.
//!
//! Layout of the cache root:
//!
//! ```text
//! <cache_dir>/
//! └── node/
//!     ├── signature          # "<node>; <npm>; <yarn>\n"
//!     ├── .npm/              # one mirrored copy per cached directory
//!     ├── .cache/yarn/
//!     └── bower_components/
//! ```
//!
//! [`CacheManager::restore`] *moves* entries into the build directory and
//! [`CacheManager::save`] *copies* them back, so a cache entry is consumed by
//! the restore that uses it.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use crate::command::{probe_version, CommandRunner};
use crate::config::{BuildpackConfig, ToolNames};
use crate::log::Logger;
use crate::util::{clear_dir, copy_path, file_exists, move_path, paths_overlap, remove_path};

/// Directories cached when `package.json` doesn't declare any.
pub const DEFAULT_CACHE_DIRS: [&str; 3] = [".npm", ".cache/yarn", "bower_components"];

/// Package-manager caches that never ship with the built application.
const TRANSIENT_DIRS: [&str; 2] = [".npm", ".cache/yarn"];

const NODE_SUBDIR: &str = "node";
/// Name of the signature file inside `<cache_dir>/node`.
pub const SIGNATURE_FILE: &str = "signature";

/// Where the active cache directory set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDirSource {
    PackageJson,
    Default,
}

impl CacheDirSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheDirSource::PackageJson => "package.json",
            CacheDirSource::Default => "default",
        }
    }
}

impl fmt::Display for CacheDirSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versions of the tools whose output ends up in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersions {
    pub node: String,
    pub npm: String,
    pub yarn: String,
}

impl ToolVersions {
    /// Probes every tool with `--version`. The first failure is returned.
    pub fn probe(runner: &dyn CommandRunner, tools: &ToolNames) -> Result<ToolVersions> {
        Ok(ToolVersions {
            node: probe_version(runner, &tools.node)?,
            npm: probe_version(runner, &tools.npm)?,
            yarn: probe_version(runner, &tools.yarn)?,
        })
    }

    /// The cache signature, e.g. `6.9.3; 4.5.6; 9.8.7`.
    pub fn signature(&self) -> String {
        format!("{}; {}; {}", self.node, self.npm, self.yarn)
    }
}

/// The directories declared in `package.json`, or the defaults when
/// there are none.
pub fn select_cache_dirs(configured: &[String]) -> (CacheDirSource, Vec<String>) {
    if !configured.is_empty() {
        (CacheDirSource::PackageJson, configured.to_vec())
    } else {
        (
            CacheDirSource::Default,
            DEFAULT_CACHE_DIRS.iter().map(|d| d.to_string()).collect(),
        )
    }
}

/// Moves dependency directories between the persistent cache and the build
/// directory. One manager serves a single build.
pub struct CacheManager<'a> {
    build_dir: PathBuf,
    cache_dir: PathBuf,
    versions: ToolVersions,
    configured_dirs: Vec<String>,
    logger: &'a dyn Logger,
}

impl<'a> CacheManager<'a> {
    /// Creates a manager, probing the tool versions with `runner`.
    ///
    /// # Errors
    /// Fails if any of the tools can't report its version.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        build_dir: P,
        cache_dir: Q,
        configured_dirs: Vec<String>,
        tools: &ToolNames,
        runner: &dyn CommandRunner,
        logger: &'a dyn Logger,
    ) -> Result<Self> {
        let versions = ToolVersions::probe(runner, tools)?;
        Ok(Self::with_versions(build_dir, cache_dir, configured_dirs, versions, logger))
    }

    /// Creates a manager from versions that are already known.
    pub fn with_versions<P: Into<PathBuf>, Q: Into<PathBuf>>(
        build_dir: P,
        cache_dir: Q,
        configured_dirs: Vec<String>,
        versions: ToolVersions,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            build_dir: build_dir.into(),
            cache_dir: cache_dir.into(),
            versions,
            configured_dirs,
            logger,
        }
    }

    pub fn versions(&self) -> &ToolVersions {
        &self.versions
    }

    pub fn signature(&self) -> String {
        self.versions.signature()
    }

    /// `<cache_dir>/node`
    pub fn node_cache_dir(&self) -> PathBuf {
        self.cache_dir.join(NODE_SUBDIR)
    }

    fn signature_path(&self) -> PathBuf {
        self.node_cache_dir().join(SIGNATURE_FILE)
    }

    pub fn select_cache_dirs(&self) -> (CacheDirSource, Vec<String>) {
        select_cache_dirs(&self.configured_dirs)
    }

    /// Refuses to work on a cache root that contains, or lies inside, the
    /// build directory. Save clears the whole cache root.
    fn check_disjoint(&self) -> Result<()> {
        if paths_overlap(&self.build_dir, &self.cache_dir)? {
            bail!(
                "Cache directory {} overlaps build directory {}",
                self.cache_dir.display(),
                self.build_dir.display()
            );
        }
        Ok(())
    }

    /// Moves cached directories into the build directory.
    ///
    /// Nothing is restored when there is no previous cache, when the cache
    /// was written by different tool versions, or when caching is disabled.
    /// Directories already present in the build directory are left alone.
    ///
    /// # Errors
    /// Fails when the cache and build directories overlap. Any filesystem
    /// failure aborts the restore. Directories moved before the failure stay
    /// where they are.
    pub fn restore(&self, config: &BuildpackConfig) -> Result<()> {
        self.logger.begin_step("Restoring cache");
        self.check_disjoint()?;

        let signature_path = self.signature_path();
        let previous = match std::fs::read_to_string(&signature_path) {
            Ok(previous) => previous,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.logger.info("Skipping cache restore (no previous cache)");
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Could not read {}", signature_path.display()));
            }
        };

        if previous.trim() != self.signature() {
            self.logger.info("Skipping cache restore (new runtime signature)");
            return Ok(());
        }

        if config.cache.disabled {
            self.logger.info("Skipping cache restore (disabled by config)");
            return Ok(());
        }

        let (source, dirs) = self.select_cache_dirs();
        self.logger
            .info(&format!("Loading {} from cacheDirectories ({}):", dirs.len(), source));

        for dir in &dirs {
            self.restore_dir(dir)?;
        }
        Ok(())
    }

    fn restore_dir(&self, dir: &str) -> Result<()> {
        let dest = self.build_dir.join(dir);
        let source = self.node_cache_dir().join(dir);

        if file_exists(&dest)? {
            self.logger.info(&format!("- {} (exists - skipping)", dir));
        } else if !file_exists(&source)? {
            self.logger.info(&format!("- {} (not cached - skipping)", dir));
        } else {
            self.logger.info(&format!("- {}", dir));
            move_path(&source, &dest)?;
        }
        Ok(())
    }

    /// Replaces the cache with copies of the selected build directories.
    ///
    /// The cache root is always cleared and the signature rewritten, even when
    /// caching is disabled. Afterwards the package managers' own caches are
    /// removed from the build directory.
    ///
    /// # Errors
    /// Fails before touching anything when the cache and build directories
    /// overlap. Any filesystem failure aborts the save; nothing is rolled back.
    pub fn save(&self, config: &BuildpackConfig) -> Result<()> {
        self.logger.begin_step("Caching build");
        self.check_disjoint()?;
        self.logger.info("Clearing previous node cache");

        clear_dir(&self.cache_dir)?;
        let node_dir = self.node_cache_dir();
        std::fs::create_dir_all(&node_dir)
            .with_context(|| format!("Could not create directory {}", node_dir.display()))?;

        let signature_path = self.signature_path();
        std::fs::write(&signature_path, format!("{}\n", self.signature()))
            .with_context(|| format!("Could not write {}", signature_path.display()))?;

        if config.cache.disabled {
            self.logger.info("Skipping cache save (disabled by config)");
            return Ok(());
        }

        let (source, dirs) = self.select_cache_dirs();
        self.logger
            .info(&format!("Saving {} cacheDirectories ({}):", dirs.len(), source));

        for dir in &dirs {
            self.save_dir(&node_dir, dir)?;
        }

        for dir in TRANSIENT_DIRS {
            remove_path(self.build_dir.join(dir))?;
        }
        Ok(())
    }

    fn save_dir(&self, node_dir: &Path, dir: &str) -> Result<()> {
        let source = self.build_dir.join(dir);
        let dest = node_dir.join(dir);

        if file_exists(&source)? {
            self.logger.info(&format!("- {}", dir));
            copy_path(&source, &dest)?;
        } else {
            self.logger.info(&format!("- {} (nothing to cache)", dir));
        }
        Ok(())
    }
}
