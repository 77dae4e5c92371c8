use std::fmt;
use std::path::{Path, PathBuf};
use anyhow::Result;
use crate::cache::CacheManager;
use crate::command::CommandRunner;
use crate::config::BuildpackConfig;
use crate::log::Logger;
use crate::manifest::find_cache_dirs;
use crate::util::file_exists;

/// The finalize stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Manifest,
    Probe,
    Restore,
    Install,
    Save,
}

impl Stage {
    /// Process exit code reported for a failure in this stage.
    pub fn exit_code(&self) -> u8 {
        match self {
            Stage::Manifest => 10,
            Stage::Probe => 11,
            Stage::Restore => 12,
            Stage::Install => 14,
            Stage::Save => 13,
        }
    }
}

/// A failed finalize run, tagged with the stage it failed in.
#[derive(Debug)]
pub struct FinalizeError {
    pub stage: Stage,
    pub source: anyhow::Error,
}

impl fmt::Display for FinalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} failed: {:#}", self.stage, self.source)
    }
}

impl std::error::Error for FinalizeError {}

/// Drives the cache around the package-manager install of a single build.
pub struct Finalizer<'a> {
    pub build_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub config: BuildpackConfig,
    pub runner: &'a dyn CommandRunner,
    pub logger: &'a dyn Logger,
}

impl<'a> Finalizer<'a> {
    /// Restores the cache, runs `install`, then saves the cache.
    ///
    /// Every failure is logged with the stage it happened in before being
    /// returned.
    pub fn run<F>(&self, install: F) -> std::result::Result<(), FinalizeError>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        self.warn_missing_package_json()
            .map_err(|e| self.fail(Stage::Manifest, "Unable to read package.json", e))?;

        let cache_dirs = find_cache_dirs(&self.build_dir)
            .map_err(|e| self.fail(Stage::Manifest, "Unable to load package.json", e))?;

        let cache = CacheManager::new(
            &self.build_dir,
            &self.cache_dir,
            cache_dirs,
            &self.config.tools,
            self.runner,
            self.logger,
        )
        .map_err(|e| self.fail(Stage::Probe, "Unable to determine tool versions", e))?;

        cache
            .restore(&self.config)
            .map_err(|e| self.fail(Stage::Restore, "Unable to restore cache", e))?;

        install(&self.build_dir)
            .map_err(|e| self.fail(Stage::Install, "Unable to install dependencies", e))?;

        cache
            .save(&self.config)
            .map_err(|e| self.fail(Stage::Save, "Unable to save cache", e))?;

        Ok(())
    }

    /// Warns when the application has no `package.json`.
    pub fn warn_missing_package_json(&self) -> Result<()> {
        if !file_exists(self.build_dir.join("package.json"))? {
            self.logger.warning("No package.json found");
        }
        Ok(())
    }

    fn fail(&self, stage: Stage, what: &str, source: anyhow::Error) -> FinalizeError {
        self.logger.error(&format!("{}: {:#}", what, source));
        FinalizeError { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::ConsoleLogger;
    use std::fs;
    use std::io::Write;
    use anyhow::bail;
    use tempfile::tempdir;

    struct Versions;

    impl CommandRunner for Versions {
        fn execute(
            &self,
            _dir: Option<&Path>,
            stdout: &mut dyn Write,
            _stderr: &mut dyn Write,
            program: &str,
            _args: &[&str],
        ) -> Result<()> {
            match program {
                "node" => stdout.write_all(b"1.1.1\n")?,
                "npm" => stdout.write_all(b"2.2.2\n")?,
                "yarn" => stdout.write_all(b"3.3.3\n")?,
                other => bail!("{} not found", other),
            }
            Ok(())
        }
    }

    fn finalizer<'a>(build: &Path, cache: &Path, logger: &'a ConsoleLogger<Vec<u8>>) -> Finalizer<'a> {
        Finalizer {
            build_dir: build.to_path_buf(),
            cache_dir: cache.to_path_buf(),
            config: BuildpackConfig::default(),
            runner: &Versions,
            logger,
        }
    }

    #[test]
    fn test_run_restores_installs_and_saves() {
        let build = tempdir().unwrap();
        let cache = tempdir().unwrap();
        fs::write(build.path().join("package.json"), r#"{"cacheDirectories": ["node_modules"]}"#).unwrap();
        fs::create_dir_all(cache.path().join("node/node_modules/left-pad")).unwrap();
        fs::write(cache.path().join("node/signature"), "1.1.1; 2.2.2; 3.3.3\n").unwrap();
        let logger = ConsoleLogger::buffer();

        finalizer(build.path(), cache.path(), &logger)
            .run(|dir| {
                assert!(dir.join("node_modules/left-pad").is_dir());
                fs::create_dir_all(dir.join("node_modules/is-odd"))?;
                Ok(())
            })
            .unwrap();

        let output = logger.output();
        assert!(output.contains("Loading 1 from cacheDirectories (package.json):"));
        assert!(output.contains("Saving 1 cacheDirectories (package.json):"));
        assert!(!output.contains("No package.json found"));
        assert!(cache.path().join("node/node_modules/left-pad").is_dir());
        assert!(cache.path().join("node/node_modules/is-odd").is_dir());
    }

    #[test]
    fn test_run_warns_without_package_json() {
        let build = tempdir().unwrap();
        let cache = tempdir().unwrap();
        let logger = ConsoleLogger::buffer();

        finalizer(build.path(), cache.path(), &logger).run(|_| Ok(())).unwrap();

        let output = logger.output();
        assert!(output.contains("**WARNING** No package.json found"));
        assert!(output.contains("Skipping cache restore (no previous cache)"));
    }

    #[test]
    fn test_probe_failure_is_reported() {
        let build = tempdir().unwrap();
        let cache = tempdir().unwrap();
        let logger = ConsoleLogger::buffer();
        let mut finalizer = finalizer(build.path(), cache.path(), &logger);
        finalizer.config.tools.yarn = "missing-yarn".to_string();

        let err = finalizer.run(|_| Ok(())).unwrap_err();

        assert_eq!(err.stage, Stage::Probe);
        assert_eq!(err.stage.exit_code(), 11);
        assert!(logger.output().contains("**ERROR** Unable to determine tool versions"));
        assert!(!cache.path().join("node").exists());
    }

    #[test]
    fn test_install_failure_skips_save() {
        let build = tempdir().unwrap();
        let cache = tempdir().unwrap();
        fs::write(build.path().join("package.json"), "{}").unwrap();
        let logger = ConsoleLogger::buffer();

        let err = finalizer(build.path(), cache.path(), &logger)
            .run(|_| bail!("npm install failed"))
            .unwrap_err();

        assert_eq!(err.stage, Stage::Install);
        assert!(logger.output().contains("Unable to install dependencies: npm install failed"));
        assert!(!logger.output().contains("Caching build"));
    }

    #[test]
    fn test_bad_manifest_is_reported() {
        let build = tempdir().unwrap();
        let cache = tempdir().unwrap();
        fs::write(build.path().join("package.json"), "{").unwrap();
        let logger = ConsoleLogger::buffer();

        let err = finalizer(build.path(), cache.path(), &logger).run(|_| Ok(())).unwrap_err();

        assert_eq!(err.stage, Stage::Manifest);
        assert_eq!(err.stage.exit_code(), 10);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let stages = [Stage::Manifest, Stage::Probe, Stage::Restore, Stage::Install, Stage::Save];
        let mut codes: Vec<u8> = stages.iter().map(|s| s.exit_code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), stages.len());
    }
}
