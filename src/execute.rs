use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::{bail, Result};
use nodepack::cache::{select_cache_dirs, CacheManager, ToolVersions};
use nodepack::command::SystemCommand;
use nodepack::config::BuildpackConfig;
use nodepack::finalize::{Finalizer, Stage};
use nodepack::global::utils::{get_global_cache_dir, get_global_config_file};
use nodepack::log::{ConsoleLogger, Logger};
use nodepack::manifest::find_cache_dirs;
use crate::cli::{BuildDirs, NodepackCommand, CLI};

pub fn execute(cli: CLI) -> ExitCode {
    let logger = ConsoleLogger::stdout();

    if let NodepackCommand::InitConfig { path } = &cli.command {
        return report(&logger, Stage::Manifest, execute_init_config(path.clone()));
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config.apply_env(),
        Err(e) => {
            logger.error(&format!("Unable to load config: {:#}", e));
            return ExitCode::from(Stage::Manifest.exit_code());
        }
    };

    match cli.command {
        NodepackCommand::Restore(dirs) => execute_restore(&dirs, &config, &logger),
        NodepackCommand::Save(dirs) => execute_save(&dirs, &config, &logger),
        NodepackCommand::Finalize(dirs) => execute_finalize(&dirs, config, &logger),
        NodepackCommand::Dirs { build_dir } => {
            report(&logger, Stage::Manifest, execute_dirs(&build_dir))
        }
        NodepackCommand::Signature => {
            report(&logger, Stage::Probe, execute_signature(&config))
        }
        NodepackCommand::InitConfig { .. } => unreachable!("handled above"),
    }
}

fn report(logger: &dyn Logger, stage: Stage, result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.error(&format!("{:#}", e));
            ExitCode::from(stage.exit_code())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BuildpackConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} not found", path.display());
            }
            BuildpackConfig::load(path)
        }
        None => BuildpackConfig::load_or_default(get_global_config_file()?),
    }
}

fn resolve_cache_dir(dirs: &BuildDirs) -> Result<PathBuf> {
    match &dirs.cache_dir {
        Some(dir) => Ok(dir.clone()),
        None => get_global_cache_dir(),
    }
}

/// Loads the manifest and probes the tools, logging whichever step fails.
fn build_manager<'a>(
    dirs: &BuildDirs,
    config: &BuildpackConfig,
    logger: &'a dyn Logger,
) -> std::result::Result<CacheManager<'a>, ExitCode> {
    let cache_dir = match resolve_cache_dir(dirs) {
        Ok(dir) => dir,
        Err(e) => {
            logger.error(&format!("{:#}", e));
            return Err(ExitCode::from(Stage::Manifest.exit_code()));
        }
    };
    let cache_dirs = match find_cache_dirs(&dirs.build_dir) {
        Ok(cache_dirs) => cache_dirs,
        Err(e) => {
            logger.error(&format!("Unable to load package.json: {:#}", e));
            return Err(ExitCode::from(Stage::Manifest.exit_code()));
        }
    };
    CacheManager::new(&dirs.build_dir, cache_dir, cache_dirs, &config.tools, &SystemCommand, logger)
        .map_err(|e| {
            logger.error(&format!("Unable to determine tool versions: {:#}", e));
            ExitCode::from(Stage::Probe.exit_code())
        })
}

pub fn execute_restore(dirs: &BuildDirs, config: &BuildpackConfig, logger: &dyn Logger) -> ExitCode {
    let cache = match build_manager(dirs, config, logger) {
        Ok(cache) => cache,
        Err(code) => return code,
    };
    match cache.restore(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.error(&format!("Unable to restore cache: {:#}", e));
            ExitCode::from(Stage::Restore.exit_code())
        }
    }
}

pub fn execute_save(dirs: &BuildDirs, config: &BuildpackConfig, logger: &dyn Logger) -> ExitCode {
    let cache = match build_manager(dirs, config, logger) {
        Ok(cache) => cache,
        Err(code) => return code,
    };
    match cache.save(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.error(&format!("Unable to save cache: {:#}", e));
            ExitCode::from(Stage::Save.exit_code())
        }
    }
}

pub fn execute_finalize(dirs: &BuildDirs, config: BuildpackConfig, logger: &dyn Logger) -> ExitCode {
    let cache_dir = match resolve_cache_dir(dirs) {
        Ok(dir) => dir,
        Err(e) => {
            logger.error(&format!("{:#}", e));
            return ExitCode::from(Stage::Manifest.exit_code());
        }
    };
    let finalizer = Finalizer {
        build_dir: dirs.build_dir.clone(),
        cache_dir,
        config,
        runner: &SystemCommand,
        logger,
    };
    // installs are driven by the package managers outside of this tool
    match finalizer.run(|_| Ok(())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.stage.exit_code()),
    }
}

pub fn execute_dirs(build_dir: &Path) -> Result<()> {
    let configured = find_cache_dirs(build_dir)?;
    let (source, dirs) = select_cache_dirs(&configured);
    println!("{} ({}):", dirs.len(), source);
    for dir in dirs {
        println!("- {}", dir);
    }
    Ok(())
}

pub fn execute_signature(config: &BuildpackConfig) -> Result<()> {
    let versions = ToolVersions::probe(&SystemCommand, &config.tools)?;
    println!("{}", versions.signature());
    Ok(())
}

pub fn execute_init_config(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => get_global_config_file()?,
    };
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    BuildpackConfig::default().save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
