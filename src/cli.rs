use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    /// Path to a `nodepack.toml`. Defaults to the per-user config file, if any
    #[clap(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: NodepackCommand,
}

#[derive(Debug, Args, Clone, PartialEq)]
pub struct BuildDirs {
    /// The application directory being built
    #[clap(long)]
    pub build_dir: PathBuf,
    /// The persistent cache root. Defaults to the per-user cache directory
    #[clap(long)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum NodepackCommand {
    /// Moves cached dependency directories into the build directory
    Restore(BuildDirs),
    /// Copies dependency directories from the build directory into the cache
    Save(BuildDirs),
    /// Restores, then saves the cache around a build
    Finalize(BuildDirs),
    /// Shows which directories would be cached, and why
    Dirs {
        #[clap(long)]
        build_dir: PathBuf,
    },
    /// Probes the tools and prints the cache signature
    Signature,
    /// Writes a config file with the default settings
    InitConfig {
        /// Where to write it. Defaults to the per-user config file
        #[clap(long)]
        path: Option<PathBuf>,
    },
}
