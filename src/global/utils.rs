use std::path::PathBuf;
use anyhow::{anyhow, Result};
use directories::ProjectDirs;

pub const CONFIG_FILE_NAME: &str = "nodepack.toml";

/// Default cache root when none is given on the command line.
pub fn get_global_cache_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.cache_dir().to_path_buf())
}

pub fn get_global_config_file() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "nodepack", "nodepack")
        .ok_or_else(|| anyhow!("Could not get project directories"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_config_dir() {
        let dirs = project_dirs().unwrap();
        let file = get_global_config_file().unwrap();
        assert!(file.ends_with(CONFIG_FILE_NAME));
        assert_eq!(file.parent().unwrap(), dirs.config_dir());
    }

    #[test]
    fn test_cache_dir_from_project_dirs() {
        let dirs = project_dirs().unwrap();
        assert_eq!(get_global_cache_dir().unwrap(), dirs.cache_dir());
    }
}
