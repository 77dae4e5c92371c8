use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

/// Checks whether `path` exists without following a trailing symlink.
///
/// A dangling symlink counts as present: whatever the application put in the
/// build directory, even a broken link, is never replaced from the cache.
/// Unlike [`Path::exists`], only a "not found" error maps to `false`;
/// anything else (e.g. permission denied) is returned to the caller.
pub fn file_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Could not stat {}", path.display())),
    }
}

/// Creates the parent directory of `path` (and all of its ancestors).
pub fn ensure_parent<P: AsRef<Path>>(path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Recursively copies `src` into `dest`.
///
/// Directories are merged into an existing `dest`, regular files are
/// overwritten and symlinks are recreated rather than followed.
/// A plain file `src` is copied to `dest` as-is.
pub fn copy_path<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("Could not walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = if rel.as_os_str().is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(rel)
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Could not create directory {}", target.display()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            ensure_parent(&target)?;
            std::fs::copy(entry.path(), &target).with_context(|| {
                format!("Could not copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let link = std::fs::read_link(src)?;
    ensure_parent(dest)?;
    if file_exists(dest)? {
        remove_path(dest)?;
    }
    std::os::unix::fs::symlink(&link, dest)
        .with_context(|| format!("Could not create symlink {}", dest.display()))?;
    Ok(())
}

#[cfg(windows)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    ensure_parent(dest)?;
    std::fs::copy(src, dest)
        .with_context(|| format!("Could not copy {} to {}", src.display(), dest.display()))?;
    Ok(())
}

/// Moves `src` to `dest`, creating the parents of `dest` first.
///
/// Uses a rename; when the two paths live on different filesystems the
/// tree is copied and the source removed instead.
pub fn move_path<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();
    ensure_parent(dest)?;
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            copy_path(src, dest)?;
            remove_path(src)
        }
        Err(e) => Err(e)
            .with_context(|| format!("Could not move {} to {}", src.display(), dest.display())),
    }
}

/// Removes a file, symlink or directory tree. A missing path is not an error.
pub fn remove_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("Could not stat {}", path.display())),
    };
    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.with_context(|| format!("Could not remove {}", path.display()))
}

/// Removes everything inside `dir`, keeping `dir` itself. Creates `dir` if needed.
pub fn clear_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    if !file_exists(dir)? {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Could not create directory {}", dir.display()))?;
        return Ok(());
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Could not read directory {}", dir.display()))?;
    for entry in entries {
        remove_path(entry?.path())?;
    }
    Ok(())
}

/// Ensures `rel` is a relative path that stays below whatever it gets joined onto.
pub fn validate_relative(rel: &str) -> Result<()> {
    let path = Path::new(rel);
    if rel.trim().is_empty() {
        bail!("Empty path");
    }
    let mut named = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => named += 1,
            Component::CurDir => {}
            Component::ParentDir => bail!("Path '{}' must not contain '..'", rel),
            Component::RootDir | Component::Prefix(_) => {
                bail!("Path '{}' must be relative", rel)
            }
        }
    }
    if named == 0 {
        bail!("Path '{}' must name a directory below the root", rel);
    }
    Ok(())
}

/// Resolves `path` to an absolute path with symlinks and `..` removed.
///
/// The path doesn't have to exist: the longest existing ancestor is
/// canonicalized and the remaining components are appended to it.
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(resolved) => {
                let mut resolved = resolved;
                for name in rest.iter().rev() {
                    resolved.push(name);
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        rest.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Ok(absolute),
                }
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Could not resolve {}", path.display()));
            }
        }
    }
}

/// True when one of the two paths is the other or lies inside it.
pub fn paths_overlap<P: AsRef<Path>, Q: AsRef<Path>>(a: P, b: Q) -> Result<bool> {
    let a = resolve_path(a)?;
    let b = resolve_path(b)?;
    Ok(a.starts_with(&b) || b.starts_with(&a))
}
