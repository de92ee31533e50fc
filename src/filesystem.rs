//! Filesystem helpers used while installing.

use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use walkdir::WalkDir;

/// Copy the contents of `src` into `dst`, like `cp -a src/. dst`.
///
/// Existing files in `dst` are overwritten, other files are left alone.
/// Symlinks are recreated rather than followed.
pub fn copy_dir_contents(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        bail!("source directory not found: {}", src.display());
    }
    fs::create_dir_all(dst)
        .with_context(|| format!("Failed to create directory: {}", dst.display()))?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk: {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("'{}' escaped '{}'", entry.path().display(), src.display()))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target.display()))?;
            continue;
        }

        if target.is_symlink() {
            fs::remove_file(&target)
                .with_context(|| format!("Failed to replace: {}", target.display()))?;
        }

        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            if target.exists() {
                fs::remove_file(&target)
                    .with_context(|| format!("Failed to replace: {}", target.display()))?;
            }
            std::os::unix::fs::symlink(&link, &target)
                .with_context(|| format!("Failed to create symlink: {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy file: {}", entry.path().display()))?;
        }
    }

    Ok(())
}

/// Copy a single file into a directory, keeping its name.
pub fn copy_into_dir(file: &Path, dir: &Path) -> Result<()> {
    let name = file
        .file_name()
        .with_context(|| format!("no file name in '{}'", file.display()))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let dest = dir.join(name);
    fs::copy(file, &dest).with_context(|| {
        format!(
            "Failed to copy '{}' to '{}'",
            file.display(),
            dest.display()
        )
    })?;
    Ok(())
}

/// Write a file and set its permission bits.
pub fn write_file_mode(path: &Path, contents: &str, mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write: {}", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("setting permissions '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_nested_contents_and_symlinks() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("out/libffi-wasm/lib");
        fs::create_dir_all(src.join("pkgconfig")).unwrap();
        fs::write(src.join("libffi.a"), "archive").unwrap();
        fs::write(src.join("pkgconfig/libffi.pc"), "pc").unwrap();
        std::os::unix::fs::symlink("libffi.a", src.join("libffi.so")).unwrap();

        let dst = temp.path().join("sysroot/lib/wasm32-wasi");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("libc.a"), "libc").unwrap();

        copy_dir_contents(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("libffi.a")).unwrap(), "archive");
        assert!(dst.join("pkgconfig/libffi.pc").is_file());
        assert!(dst.join("libffi.so").is_symlink());
        assert!(dst.join("libc.a").is_file(), "existing files must survive");
    }

    #[test]
    fn copying_twice_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        std::os::unix::fs::symlink("target", src.join("link")).unwrap();
        fs::write(src.join("ffi.h"), "v1").unwrap();

        copy_dir_contents(&src, &dst).unwrap();
        fs::write(src.join("ffi.h"), "v2").unwrap();
        copy_dir_contents(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("ffi.h")).unwrap(), "v2");
        assert!(dst.join("link").is_symlink());
    }

    #[test]
    fn missing_source_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(copy_dir_contents(&temp.path().join("nope"), temp.path()).is_err());
    }

    #[test]
    fn writes_executable_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bin/tool");
        write_file_mode(&path, "#!/bin/sh\n", 0o755).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn copy_into_dir_keeps_name() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("wasm-opt");
        fs::write(&file, "bin").unwrap();
        copy_into_dir(&file, &temp.path().join("sdk/bin")).unwrap();
        assert!(temp.path().join("sdk/bin/wasm-opt").is_file());
    }
}
