//! Output directory bookkeeping: clearing, archiving and counting images.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::process::InterpreterType;

/// Files that survive `clear_output_dir`.
const KEEP: [&str; 3] = [".gitignore", ".gitkeep", "graph.png"];

/// Remove every regular file in `dir` except the keep-list. Subdirectories
/// (archived cycles) are left alone. A missing directory is created.
pub fn clear_output_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if KEEP.iter().any(|k| name == *k) {
            continue;
        }
        fs::remove_file(entry.path())?;
    }
    Ok(())
}

/// Whether `file` sits directly in `dir`, where `clear_output_dir` would delete it.
pub fn holds_file(dir: &Path, file: &Path) -> bool {
    let (Ok(dir), Ok(file)) = (dir.canonicalize(), file.canonicalize()) else {
        return false;
    };
    file.parent() == Some(dir.as_path())
}

/// Copy all PNGs of the current cycle into `code_generation_#<cycle>`.
pub fn archive_images(dir: &Path, cycle: usize) -> io::Result<usize> {
    let target = dir.join(format!("code_generation_#{}", cycle));
    let mut copied = 0;
    for path in pngs(dir)? {
        if path.file_name().map_or(false, |n| n == "graph.png") {
            continue;
        }
        fs::create_dir_all(&target)?;
        if let Some(name) = path.file_name() {
            fs::copy(&path, target.join(name))?;
            copied += 1;
        }
    }
    debug!(cycle, copied, "archived images");
    Ok(copied)
}

/// Number of `<goal_index>_*.png` files in `dir`.
pub fn count_images(dir: &Path, goal_index: usize) -> usize {
    let prefix = format!("{}_", goal_index);
    pngs(dir)
        .map(|paths| {
            paths
                .iter()
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
                .filter(|n| n.starts_with(&prefix))
                .count()
        })
        .unwrap_or(0)
}

pub fn script_path(dir: &Path, goal_index: usize, language: InterpreterType) -> PathBuf {
    dir.join(format!("{}_visualization.{}", goal_index, language.extension()))
}

fn pngs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("png"));
        if path.is_file() && is_png {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
