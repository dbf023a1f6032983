use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

/// Every file under `repo_root` whose extension is in `extensions`, in
/// traversal order: directory entries sorted by name, depth first.
pub fn scan_sources(
    repo_root: &Path,
    extensions: &[String],
    ignore_dirs: &[String],
    options: ScanOptions,
) -> Vec<ScannedFile> {
    walk(repo_root, ignore_dirs, options, |path, _rel| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|candidate| candidate == ext))
    })
}

/// Every file under `repo_root` matched by the gitignore-style glob `pattern`.
pub fn expand_pattern(
    repo_root: &Path,
    pattern: &str,
    ignore_dirs: &[String],
    options: ScanOptions,
) -> Result<Vec<ScannedFile>, ignore::Error> {
    let matcher = pattern_matcher(repo_root, pattern)?;
    Ok(walk(repo_root, ignore_dirs, options, |_path, rel| {
        matcher.matched(rel, false).is_whitelist()
    }))
}

fn pattern_matcher(repo_root: &Path, pattern: &str) -> Result<Override, ignore::Error> {
    let mut builder = OverrideBuilder::new(repo_root);
    builder.add(pattern.trim())?;
    builder.build()
}

fn walk<F>(repo_root: &Path, ignore_dirs: &[String], options: ScanOptions, keep: F) -> Vec<ScannedFile>
where
    F: Fn(&Path, &str) -> bool,
{
    let mut files = Vec::new();
    let mut builder = WalkBuilder::new(repo_root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .parents(false)
            .require_git(false);
    }
    let ignore_dirs: Vec<String> = ignore_dirs.to_vec();
    let walker = builder
        .hidden(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| !is_ignored_dir(entry, &ignore_dirs))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("walk error: {err}");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let rel_path = match crate::util::normalize_rel_path(repo_root, path) {
            Ok(value) => value,
            Err(_) => continue,
        };
        if !keep(path, &rel_path) {
            continue;
        }
        files.push(ScannedFile {
            rel_path,
            abs_path: path.to_path_buf(),
        });
    }
    files
}

fn is_ignored_dir(entry: &ignore::DirEntry, ignore_dirs: &[String]) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
        return false;
    }
    let name = entry.file_name();
    ignore_dirs.iter().any(|dir| name == OsStr::new(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn rel_paths(files: &[ScannedFile]) -> Vec<&str> {
        files.iter().map(|file| file.rel_path.as_str()).collect()
    }

    #[test]
    fn scan_orders_by_name_and_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "b.py", "");
        write(root, "a.py", "");
        write(root, "pkg/z.py", "");
        write(root, "notes.txt", "");
        write(root, ".venv/lib/site.py", "");
        write(root, "venv/lib/site.py", "");

        let ignore_dirs = vec!["venv".to_string(), ".venv".to_string()];
        let files = scan_sources(root, &["py".to_string()], &ignore_dirs, ScanOptions::default());
        assert_eq!(rel_paths(&files), vec!["a.py", "b.py", "pkg/z.py"]);
    }

    #[test]
    fn expand_pattern_matches_nested_tests() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "test_top.py", "");
        write(root, "app/main.py", "");
        write(root, "app/tests/test_main.py", "");

        let files = expand_pattern(root, "**/test*.py", &[], ScanOptions::default()).unwrap();
        assert_eq!(rel_paths(&files), vec!["app/tests/test_main.py", "test_top.py"]);
    }

    #[test]
    fn gitignore_is_respected_unless_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, ".gitignore", "generated.py\n");
        write(root, "generated.py", "");
        write(root, "kept.py", "");

        let exts = ["py".to_string()];
        let files = scan_sources(root, &exts, &[], ScanOptions::default());
        assert_eq!(rel_paths(&files), vec!["kept.py"]);

        let files = scan_sources(root, &exts, &[], ScanOptions::new(true));
        assert_eq!(rel_paths(&files), vec!["generated.py", "kept.py"]);
    }
}
