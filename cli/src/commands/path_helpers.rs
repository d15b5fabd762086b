use std::path::{Path, PathBuf};

use walkdir::WalkDir;

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Expand directories into the files they contain
///
/// Hidden entries are skipped, files inside directories are kept only when
/// their extension is one of `extensions`. Paths given explicitly are kept as is.
pub(crate) fn get_all_files<'a>(
    paths: &'a [PathBuf],
    extensions: &'a [&'a str],
) -> impl Iterator<Item = PathBuf> + 'a {
    paths.iter().flat_map(move |path| {
        if path.is_dir() {
            WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || e.file_name()
                            .to_str()
                            .map(|s| !s.starts_with("."))
                            .unwrap_or(false)
                })
                .filter_map(Result::ok)
                .filter(|e| e.path().is_file() && has_extension(e.path(), extensions))
                .map(|e| e.path().to_path_buf())
                .collect::<Vec<_>>()
        } else {
            // missing paths are reported by the parser
            vec![path.clone()]
        }
    })
}
