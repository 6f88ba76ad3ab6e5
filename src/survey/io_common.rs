use std::path::{Path, PathBuf};

/// The file name of a path, without its directories.
pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Resolves the path of a source relative to the directory of the configuration.
/// Absolute paths are kept as is.
pub fn resolve_source_path(root: &Path, file_path: &str) -> String {
    let p: PathBuf = root.join(file_path);
    p.as_path().display().to_string()
}

/// Guesses the provider from the extension of the input file.
pub fn provider_for_path(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xlsx") => "xlsx",
        _ => "csv",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/tmp/data/answers.csv"), "answers.csv");
        assert_eq!(simplify_file_name("answers.csv"), "answers.csv");
        assert_eq!(
            resolve_source_path(Path::new("conf"), "answers.csv"),
            Path::new("conf").join("answers.csv").display().to_string()
        );
        assert_eq!(resolve_source_path(Path::new(""), "answers.csv"), "answers.csv");
        assert_eq!(provider_for_path("a/b.XLSX"), "xlsx");
        assert_eq!(provider_for_path("a/b.csv"), "csv");
        assert_eq!(provider_for_path("b"), "csv");
    }
}
