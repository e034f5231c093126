use std::path::MAIN_SEPARATOR;

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Converts a source file path into a dotted Python module name.
///
/// `root` is removed only when it is a literal prefix of `file`; no
/// normalization of `..`, symlinks or case happens. Empty segments are
/// dropped, so a leading separator never yields a leading dot.
///
/// ```
/// use pydocgen::file_to_module;
///
/// assert_eq!(file_to_module("/a/b/pkg/sub/mod.py", "/a/b/"), "pkg.sub.mod");
/// ```
pub fn file_to_module(file: &str, root: &str) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let relative = relative.strip_suffix(".py").unwrap_or(relative);

    relative
        .split(is_separator)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}
