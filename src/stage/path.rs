//! Output path naming

use crate::sourcemap::unix_style;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_OUTPUT_EXTENSION: &str = "js";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid output extension '{0}'")]
pub struct InvalidExtension(pub String);

/// Accepts `js` or `.js`; rejects empty names and path separators.
pub fn normalize_extension(extension: &str) -> Result<String, InvalidExtension> {
    let trimmed = extension.strip_prefix('.').unwrap_or(extension);
    if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
        return Err(InvalidExtension(extension.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Replace the extension of `path` with `extension`.
///
/// Paths without an extension (`myscript`, `.eslintrc`) are returned
/// unchanged so extensionless executables keep their names.
pub fn replace_extension(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some() {
        path.with_extension(extension)
    } else {
        path.to_path_buf()
    }
}

/// The `file` field for a produced source map: the renamed relative path.
pub fn map_file_name(relative: &Path, extension: &str) -> String {
    unix_style(&replace_extension(relative, extension).to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_replaced() {
        assert_eq!(
            replace_extension(Path::new("foo.jsx"), "js"),
            PathBuf::from("foo.js")
        );
        assert_eq!(
            replace_extension(Path::new("/repo/src/app.min.ts"), "js"),
            PathBuf::from("/repo/src/app.min.js")
        );
    }

    #[test]
    fn extensionless_paths_are_untouched() {
        assert_eq!(
            replace_extension(Path::new("bin/myscript"), "js"),
            PathBuf::from("bin/myscript")
        );
        assert_eq!(
            replace_extension(Path::new("config/.eslintrc"), "js"),
            PathBuf::from("config/.eslintrc")
        );
    }

    #[test]
    fn leading_dot_is_dropped() {
        assert_eq!(normalize_extension(".mjs").unwrap(), "mjs");
        assert_eq!(normalize_extension("cjs").unwrap(), "cjs");
    }

    #[test]
    fn empty_and_nested_extensions_are_rejected() {
        for bad in ["", ".", "a/b", "a\\b"] {
            assert_eq!(
                normalize_extension(bad),
                Err(InvalidExtension(bad.to_string()))
            );
        }
    }

    #[test]
    fn map_file_name_uses_forward_slashes() {
        assert_eq!(map_file_name(Path::new("lib/app.tsx"), "js"), "lib/app.js");
    }
}
