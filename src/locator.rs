//! Resolve a class's declared source file to a real file under the report's
//! declared source roots.

use std::path::{Component, Path, PathBuf};

use crate::model::DEFAULT_NAME;

/// A source file found on disk for one `<sourcefile>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSource {
    pub absolute: PathBuf,
    /// Path relative to the project base directory, `/`-separated.
    pub relative_path: String,
    /// Source-root prefix + package path + file name; the display and
    /// payload key for the file.
    pub flattened_path: String,
}

/// `com.example` -> `com/example/`; the default package maps to an empty path.
pub fn package_path(package_name: &str) -> String {
    if package_name.is_empty() || package_name == DEFAULT_NAME {
        String::new()
    } else {
        format!("{}/", package_name.replace('.', "/"))
    }
}

/// First `root/package_path/file_name` that exists as a file, trying the
/// roots in declaration order. Roots are resolved against `project_dir`.
pub fn locate_source_file(
    project_dir: &Path,
    source_roots: &[String],
    package_path: &str,
    file_name: &str,
) -> Option<PathBuf> {
    if file_name.is_empty() {
        return None;
    }
    source_roots.iter().find_map(|root| {
        let candidate = project_dir.join(root).join(format!("{package_path}{file_name}"));
        candidate.is_file().then_some(candidate)
    })
}

/// Locate a source file and compute its project-relative and flattened paths.
pub fn resolve_source_file(
    project_dir: &Path,
    source_roots: &[String],
    package_name: &str,
    file_name: &str,
) -> Option<LocatedSource> {
    let package_path = package_path(package_name);
    let absolute = locate_source_file(project_dir, source_roots, &package_path, file_name)?;
    let relative_path = relative_slash_path(&absolute, project_dir);
    let flattened_path = flattened_path(&relative_path, &package_path, file_name);
    Some(LocatedSource {
        absolute,
        relative_path,
        flattened_path,
    })
}

/// `path` relative to `base` with `/` separators. Paths outside `base` are
/// returned whole.
pub fn relative_slash_path(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::RootDir => parts.push(String::new()),
            Component::Prefix(prefix) => parts.push(prefix.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}

/// Everything before the first occurrence of the package path, followed by
/// the package path and file name. For the default package the prefix is
/// the file's directory.
pub fn flattened_path(relative_path: &str, package_path: &str, file_name: &str) -> String {
    let prefix = if !package_path.is_empty() {
        match relative_path.find(package_path) {
            Some(idx) => &relative_path[..idx],
            None => directory_prefix(relative_path),
        }
    } else {
        directory_prefix(relative_path)
    };
    format!("{prefix}{package_path}{file_name}")
}

fn directory_prefix(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}
