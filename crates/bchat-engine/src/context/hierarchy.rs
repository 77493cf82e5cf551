use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// File name looked for at every level of the hierarchy.
pub const DOCUMENT_NAME: &str = "CLAUDE.md";

/// Imports nested deeper than this contribute nothing.
const MAX_IMPORT_DEPTH: u32 = 5;

/// Separator between hierarchy layers in the assembled document.
const LAYER_SEPARATOR: &str = "\n---\n";

/// Assembles project instruction documents from a directory hierarchy.
///
/// Layers are ordered outermost first: ancestor directories, then the start
/// directory, then the per-user file, then the system file. `@path` lines
/// inside any layer are expanded recursively, relative to the file that
/// contains them.
pub struct HierarchyResolver {
    user_path: PathBuf,
    system_path: PathBuf,
}

impl Default for HierarchyResolver {
    fn default() -> Self {
        let user_path = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(".claude")
            .join(DOCUMENT_NAME);
        let system_path = if cfg!(target_os = "macos") {
            PathBuf::from("/Library/Application Support/ClaudeCode").join(DOCUMENT_NAME)
        } else {
            PathBuf::from("/etc/claude").join(DOCUMENT_NAME)
        };
        Self {
            user_path,
            system_path,
        }
    }
}

impl HierarchyResolver {
    /// Override the user and system layer locations. Used by tests.
    pub fn with_paths(user_path: impl Into<PathBuf>, system_path: impl Into<PathBuf>) -> Self {
        Self {
            user_path: user_path.into(),
            system_path: system_path.into(),
        }
    }

    pub fn resolve(&self, start_dir: &Path) -> String {
        let mut project_paths = Vec::new();
        let mut current = start_dir;
        loop {
            let candidate = current.join(DOCUMENT_NAME);
            if candidate.is_file() {
                project_paths.push(candidate);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        // Walk collects innermost first; layers are emitted outermost first.
        project_paths.reverse();
        project_paths.push(self.user_path.clone());
        project_paths.push(self.system_path.clone());

        let layers: Vec<String> = project_paths
            .iter()
            .filter(|p| p.is_file())
            .map(|p| resolve_file(p, 0))
            .collect();

        debug!(layers = layers.len(), "assembled instruction hierarchy");
        layers.join(LAYER_SEPARATOR)
    }
}

/// Read one document and expand its `@path` import lines. A file reached
/// beyond the depth cap contributes an empty string.
fn resolve_file(path: &Path, depth: u32) -> String {
    if depth > MAX_IMPORT_DEPTH {
        warn!(path = %path.display(), "import depth cap reached, dropping content");
        return String::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable instruction document");
            return String::new();
        }
    };

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut out: Vec<String> = Vec::new();
    for line in content.lines() {
        let Some(target) = import_target(line) else {
            out.push(line.to_string());
            continue;
        };

        let import_path = base.join(target);
        if import_path.is_file() {
            let imported = resolve_file(&import_path, depth + 1);
            out.push(format!(
                "--- Imported content from {target} ---\n{imported}\n--- End of import ---"
            ));
        } else {
            warn!(target, from = %path.display(), "import target not found, dropping line");
        }
    }
    out.join("\n")
}

/// An import line starts with `@` immediately followed by a path; anything
/// after the first whitespace run is ignored.
fn import_target(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('@')?;
    let target = rest.split_whitespace().next()?;
    if target.is_empty() {
        None
    } else {
        Some(target)
    }
}
