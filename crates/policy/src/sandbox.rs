use std::path::{Component, Path, PathBuf};

/// Why a path-level check blocked a call (spec §4.4 step 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxViolation {
    PathTraversal { reason: String },
    BrokenSymlink,
    SymlinkChainTooLong,
    OutsideAllowedDirectories,
}

/// Outcome of successfully resolving a candidate path.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub attempted_path: String,
    pub resolved_path: PathBuf,
    pub was_symlink: bool,
}

/// Detects `..`, URL-encoded traversal (`%2e%2e`, doubly-encoded
/// `%252e%252e`), overlong UTF-8 encodings (`%c0%af`) and null bytes
/// (`\0`, `%00`) in the *raw* string before any normalization — spec §4.4
/// step 4's "Path-traversal detection".
pub fn detect_raw_traversal(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    if raw.contains('\0') || lower.contains("%00") {
        return Some("null byte in path".to_string());
    }
    if lower.contains("%2e%2e") || lower.contains("%252e%252e") {
        return Some("URL-encoded parent-directory segment".to_string());
    }
    if lower.contains("%c0%af") || lower.contains("%c1%9c") {
        return Some("overlong UTF-8 encoded path separator".to_string());
    }
    for component in Path::new(raw).components() {
        if matches!(component, Component::ParentDir) {
            return Some("`..` parent-directory segment".to_string());
        }
    }
    None
}

/// Normalizes a path by dropping `.` segments and collapsing repeated
/// separators, without resolving the filesystem. If this textual
/// normalization changes the string, the original was non-canonical in a
/// way that can hide traversal from a naive string scan — treat as
/// traversal (spec §4.4: "if normalization changes it, treat as
/// traversal").
pub fn normalization_changes_path(raw: &str) -> bool {
    let normalized: Vec<&str> = raw
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    let rejoined = normalized.join("/");
    let original_trimmed = raw.trim_start_matches('/').trim_end_matches('/');
    rejoined != original_trimmed
}

/// Resolves a symlink chain up to `max_hops`, returning the final target
/// and whether the original path was itself a symlink. A broken symlink
/// (target does not exist) blocks by default; exceeding `max_hops` blocks
/// as an unresolvable chain (spec §4.4 step 4 "fixed limit").
fn resolve_symlink_chain(start: &Path, max_hops: u8) -> Result<(PathBuf, bool), SandboxViolation> {
    let mut current = start.to_path_buf();
    let mut was_symlink = false;
    let mut hops = 0u8;

    loop {
        let metadata = match std::fs::symlink_metadata(&current) {
            Ok(m) => m,
            Err(_) => {
                if was_symlink {
                    return Err(SandboxViolation::BrokenSymlink);
                }
                // Target doesn't exist yet (e.g. a file about to be
                // created) and was never a symlink — not a sandbox
                // violation by itself; caller handles non-existent targets.
                return Ok((current, was_symlink));
            }
        };
        if !metadata.file_type().is_symlink() {
            return Ok((current, was_symlink));
        }
        was_symlink = true;
        hops += 1;
        if hops > max_hops {
            return Err(SandboxViolation::SymlinkChainTooLong);
        }
        let target = std::fs::read_link(&current).map_err(|_| SandboxViolation::BrokenSymlink)?;
        current = if target.is_absolute() {
            target
        } else {
            current
                .parent()
                .map(|p| p.join(&target))
                .unwrap_or(target)
        };
    }
}

/// Canonicalizes `root.join(requested)`, walking up to the nearest
/// existing ancestor when the full path does not exist yet (so a
/// not-yet-created file under an existing directory still resolves),
/// generalized from the teacher's single-root `validate_path`
/// (`tools/file_ops.rs`) to support multiple allowed directories and
/// symlink-chain validation.
fn canonicalize_candidate(root: &Path, requested: &str, max_hops: u8) -> Result<Resolved, SandboxViolation> {
    let candidate = root.join(requested.trim_start_matches('/'));

    let (resolved, was_symlink) = if candidate.exists() {
        resolve_symlink_chain(&candidate, max_hops)?
    } else {
        let mut existing_ancestor = candidate.as_path();
        let mut tail_components: Vec<Component> = Vec::new();
        loop {
            if existing_ancestor.exists() {
                break;
            }
            match existing_ancestor.file_name() {
                Some(_) => {
                    if let Some(comp) = candidate
                        .strip_prefix(existing_ancestor.parent().unwrap_or(existing_ancestor))
                        .ok()
                        .and_then(|p| p.components().next())
                    {
                        tail_components.push(comp);
                    }
                    match existing_ancestor.parent() {
                        Some(p) => existing_ancestor = p,
                        None => break,
                    }
                }
                None => break,
            }
        }
        let (canon_ancestor, _) = resolve_symlink_chain(existing_ancestor, max_hops)?;
        let mut resolved = canon_ancestor;
        if let Ok(stripped) = candidate.strip_prefix(existing_ancestor) {
            resolved = resolved.join(stripped);
        }
        (resolved, false)
    };

    Ok(Resolved {
        attempted_path: requested.to_string(),
        resolved_path: resolved,
        was_symlink,
    })
}

/// Full directory-sandbox check: traversal detection, symlink resolution,
/// and containment against the canonicalized allowed-directory list (spec
/// §4.4 step 4).
pub fn check_sandbox(
    allowed_directories: &[PathBuf],
    requested: &str,
    max_symlink_hops: u8,
) -> Result<Resolved, SandboxViolation> {
    if let Some(reason) = detect_raw_traversal(requested) {
        return Err(SandboxViolation::PathTraversal { reason });
    }
    if normalization_changes_path(requested) {
        return Err(SandboxViolation::PathTraversal {
            reason: "non-canonical path segments".to_string(),
        });
    }

    if allowed_directories.is_empty() {
        return Err(SandboxViolation::OutsideAllowedDirectories);
    }

    let mut last_err = SandboxViolation::OutsideAllowedDirectories;
    for root in allowed_directories {
        match canonicalize_candidate(root, requested, max_symlink_hops) {
            Ok(resolved) => {
                if allowed_directories
                    .iter()
                    .any(|dir| resolved.resolved_path.starts_with(dir))
                {
                    return Ok(resolved);
                }
                last_err = SandboxViolation::OutsideAllowedDirectories;
            }
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dotdot_segment() {
        assert!(detect_raw_traversal("../etc/shadow").is_some());
        assert!(detect_raw_traversal("a/../b").is_some());
        assert!(detect_raw_traversal("a/b/c").is_none());
    }

    #[test]
    fn detects_url_encoded_traversal() {
        assert!(detect_raw_traversal("%2e%2e/etc/shadow").is_some());
        assert!(detect_raw_traversal("%2E%2E/etc/shadow").is_some());
        assert!(detect_raw_traversal("%252e%252e/etc/shadow").is_some());
    }

    #[test]
    fn detects_overlong_encoding_and_null_bytes() {
        assert!(detect_raw_traversal("%c0%af etc").is_some());
        assert!(detect_raw_traversal("foo\0bar").is_some());
        assert!(detect_raw_traversal("foo%00bar").is_some());
    }

    #[test]
    fn accepts_valid_nested_path_within_allowed_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let allowed = vec![root.clone()];
        let resolved = check_sandbox(&allowed, "src/new_file.rs", 8).unwrap();
        assert!(resolved.resolved_path.starts_with(&root));
        assert!(!resolved.was_symlink);
    }

    #[test]
    fn rejects_when_no_allowed_directories_configured() {
        let err = check_sandbox(&[], "src/new_file.rs", 8);
        assert!(matches!(err, Err(SandboxViolation::OutsideAllowedDirectories)));
    }

    #[test]
    fn symlink_inside_allowed_dir_is_permitted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let target = root.join("real.txt");
        std::fs::write(&target, b"hi").unwrap();
        let link = root.join("link.txt");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &link).unwrap();
        #[cfg(unix)]
        {
            let allowed = vec![root.clone()];
            let resolved = check_sandbox(&allowed, "link.txt", 8).unwrap();
            assert!(resolved.resolved_path.starts_with(&root));
            assert!(resolved.was_symlink);
        }
    }

    #[test]
    fn symlink_escaping_allowed_dir_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let outside_root = outside.path().canonicalize().unwrap();
        let outside_target = outside_root.join("secret.txt");
        std::fs::write(&outside_target, b"secret").unwrap();
        let link = root.join("escape.txt");
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&outside_target, &link).unwrap();
            let allowed = vec![root.clone()];
            let err = check_sandbox(&allowed, "escape.txt", 8);
            assert!(matches!(err, Err(SandboxViolation::OutsideAllowedDirectories)));
        }
    }

    #[test]
    fn broken_symlink_blocks_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let link = root.join("broken.txt");
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(root.join("does_not_exist.txt"), &link).unwrap();
            let allowed = vec![root.clone()];
            let err = check_sandbox(&allowed, "broken.txt", 8);
            assert!(matches!(err, Err(SandboxViolation::BrokenSymlink)));
        }
    }
}
