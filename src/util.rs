use anyhow::{Context, Result};
use std::path::{Component, Path};

pub fn normalize_rel_path(repo_root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(repo_root).with_context(|| {
        format!(
            "strip prefix {} from {}",
            repo_root.display(),
            path.display()
        )
    })?;
    Ok(normalize_path(rel))
}

pub fn normalize_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(os) => parts.push(os.to_string_lossy().to_string()),
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            _ => {}
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Keep at most `max_chars` characters. Returns the kept text and whether anything was cut.
pub fn truncate_chars(value: &str, max_chars: usize) -> (String, bool) {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => (value[..end].to_string(), true),
        None => (value.to_string(), false),
    }
}

/// Strip quotes and trailing sentence punctuation from a token.
pub fn trim_token(token: &str) -> &str {
    token.trim_matches(|ch: char| {
        matches!(ch, '"' | '\'' | '`' | '?' | '!' | '.' | ',' | ';' | ':' | '(' | ')')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalize_rel_path_uses_forward_slashes() {
        let root = PathBuf::from("/repo");
        let file = root.join("pkg").join("mod.py");
        assert_eq!(normalize_rel_path(&root, &file).unwrap(), "pkg/mod.py");
        assert_eq!(normalize_path(Path::new("./a/../b")), "a/../b");
        assert_eq!(normalize_path(Path::new(".")), ".");
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), ("hé".to_string(), true));
        assert_eq!(truncate_chars("abc", 3), ("abc".to_string(), false));
        assert_eq!(truncate_chars("", 0), (String::new(), false));
    }

    #[test]
    fn trim_token_strips_punctuation() {
        assert_eq!(trim_token("\"Calculator\"?"), "Calculator");
        assert_eq!(trim_token("parse_args."), "parse_args");
        assert_eq!(trim_token("snake_case"), "snake_case");
    }
}
