/// Windows保留设备名
const WINDOWS_DEVICE_FILES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce a client supplied filename to a flat, ASCII-only name that is safe to
/// join onto the upload directory.
///
/// Path separators become whitespace, whitespace runs collapse to `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are trimmed.
/// Returns `None` when nothing usable is left.
pub fn secure_filename(filename: &str) -> Option<String> {
    let ascii: String = filename
        .chars()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return None;
    }

    let stem = trimmed.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if WINDOWS_DEVICE_FILES.contains(&stem.as_str()) {
        return Some(format!("_{}", trimmed));
    }

    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        assert_eq!(secure_filename("leaf.jpg").as_deref(), Some("leaf.jpg"));
        assert_eq!(secure_filename("My Tree 01.PNG").as_deref(), Some("My_Tree_01.PNG"));
    }

    #[test]
    fn strips_path_traversal() {
        assert_eq!(
            secure_filename("../../../etc/passwd").as_deref(),
            Some("etc_passwd")
        );
        assert_eq!(
            secure_filename("C:\\Users\\me\\photo.jpg").as_deref(),
            Some("C_Users_me_photo.jpg")
        );
    }

    #[test]
    fn drops_non_ascii_and_symbols() {
        assert_eq!(secure_filename("椰子树.jpg").as_deref(), Some("jpg"));
        assert_eq!(secure_filename("a$b%c.png").as_deref(), Some("abc.png"));
    }

    #[test]
    fn empty_results_are_rejected() {
        assert_eq!(secure_filename(""), None);
        assert_eq!(secure_filename("..."), None);
        assert_eq!(secure_filename("椰子"), None);
    }

    #[test]
    fn prefixes_windows_device_names() {
        assert_eq!(secure_filename("con.jpg").as_deref(), Some("_con.jpg"));
        assert_eq!(secure_filename("lpt1").as_deref(), Some("_lpt1"));
    }
}
