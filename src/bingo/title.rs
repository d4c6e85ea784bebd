use std::sync::LazyLock;

use regex::Regex;

/// Label used when a title is blank even before cleaning.
pub const UNTITLED: &str = "Untitled";

/// Annotations stripped from titles, applied in order.
static ANNOTATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)\s*\(feat\..*?\)",
        r"(?is)\s*\(featuring.*?\)",
        r"(?is)\s*feat\..*$",
        r"(?is)\s*\([^)]*remix[^)]*\)",
        r"(?is)\s*\([^)]*version[^)]*\)",
        r"(?is)\s*\([^)]*edit[^)]*\)",
        r"(?is)\s*\([^)]*remaster[^)]*\)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("title annotation pattern is valid"))
    .collect()
});

/// Strip featuring credits and remix/version/edit/remaster annotations from a title.
///
/// Cleaning runs to a fixed point, so `clean_title(clean_title(x)) == clean_title(x)`.
/// The result is never empty: when cleaning consumes the whole title the
/// trimmed original is returned, and a blank original becomes [`UNTITLED`].
pub fn clean_title(title: &str) -> String {
    let mut current = title.trim().to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            break;
        }
        current = next;
    }

    if !current.is_empty() {
        return current;
    }

    let original = title.trim();
    if original.is_empty() {
        UNTITLED.to_string()
    } else {
        original.to_string()
    }
}

fn strip_once(title: &str) -> String {
    let stripped = ANNOTATIONS
        .iter()
        .fold(title.to_string(), |acc, pattern| {
            pattern.replace_all(&acc, "").into_owned()
        });
    stripped.trim().to_string()
}
