use unicode_ellipsis::truncate_str;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Truncates text if it is too long, and adds an ellipsis at the end if needed.
#[inline]
pub fn truncate_to_width(content: &str, width: usize) -> String {
    truncate_str(content, width).to_string()
}

/// Drops the first `columns` terminal columns of a string, respecting grapheme boundaries.
/// A wide grapheme that straddles the cut is dropped entirely.
pub fn skip_columns(content: &str, columns: usize) -> &str {
    if columns == 0 {
        return content;
    }

    let mut skipped = 0;
    for (offset, grapheme) in content.grapheme_indices(true) {
        if skipped >= columns {
            return &content[offset..];
        }
        skipped += grapheme.width();
    }

    ""
}

/// Case-insensitive substring test. Non-ASCII characters are compared after lowercasing.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    if haystack.is_ascii() && needle.is_ascii() {
        let needle = needle.as_bytes();
        haystack
            .as_bytes()
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle))
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Checks that the first string is equal to any of the other ones in a ASCII
/// case-insensitive match.
///
/// The generated code is the same as writing:
/// `to_ascii_lowercase(a) == to_ascii_lowercase(b) || to_ascii_lowercase(a) ==
/// to_ascii_lowercase(c)`, but without allocating and copying temporaries.
///
/// # Examples
///
/// ```ignore
/// assert!(multi_eq_ignore_ascii_case!("test", "test"));
/// assert!(multi_eq_ignore_ascii_case!("test", "a" | "b" | "test"));
/// assert!(!multi_eq_ignore_ascii_case!("test", "a" | "b" | "c"));
/// ```
#[macro_export]
macro_rules! multi_eq_ignore_ascii_case {
    ( $lhs:expr, $last:literal ) => {
        $lhs.eq_ignore_ascii_case($last)
    };
    ( $lhs:expr, $head:literal | $($tail:tt)* ) => {
        $lhs.eq_ignore_ascii_case($head) || $crate::multi_eq_ignore_ascii_case!($lhs, $($tail)*)
    };
}
