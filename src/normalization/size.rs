//! Size-code normalization onto the fixed apparel vocabulary
//! {XS, S, M, L, XL, 2XL, 3XL, 4XL}.

/// Synonym table: every spelling observed across suppliers, mapped onto the
/// canonical code. Canonical codes map to themselves so normalization is
/// idempotent.
const SIZE_SYNONYMS: &[(&str, &str)] = &[
    ("XS", "XS"),
    ("XSM", "XS"),
    ("XSMALL", "XS"),
    ("X-SMALL", "XS"),
    ("EXTRA SMALL", "XS"),
    ("S", "S"),
    ("SM", "S"),
    ("SML", "S"),
    ("SMALL", "S"),
    ("M", "M"),
    ("MD", "M"),
    ("MED", "M"),
    ("MEDIUM", "M"),
    ("L", "L"),
    ("LG", "L"),
    ("LRG", "L"),
    ("LARGE", "L"),
    ("XL", "XL"),
    ("XLG", "XL"),
    ("XLARGE", "XL"),
    ("X-LARGE", "XL"),
    ("EXTRA LARGE", "XL"),
    ("2XL", "2XL"),
    ("XXL", "2XL"),
    ("2X", "2XL"),
    ("2XLARGE", "2XL"),
    ("2X-LARGE", "2XL"),
    ("XX-LARGE", "2XL"),
    ("3XL", "3XL"),
    ("XXXL", "3XL"),
    ("3X", "3XL"),
    ("3XLARGE", "3XL"),
    ("3X-LARGE", "3XL"),
    ("4XL", "4XL"),
    ("XXXXL", "4XL"),
    ("4X", "4XL"),
    ("4XLARGE", "4XL"),
    ("4X-LARGE", "4XL"),
];

/// Normalize a raw supplier size string. Unrecognized sizes pass through
/// uppercased (e.g. "osfa" -> "OSFA") rather than being dropped.
pub fn normalize_size(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    for (synonym, canonical) in SIZE_SYNONYMS {
        if upper == *synonym {
            return (*canonical).to_string();
        }
    }
    upper
}

/// Canonical display ordering for size columns (unknown sizes sort last,
/// alphabetically).
pub fn size_sort_key(size: &str) -> (usize, String) {
    const ORDER: [&str; 8] = ["XS", "S", "M", "L", "XL", "2XL", "3XL", "4XL"];
    match ORDER.iter().position(|s| *s == size) {
        Some(idx) => (idx, String::new()),
        None => (ORDER.len(), size.to_string()),
    }
}
