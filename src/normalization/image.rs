//! Image path resolution against the supplier image CDN.

/// Resolve a raw image path from a supplier payload into a full CDN URL.
///
/// Absolute URLs pass through untouched. Relative paths get duplicate
/// slashes collapsed and the `Images/` namespace prefixed when absent.
pub fn resolve_image_url(cdn_base: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }

    let mut path = collapse_slashes(raw.trim_start_matches('/'));
    if !path.to_ascii_lowercase().starts_with("images/") {
        path = format!("Images/{}", path);
    }
    Some(format!("{}/{}", cdn_base.trim_end_matches('/'), path))
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}
