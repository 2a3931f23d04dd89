//! Utility functions and helpers.

pub mod http;

/// Remove every leading `/`.
pub fn strip_leading_slash(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Remove every trailing `/`.
pub fn strip_trailing_slash(path: &str) -> &str {
    path.trim_end_matches('/')
}

pub fn strip_leading_and_trailing_slash(path: &str) -> &str {
    strip_trailing_slash(strip_leading_slash(path))
}

/// Whether a changelog location points at an `http(s)://` URL.
pub fn is_remote(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Derive a URL-safe slug from a version title.
///
/// Every run of non-alphanumeric characters collapses into a single `-`, so
/// titles differing only in punctuation (`1.2.0`, `1 2 0`) share a slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Store key for a version within a changelog.
pub fn version_id(base: &str, slug: &str) -> String {
    if base.is_empty() {
        format!("version/{slug}")
    } else {
        format!("{base}/version/{slug}")
    }
}

/// Derive `(id, slug)` for a version title.
pub fn slugify_version(base: &str, title: &str) -> (String, String) {
    let slug = slugify(title);
    (version_id(base, &slug), slug)
}
