//! Remote path helpers. Paths are joined as-is; nothing is canonicalized.

/// `directory + "/" + file_name`, with no normalization of either part.
pub fn join(directory: &str, file_name: &str) -> String {
    format!("{}/{}", directory, file_name)
}

/// Non-empty segments of a slash-delimited path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Absolute prefixes of `path`: `/a`, `/a/b`, `/a/b/c`.
pub fn prefixes(path: &str) -> Vec<String> {
    let mut current = String::new();
    segments(path)
        .map(|segment| {
            current.push('/');
            current.push_str(segment);
            current.clone()
        })
        .collect()
}

/// Final segment of a path, used as a local file name.
pub fn file_name(path: &str) -> Option<&str> {
    segments(path).last()
}
