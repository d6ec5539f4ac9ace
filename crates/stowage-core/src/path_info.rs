//! Filename decomposition shared by the entity, the factory and the path builder.
//!
//! Both `/` and `\` count as directory separators because client-supplied upload
//! names frequently carry Windows paths.

/// Last path component of `path`.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Extension of the last path component, without the dot.
///
/// Hidden files (`.env`) and trailing dots (`name.`) have no extension.
pub fn extension(path: &str) -> Option<&str> {
    let base = basename(path);
    match base.rfind('.') {
        Some(0) | None => None,
        Some(idx) if idx + 1 == base.len() => None,
        Some(idx) => Some(&base[idx + 1..]),
    }
}

/// Last path component with its extension removed.
pub fn file_stem(path: &str) -> &str {
    let base = basename(path);
    match extension(base) {
        Some(ext) => &base[..base.len() - ext.len() - 1],
        None => base.strip_suffix('.').unwrap_or(base),
    }
}
