//! Entry path resolution
//!
//! Maps caller-supplied names onto the normalized form used inside the archive
//! index: no leading separator, forward slashes, no empty segments. The root
//! folder is the empty string.

/// Entry path separator
pub const SEPARATOR: char = '/';

/// True for names that select nothing (empty or whitespace only)
pub fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

/// Resolve a caller-supplied name to an index path
///
/// Returns `None` for blank names. A name made only of separators resolves to
/// the root (`""`).
pub fn resolve(name: &str) -> Option<String> {
    if is_blank(name) {
        return None;
    }
    Some(normalize(name))
}

/// Normalize a raw central-directory name
///
/// Returns the normalized path and whether the raw name denoted a directory
/// (trailing separator).
pub fn normalize_entry_name(raw: &str) -> (String, bool) {
    let is_dir = raw.ends_with(SEPARATOR);
    (normalize(raw), is_dir)
}

/// Parent folder of an index path (`""` for top-level entries)
pub fn parent_of(path: &str) -> &str {
    match path.rsplit_once(SEPARATOR) {
        Some((parent, _)) => parent,
        None => "",
    }
}

/// Every proper ancestor folder of `path`, nearest first, excluding the root
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut current = path;
    std::iter::from_fn(move || {
        let parent = parent_of(current);
        if parent.is_empty() {
            return None;
        }
        current = parent;
        Some(parent)
    })
}

fn normalize(name: &str) -> String {
    name.split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
