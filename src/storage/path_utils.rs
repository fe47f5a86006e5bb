//! Path helpers for the slash-separated paths the host hands in

/// Drop empty and `.` segments; `.` and `/` both name the root (`""`)
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Parent of a normalized path; the root is its own parent
pub fn parent_path(path: &str) -> String {
    let path = normalize_path(path);
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}

/// Last segment of a path
pub fn base_name(path: &str) -> String {
    let path = normalize_path(path);
    match path.rfind('/') {
        Some(pos) => path[pos + 1..].to_string(),
        None => path,
    }
}

/// Join a directory and a child name
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = normalize_path(dir);
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Extension of the final segment including the dot, or `""`
pub fn extension(path: &str) -> String {
    let name = base_name(path);
    match name.rfind('.') {
        Some(pos) if pos > 0 => name[pos..].to_string(),
        _ => String::new(),
    }
}

/// True when `path` is `ancestor` itself or lies below it
pub fn is_same_or_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/')
}
