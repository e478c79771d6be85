//! Utility functions

/// Join container path components with `/`, skipping empty parts
pub fn join_key(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    let child = child.trim_matches('/');
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{}/{}", parent, child),
    }
}

/// Key of a block file; `block` is in array order, N5 keys are x first
pub fn block_key(dataset: &str, block: [usize; 3]) -> String {
    join_key(
        dataset,
        &format!("{}/{}/{}", block[2], block[1], block[0]),
    )
}

/// Key of the attributes file of a group or dataset
pub fn attributes_key(path: &str) -> String {
    join_key(path, "attributes.json")
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
