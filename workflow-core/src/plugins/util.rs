/// Free-function helpers shared by plugins (DESIGN NOTES §9: "should be
/// free functions in a shared utility module, not a base class").

/// Appends `additions` to `existing`, dropping empty strings and
/// de-duplicating while preserving first occurrence (spec §4.4).
pub fn merge_unique_list(existing: &[String], additions: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = existing.to_vec();
    merged.extend(additions.iter().cloned());
    dedupe_preserve_order(&merged)
}

/// De-duplicates preserving first occurrence; empty strings are dropped.
pub fn dedupe_preserve_order(items: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.is_empty() {
            continue;
        }
        if seen.insert(item.clone()) {
            out.push(item.clone());
        }
    }
    out
}
