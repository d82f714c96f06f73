//! Output file naming for containers.

/// Suffix carried by every container file.
pub const CONTAINER_SUFFIX: &str = ".enc";
/// Prefix used when a decrypted file's name cannot be derived from its container.
pub const FALLBACK_PREFIX: &str = "decrypted_";

/// `report.pdf` → `report.pdf.enc`
pub fn container_name(original_name: &str) -> String {
    format!("{original_name}{CONTAINER_SUFFIX}")
}

pub fn has_container_suffix(name: &str) -> bool {
    name.ends_with(CONTAINER_SUFFIX)
}

/// `report.pdf.enc` → `report.pdf`; anything else → `decrypted_<name>`.
pub fn decrypted_name(container_name: &str) -> String {
    match container_name.strip_suffix(CONTAINER_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem.to_owned(),
        _ => format!("{FALLBACK_PREFIX}{container_name}"),
    }
}

/// Make `name` unique against `taken` by appending ` (n)` before the
/// container suffix or final extension.  Deterministic in insertion order.
pub fn disambiguate(name: &str, taken: &std::collections::HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_owned();
    }
    let (stem, tail) = split_tail(name);
    (1..)
        .map(|n| format!("{stem} ({n}){tail}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_owned())
}

fn split_tail(name: &str) -> (&str, &str) {
    if let Some(stem) = name.strip_suffix(CONTAINER_SUFFIX) {
        if !stem.is_empty() {
            return (stem, CONTAINER_SUFFIX);
        }
    }
    match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn container_names() {
        assert_eq!(container_name("report.pdf"), "report.pdf.enc");
        assert!(has_container_suffix("report.pdf.enc"));
        assert!(!has_container_suffix("report.pdf"));
        assert!(!has_container_suffix("report.ENC"));
    }

    #[test]
    fn decrypted_names() {
        assert_eq!(decrypted_name("report.pdf.enc"), "report.pdf");
        assert_eq!(decrypted_name("blob"), "decrypted_blob");
        assert_eq!(decrypted_name(".enc"), "decrypted_.enc");
        assert_eq!(decrypted_name("a.enc.enc"), "a.enc");
    }

    #[test]
    fn disambiguation_keeps_suffixes() {
        let mut taken = HashSet::new();
        assert_eq!(disambiguate("a.txt.enc", &taken), "a.txt.enc");
        taken.insert("a.txt.enc".to_owned());
        assert_eq!(disambiguate("a.txt.enc", &taken), "a.txt (1).enc");
        taken.insert("a.txt (1).enc".to_owned());
        assert_eq!(disambiguate("a.txt.enc", &taken), "a.txt (2).enc");

        taken.insert("notes.md".to_owned());
        assert_eq!(disambiguate("notes.md", &taken), "notes (1).md");
        taken.insert("README".to_owned());
        assert_eq!(disambiguate("README", &taken), "README (1)");
    }
}
