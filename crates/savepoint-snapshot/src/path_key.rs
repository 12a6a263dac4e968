//! Filesystem-safe keys derived from document paths.

use std::path::Path;

/// Characters that may not appear in a backup file name.
const ILLEGAL_CHARS: [char; 15] = [
    '/', '\n', '\r', '\t', '\0', '\x0c', '`', '?', '*', '\\', '<', '>', '|', '"', ':',
];

const PLACEHOLDER: char = '_';

/// Longest key used in an artifact name, in bytes. Leaves room for the
/// `-<millis>-<n>` suffix within the usual 255-byte file name limit.
pub const MAX_ARTIFACT_KEY_LEN: usize = 200;

/// Derive a file-name-safe key from a document path.
///
/// Every character in [`ILLEGAL_CHARS`] becomes `_`; everything else is kept
/// as-is, so the mapping is deterministic for a given path.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) {
                PLACEHOLDER
            } else {
                c
            }
        })
        .collect()
}

/// Key used to name the backup artifacts of `path`.
///
/// Equal to [`path_key`] when that fits in [`MAX_ARTIFACT_KEY_LEN`] bytes.
/// Longer keys keep their tail (the file name end) and get the CRC-32 of the
/// full key appended, so distinct long paths still map to distinct keys.
pub fn artifact_key(path: &Path) -> String {
    let key = path_key(path);
    if key.len() <= MAX_ARTIFACT_KEY_LEN {
        return key;
    }

    let digest = format!("~{:08x}", crc32fast::hash(key.as_bytes()));
    let mut start = key.len() - (MAX_ARTIFACT_KEY_LEN - digest.len());
    while !key.is_char_boundary(start) {
        start += 1;
    }

    format!("{}{}", &key[start..], digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn replaces_separators() {
        assert_eq!(
            path_key(Path::new("/home/ana/sheets/q3.sheet")),
            "_home_ana_sheets_q3.sheet"
        );
    }

    #[test]
    fn replaces_every_illegal_character() {
        let raw = "a/b\nc\rd\te\0f\x0cg`h?i*j\\k<l>m|n\"o:p";
        assert_eq!(
            path_key(&PathBuf::from(raw)),
            "a_b_c_d_e_f_g_h_i_j_k_l_m_n_o_p"
        );
    }

    #[test]
    fn keeps_other_characters() {
        assert_eq!(
            path_key(Path::new("Budget 2024 (final) ünïcode.doc")),
            "Budget 2024 (final) ünïcode.doc"
        );
    }

    #[test]
    fn is_deterministic() {
        let path = Path::new("/var/data/report.txt");
        assert_eq!(path_key(path), path_key(path));
        assert_ne!(path_key(path), path_key(Path::new("/var/data/report2.txt")));
    }

    #[test]
    fn short_artifact_key_is_the_path_key() {
        let path = Path::new("/home/ana/notes.txt");
        assert_eq!(artifact_key(path), path_key(path));
    }

    #[test]
    fn long_artifact_key_is_bounded_and_distinct() {
        let deep = "/very-long-directory-name".repeat(20);
        let a = PathBuf::from(format!("{deep}/chapter-one.txt"));
        let b = PathBuf::from(format!("/other{deep}/chapter-one.txt"));

        let key_a = artifact_key(&a);
        let key_b = artifact_key(&b);

        assert!(key_a.len() <= MAX_ARTIFACT_KEY_LEN);
        assert!(key_a.contains("chapter-one.txt~"));
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn long_artifact_key_respects_char_boundaries() {
        let path = PathBuf::from(format!("/{}", "é".repeat(150)));
        let key = artifact_key(&path);
        assert!(key.len() <= MAX_ARTIFACT_KEY_LEN);
        assert!(key.starts_with('é'));
    }
}
