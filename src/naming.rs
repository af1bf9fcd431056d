//! Filename derivation for issued credential artifacts.
//!
//! Attendee names are free text typed by an operator. Before one becomes part
//! of a filename it goes through [`sanitize_filename`], which keeps letters,
//! digits, underscores, and whitespace, then joins the remaining words with
//! single underscores:
//!
//! - `"Ana López"` → `"Ana_López"`
//! - `"  O'Brien,  Pat "` → `"OBrien_Pat"`
//! - `"!!!"` → `""`
//!
//! The sanitized name is only a storage key for the artifact. It never takes
//! part in credential identity; that is the payload string alone.

/// Suffix appended to every artifact stem.
const ARTIFACT_SUFFIX: &str = "_qr_code";

/// Normalize a free-text name into a filesystem-safe stem.
///
/// Total and idempotent: the output contains only alphanumerics and `_`, so a
/// second pass leaves it unchanged. Alphanumeric is the Unicode notion, so
/// accented letters survive.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Artifact filename for an attendee: `{sanitized_name}_qr_code.{ext}`.
pub fn artifact_filename(name: &str, ext: &str) -> String {
    format!("{}{}.{}", sanitize_filename(name), ARTIFACT_SUFFIX, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_joins_words() {
        assert_eq!(sanitize_filename("Ana Maria"), "Ana_Maria");
    }

    #[test]
    fn accented_letters_are_kept() {
        assert_eq!(sanitize_filename("Ana López"), "Ana_López");
    }

    #[test]
    fn punctuation_is_removed() {
        assert_eq!(sanitize_filename("O'Brien, Pat!"), "OBrien_Pat");
    }

    #[test]
    fn outer_whitespace_is_trimmed() {
        assert_eq!(sanitize_filename("   Luis   "), "Luis");
    }

    #[test]
    fn whitespace_runs_collapse_to_one_underscore() {
        assert_eq!(sanitize_filename("Ana \t  López\nRuiz"), "Ana_López_Ruiz");
    }

    #[test]
    fn underscores_survive() {
        assert_eq!(sanitize_filename("snake_case name"), "snake_case_name");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn only_symbols_yields_empty_output() {
        assert_eq!(sanitize_filename("!!! ??? ..."), "");
    }

    #[test]
    fn path_separators_cannot_escape() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let samples = [
            "",
            "Ana López",
            "  a  b  ",
            "__x__ y",
            "O'Brien, Pat",
            "名前 テスト",
            "\t\n",
            "a-b-c",
            "x_ _y",
        ];
        for s in samples {
            let once = sanitize_filename(s);
            assert_eq!(sanitize_filename(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn artifact_filename_uses_sanitized_stem() {
        assert_eq!(
            artifact_filename("Ana López", "png"),
            "Ana_López_qr_code.png"
        );
    }

    #[test]
    fn artifact_filename_for_empty_stem() {
        assert_eq!(artifact_filename("???", "jpg"), "_qr_code.jpg");
    }
}
