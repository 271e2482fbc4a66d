use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_ALPHA: Regex = Regex::new(r"[^a-z]+").expect("valid regex");
    // ASCII whitespace only; U+00A0 and friends stay inside a piece
    static ref WHITESPACE: Regex = Regex::new(r"[ \t\n\x0B\x0C\r]+").expect("valid regex");
}

/// Normalize a single whitespace-delimited piece: lowercase, then drop every
/// character outside `[a-z]`. May return an empty string.
pub fn normalize(piece: &str) -> String {
    NON_ALPHA.replace_all(&piece.to_lowercase(), "").into_owned()
}

/// Tokenize text into normalized terms in original order.
///
/// Splits on ASCII whitespace runs, so `"don't"` becomes `"dont"` and `"e-mail"`
/// becomes `"email"`. Pieces left empty after filtering (numbers,
/// punctuation) are discarded. Duplicates are retained.
///
/// Documents and queries must both go through this function.
pub fn tokenize(text: &str) -> Vec<String> {
    WHITESPACE
        .split(text)
        .map(normalize)
        .filter(|term| !term.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Cats, dogs\tand  BIRDS!");
        assert_eq!(t, vec!["cats", "dogs", "and", "birds"]);
    }

    #[test]
    fn drops_numeric_and_punctuation_pieces() {
        let t = tokenize("version 2.0 -- released 2024 ...");
        assert_eq!(t, vec!["version", "released"]);
    }

    #[test]
    fn splits_on_ascii_whitespace_only() {
        assert_eq!(tokenize("cat\u{a0}dog"), vec!["catdog"]);
        assert_eq!(tokenize("cat\u{2003}dog\x0Bbird\x0Cfish"), vec!["catdog", "bird", "fish"]);
    }

    #[test]
    fn joins_inner_punctuation() {
        assert_eq!(normalize("Don't"), "dont");
        assert_eq!(normalize("e-mail"), "email");
        assert_eq!(normalize("1234"), "");
    }
}
