use tfidf_core::tokenizer::tokenize;

#[test]
fn it_lowercases_and_strips_non_letters() {
    let words = tokenize("Running Runners RUN! The café's menu, 2nd edition.");
    assert_eq!(words, vec!["running", "runners", "run", "the", "cafs", "menu", "nd", "edition"]);
}

#[test]
fn it_keeps_duplicates_in_order() {
    let words = tokenize("dog cat dog");
    assert_eq!(words, vec!["dog", "cat", "dog"]);
}

#[test]
fn it_is_idempotent_on_normalized_text() {
    for text in ["The quick brown fox, and the lazy dog!", "  e-mail 99 problems\n\tC++ rocks  ", ""] {
        let once = tokenize(text);
        let twice = tokenize(&once.join(" "));
        assert_eq!(once, twice);
    }
}

#[test]
fn it_yields_nothing_for_non_alphabetic_text() {
    assert!(tokenize("123 456 -- ... !!!").is_empty());
    assert!(tokenize("   \n\t ").is_empty());
}
