/// Characters treated as word separators in addition to whitespace.
const PUNCTUATION: [char; 12] = ['.', ',', '!', '?', '(', ')', '[', ']', '"', '\'', ':', ';'];

/// Splits text into lowercase tokens with punctuation stripped.
///
/// Total and deterministic: any input (including empty) yields a possibly
/// empty list, never an error.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || PUNCTUATION.contains(&c))
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}
