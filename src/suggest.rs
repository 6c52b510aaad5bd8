use colored::Colorize;
use regex::Regex;

/// Candidate match strings for a payee: each word, then each tail of the
/// payee starting at a word.
pub fn complete_matches(payee: &str) -> Vec<String> {
    let mut matches: Vec<String> = Vec::new();
    let mut push = |m: &str| {
        if !m.is_empty() && !matches.iter().any(|x| x == m) {
            matches.push(m.to_string());
        }
    };
    if let Ok(words) = Regex::new(r"\w+") {
        for word in words.find_iter(payee) {
            push(word.as_str());
        }
    }
    let mut at_word_start = true;
    for (i, c) in payee.char_indices() {
        if c.is_alphanumeric() && at_word_start {
            push(&payee[i..]);
        }
        at_word_start = !c.is_alphanumeric();
    }
    matches
}

/// Candidates extending `input`, case-insensitive, in their original
/// order. Used for tab completion at the prompts.
pub fn complete<'a>(candidates: &'a [String], input: &str) -> Vec<&'a str> {
    let needle = input.to_lowercase();
    candidates
        .iter()
        .filter(|c| c.to_lowercase().starts_with(&needle))
        .map(String::as_str)
        .collect()
}

/// Render `text` with the `matched` substring highlighted.
pub fn highlight(text: &str, matched: Option<&str>) -> String {
    let Some(m) = matched.filter(|m| !m.is_empty()) else {
        return text.to_string();
    };
    match text.find(m) {
        Some(start) => {
            let end = start + m.len();
            format!("{}{}{}", &text[..start], m.green().bold(), &text[end..])
        }
        None => text.to_string(),
    }
}
