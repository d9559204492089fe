//! Delimiter balancer: strip unmatched `()`, `[]` and `{}` characters.
//!
//! The scan keeps a stack of delimiter occurrences that have not (yet) found
//! a partner. An opener is always pushed. A closer pops the stack when the
//! top holds its own opener and is pushed otherwise. Whatever remains on the
//! stack after the scan is unmatched and gets deleted; every other character
//! is kept verbatim, so the output is always balanced.

/// Opener to closer pairing. A bijection between openers and closers.
pub const PAIRS: [(char, char); 3] = [('(', ')'), ('{', '}'), ('[', ']')];

/// One unmatched delimiter seen during the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    index: usize,
    ch: char,
}

fn is_opener(ch: char) -> bool {
    PAIRS.iter().any(|&(open, _)| open == ch)
}

fn opener_for(closer: char) -> Option<char> {
    PAIRS
        .iter()
        .find_map(|&(open, close)| (close == closer).then_some(open))
}

/// Remove every unmatched delimiter from `text`.
///
/// Matched pairs and all other characters (including those between pairs)
/// are preserved in order. Indices are character positions, so multi-byte
/// text is handled the same way as ASCII.
#[must_use]
pub fn normalize_delimiters(text: &str) -> String {
    let mut stack: Vec<Pending> = Vec::new();

    for (index, ch) in text.chars().enumerate() {
        if is_opener(ch) {
            stack.push(Pending { index, ch });
        } else if let Some(open) = opener_for(ch) {
            if stack.last().is_some_and(|top| top.ch == open) {
                stack.pop();
            } else {
                stack.push(Pending { index, ch });
            }
        }
    }

    if stack.is_empty() {
        return text.to_string();
    }

    // Stack entries are in scan order, so a single forward walk suffices.
    let mut unmatched = stack.iter().map(|p| p.index).peekable();
    text.chars()
        .enumerate()
        .filter(|&(index, _)| {
            if unmatched.peek() == Some(&index) {
                unmatched.next();
                false
            } else {
                true
            }
        })
        .map(|(_, ch)| ch)
        .collect()
}
