//! Word tokenization of diagnostic messages.

use std::sync::LazyLock;

use regex::Regex;

use crate::canonical::Canonicalizer;

static DELIMITER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?\-]").unwrap());
static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'([^']*)'([.!?\-]*)$").unwrap());

/// Prefix of a quoted identifier missing from the record map.
pub const UNKNOWN_MARKER: &str = "UNKNOWN:";

/// Word tokens of one diagnostic message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedMessage {
    pub tokens: Vec<String>,
    /// Quoted words with no placeholder in the record's map.
    pub unresolved: usize,
}

/// Split `message` into word tokens.
///
/// `'quoted'` words resolve through `canon`; a miss emits
/// `UNKNOWN: 'word'`. Other words are lower-cased and split around `.`, `!`,
/// `?` and `-`, keeping the delimiters.
pub fn tokenize_message(canon: &Canonicalizer<'_>, message: &str) -> TokenizedMessage {
    let mut out = TokenizedMessage::default();

    for word in message.split(' ').filter(|w| !w.is_empty()) {
        if let Some(caps) = QUOTED_RE.captures(word) {
            let identifier = &caps[1];
            match canon.lookup(identifier) {
                Some(placeholder) => out.tokens.push(placeholder.to_string()),
                None => {
                    out.unresolved += 1;
                    out.tokens.push(format!("{UNKNOWN_MARKER} '{identifier}'"));
                }
            }
            out.tokens.extend(caps[2].chars().map(String::from));
        } else {
            split_retaining_delimiters(&word.to_lowercase(), &mut out.tokens);
        }
    }

    out
}

fn split_retaining_delimiters(word: &str, out: &mut Vec<String>) {
    let mut last = 0;
    for m in DELIMITER_RE.find_iter(word) {
        if m.start() > last {
            out.push(word[last..m.start()].to_string());
        }
        out.push(m.as_str().to_string());
        last = m.end();
    }
    if last < word.len() {
        out.push(word[last..].to_string());
    }
}
