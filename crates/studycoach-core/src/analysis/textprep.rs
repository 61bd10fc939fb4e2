//! Whitespace normalization and the word lexer shared by every component.
//!
//! Word-like tokens start with a letter from one of the two supported scripts
//! (ASCII Latin, or the Arabic block U+0600..=U+06FF) and continue with letters,
//! ASCII digits, `_`, `'` or `-`.

/// Unicode whitespace plus the ASCII information separators U+001C..=U+001F,
/// which PDF text layers emit between lines and records.
pub fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1C}'..='\u{1F}').contains(&c)
}

/// Collapse every whitespace run (newlines included) into a single space and trim.
pub fn normalize(s: &str) -> String {
    s.split(is_space)
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn is_lead(c: char) -> bool {
    c.is_ascii_alphabetic() || ('\u{0600}'..='\u{06FF}').contains(&c)
}

fn is_continuation(c: char) -> bool {
    is_lead(c) || c.is_ascii_digit() || matches!(c, '_' | '\'' | '-')
}

/// A word-like span; offsets are byte offsets into the lexed string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = &self.src[self.pos..];
        let Some((lead, _)) = rest.char_indices().find(|&(_, c)| is_lead(c)) else {
            self.pos = self.src.len();
            return None;
        };
        let start = self.pos + lead;
        let tail = &self.src[start..];
        let len = tail
            .char_indices()
            .skip(1)
            .find(|&(_, c)| !is_continuation(c))
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        let end = start + len;
        self.pos = end;
        Some(Token {
            start,
            end,
            text: &self.src[start..end],
        })
    }
}

pub fn tokens(s: &str) -> Tokens<'_> {
    Tokens { src: s, pos: 0 }
}

/// First token of `sentence` equal to `term` ignoring case (`term` is already lowercase).
pub fn find_word<'a>(sentence: &'a str, term: &str) -> Option<Token<'a>> {
    tokens(sentence).find(|t| t.text.to_lowercase() == term)
}

/// Replace exactly the bytes of `tok` with `mask`, keeping the rest verbatim.
pub fn mask_token(sentence: &str, tok: &Token<'_>, mask: &str) -> String {
    let mut out = String::with_capacity(sentence.len() + mask.len());
    out.push_str(&sentence[..tok.start]);
    out.push_str(mask);
    out.push_str(&sentence[tok.end..]);
    out
}
