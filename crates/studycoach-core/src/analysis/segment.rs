use super::textprep::{char_len, is_space};

/// `.` `!` `?` and the Arabic question mark.
fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\u{061F}')
}

/// Split at whitespace runs that directly follow terminal punctuation, trim, and keep
/// fragments longer than `min_chars` chars. Order follows the source text.
pub fn sentences(text: &str, min_chars: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut prev: Option<char> = None;
    let mut it = text.char_indices().peekable();
    while let Some((i, c)) = it.next() {
        if is_space(c) && prev.is_some_and(is_terminal) {
            let mut resume = i + c.len_utf8();
            while let Some(&(j, d)) = it.peek() {
                if !is_space(d) {
                    break;
                }
                resume = j + d.len_utf8();
                it.next();
            }
            keep(&text[start..i], min_chars, &mut out);
            start = resume;
            prev = Some(c);
            continue;
        }
        prev = Some(c);
    }
    keep(&text[start..], min_chars, &mut out);
    out
}

fn keep<'a>(frag: &'a str, min_chars: usize, out: &mut Vec<&'a str>) {
    let s = frag.trim_matches(is_space);
    if char_len(s) > min_chars {
        out.push(s);
    }
}
