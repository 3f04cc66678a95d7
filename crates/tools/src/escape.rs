//! Escape handling for text the model writes into files.
//!
//! Arguments arrive with their quotes stripped but escapes untouched. File
//! writes and appends decode them in one left-to-right pass:
//!
//! | input  | output          |
//! |--------|-----------------|
//! | `\'`   | `'`             |
//! | `\"`   | `"`             |
//! | `\n`   | newline         |
//! | `\t`   | tab             |
//! | `<bs>` | `\` (literal)   |
//!
//! Output of a replacement is never scanned again, so `<bs>n` stays a
//! backslash followed by `n`. Unknown backslash sequences pass through.

/// Placeholder the model uses for a literal backslash.
pub const BACKSLASH_PLACEHOLDER: &str = "<bs>";

/// Decode file content escapes. See the module docs for the table.
pub fn unescape_content(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        if c == '\\' {
            let mut ahead = rest[1..].chars();
            let replacement = match ahead.next() {
                Some('\'') => Some('\''),
                Some('"') => Some('"'),
                Some('n') => Some('\n'),
                Some('t') => Some('\t'),
                _ => None,
            };
            if let Some(r) = replacement {
                out.push(r);
                rest = &rest[2..];
                continue;
            }
        } else if c == '<' && rest.starts_with(BACKSLASH_PLACEHOLDER) {
            out.push('\\');
            rest = &rest[BACKSLASH_PLACEHOLDER.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}
