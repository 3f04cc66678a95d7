//! Invocation parser: finds `<<<TAG:'arg'<SEP>'arg'>>>` in model output.
//!
//! Parsing never fails. Anything that does not form a complete, well-formed
//! invocation is kept as plain text, and the returned [`ParseResult`] always
//! reconstructs the input exactly.

use anvil_core::invocation::{ARG_SEPARATOR, CLOSE_MARKER, Invocation, OPEN_MARKER, ParseResult};

/// Scan `text` for invocations, left to right.
pub fn parse(text: &str) -> ParseResult {
    let mut invocations = Vec::new();
    let mut plain_segments = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(OPEN_MARKER) {
        let first_open = cursor + found;
        let Some(close_rel) = text[first_open + OPEN_MARKER.len()..].find(CLOSE_MARKER) else {
            break;
        };
        let close = first_open + OPEN_MARKER.len() + close_rel;
        let end = close + CLOSE_MARKER.len();

        // The last opener before the closer starts the candidate. When its
        // body is malformed the opener sat inside an argument, so earlier
        // openers get their turn.
        let candidate = openers(text, first_open, close).rev().find_map(|open| {
            parse_body(&text[open + OPEN_MARKER.len()..close]).map(|body| (open, body))
        });

        match candidate {
            Some((open, (tag, arguments))) => {
                plain_segments.push(text[plain_start..open].to_string());
                invocations.push(Invocation {
                    tag,
                    arguments,
                    raw: text[open..end].to_string(),
                });
                plain_start = end;
                cursor = end;
            }
            None => cursor = first_open + 1,
        }
    }

    plain_segments.push(text[plain_start..].to_string());
    ParseResult {
        invocations,
        plain_segments,
    }
}

/// Byte offsets in `from..close` where an opener fits before `close`.
fn openers(text: &str, from: usize, close: usize) -> impl DoubleEndedIterator<Item = usize> + '_ {
    let marker = OPEN_MARKER.as_bytes();
    (from..=close - marker.len()).filter(move |&p| text.as_bytes()[p..].starts_with(marker))
}

/// Split `TAG:'a'<SEP>'b'` into the tag and unquoted arguments.
fn parse_body(body: &str) -> Option<(String, Vec<String>)> {
    let (tag, rest) = body.split_once(':')?;
    let tag = tag.trim();
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let arguments = rest
        .split(ARG_SEPARATOR)
        .map(|piece| {
            let piece = piece.trim();
            (piece.len() >= 2 && piece.starts_with('\'') && piece.ends_with('\''))
                .then(|| piece[1..piece.len() - 1].to_string())
        })
        .collect::<Option<Vec<_>>>()?;

    Some((tag.to_string(), arguments))
}
