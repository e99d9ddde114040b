//! Field splitting for the multi-byte delimiter dialect.
//!
//! A zero-length field is null. Non-empty fields are unescaped:
//! - quoted rows: only `escape + escape` and `escape + quote` are special,
//!   and a bare quote inside a field is an error;
//! - unquoted rows: `escape + escape`, `escape + terminator` and
//!   `escape + delimiter` yield the escaped text. An escape followed by any
//!   single byte of the delimiter or terminator also yields that byte, so a
//!   delimiter written with every byte escaped reads back intact.
//!
//! Any other escape is kept as a literal byte.

use crate::error::MalformedReason;
use crate::models::framers::multi_delim::MultiDelimTokens;
use crate::models::splitters::arena::FieldArena;

/// Split one framed row (terminator excluded) into exactly
/// `tokens.columns` fields. Returns the field count and whether a
/// delimiter was seen.
pub fn unpack_delimited(
    tokens: &MultiDelimTokens,
    row: &[u8],
    arena: &mut FieldArena,
) -> Result<(usize, bool), MalformedReason> {
    let expected = tokens.columns;
    let dlen = tokens.delimiter.len();

    let (mut start, limit, two_quote) = match tokens.quote {
        Some(q) => {
            if row.first() != Some(&q) || row.last() != Some(&q) {
                return Err(MalformedReason::MissingRowQuote);
            }
            // exclude the first and last quote
            (1usize, row.len() - 1, 2usize)
        }
        None => (0, row.len(), 0),
    };

    let mut index = 0usize;
    let mut saw_delim = false;
    let mut end = 0usize;

    while end < limit {
        end = limit;
        if index >= expected {
            return Err(MalformedReason::TooManyColumns { expected, found: index });
        }
        if start > limit {
            return Err(MalformedReason::MissingColumnQuote);
        }
        if let Some(q) = tokens.quote {
            if row[start - 1] != q {
                return Err(MalformedReason::MissingColumnQuote);
            }
        }

        let location = tokens.find_delimiter(&row[..limit], start);
        if let Some(loc) = location {
            if loc < end {
                end = loc;
                saw_delim = true;
            }
        }

        let field = &row[start..end];
        let out = arena.mark();
        if field.is_empty() {
            arena.finish_field(out, true, tokens.quote.is_some());
        } else {
            match tokens.escape {
                Some(escape) => unescape_data(tokens, escape, field, arena)?,
                None => arena.extend(field),
            }
            arena.finish_field(out, false, tokens.quote.is_some());
        }
        index += 1;

        start = match location {
            Some(loc) => loc + dlen + two_quote,
            None => limit,
        };
    }

    if index < expected {
        return Err(MalformedReason::TooFewColumns { expected, found: index });
    }
    Ok((index, saw_delim))
}

fn unescape_data(
    tokens: &MultiDelimTokens,
    escape: u8,
    field: &[u8],
    arena: &mut FieldArena,
) -> Result<(), MalformedReason> {
    let len = field.len();
    let mut i = 0usize;

    while i < len {
        let c = field[i];
        if c == escape {
            let next = field.get(i + 1).copied();
            match tokens.quote {
                Some(q) => {
                    if next == Some(escape) || next == Some(q) {
                        arena.push(field[i + 1]);
                        i += 2;
                    } else {
                        arena.push(c);
                        i += 1;
                    }
                }
                None => {
                    let rest = &field[i + 1..];
                    if next == Some(escape) {
                        arena.push(escape);
                        i += 2;
                    } else if rest.starts_with(&tokens.eol) {
                        arena.extend(&tokens.eol);
                        i += 1 + tokens.eol.len();
                    } else if rest.starts_with(&tokens.delimiter) {
                        arena.extend(&tokens.delimiter);
                        i += 1 + tokens.delimiter.len();
                    } else if let Some(b) =
                        next.filter(|b| tokens.delimiter.contains(b) || tokens.eol.contains(b))
                    {
                        arena.push(b);
                        i += 2;
                    } else {
                        arena.push(c);
                        i += 1;
                    }
                }
            }
        } else if tokens.quote == Some(c) {
            return Err(MalformedReason::UnescapedQuote);
        } else {
            arena.push(c);
            i += 1;
        }
    }
    Ok(())
}
