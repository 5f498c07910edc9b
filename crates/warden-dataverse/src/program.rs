//! Governance check program rendering.

use std::fmt::Write as _;

use warden_core::GovernanceAction;

/// Query asked against a rendered governance check program.
pub const GOV_CHECK_QUERY: &str = "tell(Result, Evidence).";

/// Render the program checking `action` by `subject` in `zone` against the
/// governance code published at `gov_code`.
///
/// A prohibiting paragraph wins over a permitting one. When no paragraph
/// applies, `tell/2` has no solution.
pub fn gov_check_program(
    gov_code: &str,
    action: GovernanceAction,
    subject: &str,
    zone: &str,
) -> String {
    format!(
        ":- consult({gov_code}).\n\
         \n\
         action({action}).\n\
         subject({subject}).\n\
         zone({zone}).\n\
         \n\
         tell(Result, Evidence) :-\n\
         bagof(P:Modality, paragraph(P, Modality), Evidence),\n\
         (   member(_: 'prohibited', Evidence) -> Result = 'prohibited'\n\
         ;   member(_: 'permitted', Evidence) -> Result = 'permitted'\n\
         ).",
        gov_code = quote_atom(gov_code),
        action = quote_atom(action.as_str()),
        subject = quote_atom(subject),
        zone = quote_atom(zone),
    )
}

/// Quote `value` as a single-quoted Prolog atom.
pub fn quote_atom(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:x}\\", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Strip the quotes of a single-quoted atom, undoing [`quote_atom`] escapes.
pub fn unquote_atom(term: &str) -> String {
    let Some(inner) = term
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    else {
        return term.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('x') => {
                let mut hex = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '\\' {
                        closed = true;
                        break;
                    }
                    hex.push(c);
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) if closed => out.push(c),
                    // Not an escape: keep the sequence as written.
                    _ => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                        if closed {
                            out.push('\\');
                        }
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
