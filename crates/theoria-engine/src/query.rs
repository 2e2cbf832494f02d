//! C7: query parser — phrases, required terms, optional terms.

use theoria_core::ParsedQuery;

use crate::tokenize;

/// Extract `"…"` phrases first (removed from the working string), tokenize
/// each phrase interior, then split the remainder on whitespace: `AND` is
/// skipped, `OR` routes the next token(s) to `optionalTerms`, everything else
/// goes to `requiredTerms` unless the `OR` flag was just set.
pub fn parse(query: &str) -> ParsedQuery {
    let mut phrases = Vec::new();
    let mut working = String::with_capacity(query.len());
    let mut rest = query;

    while let Some(start) = rest.find('"') {
        working.push_str(&rest[..start]);
        let after_quote = &rest[start + 1..];
        match after_quote.find('"') {
            Some(end) => {
                let phrase_terms = tokenize::tokenize(&after_quote[..end]);
                if !phrase_terms.is_empty() {
                    phrases.push(phrase_terms);
                }
                working.push(' ');
                rest = &after_quote[end + 1..];
            }
            None => {
                // Unterminated quote: the rest of the string is not a phrase.
                working.push_str(after_quote);
                rest = "";
                break;
            }
        }
    }
    working.push_str(rest);

    let mut required_terms = Vec::new();
    let mut optional_terms = Vec::new();
    let mut next_is_optional = false;

    for word in working.split_whitespace() {
        if word.eq_ignore_ascii_case("AND") {
            continue;
        }
        if word.eq_ignore_ascii_case("OR") {
            next_is_optional = true;
            continue;
        }
        let terms = tokenize::tokenize(word);
        if next_is_optional {
            optional_terms.extend(terms);
            next_is_optional = false;
        } else {
            required_terms.extend(terms);
        }
    }

    ParsedQuery {
        required_terms,
        optional_terms,
        phrases,
    }
}
