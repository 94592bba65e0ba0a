//! # Template Rendering
//!
//! Substitutes `$dotted.path$` and `$dotted.path[i]$` references in a message
//! template with values from an extracted [`ValueMap`].
//!
//! Substitution is a single left-to-right pass: `$` delimiters pair up in
//! order, content matching a variable reference substitutes, and anything
//! else between a pair is emitted verbatim with its delimiters. The output is
//! never re-scanned, so payload text containing `$` cannot inject further
//! substitutions.

use crate::extract::ValueMap;

/// Error type for malformed templates
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template has an odd number of '$' delimiters ({count})")]
    UnbalancedDelimiters { count: usize },
}

/// Check that a template parses
///
/// The only structural requirement is an even number of `$` delimiters;
/// unknown variables are legal and render empty.
pub fn validate(template: &str) -> Result<(), TemplateError> {
    let count = template.matches('$').count();
    if count % 2 != 0 {
        return Err(TemplateError::UnbalancedDelimiters { count });
    }
    Ok(())
}

/// Render a template against an extracted value map
///
/// Unknown variables render as the empty string; list values join with
/// `", "`; indexed references select a single element and render empty when
/// out of range.
pub fn render(template: &str, values: &ValueMap) -> Result<String, TemplateError> {
    validate(template)?;

    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('$') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        // Balanced delimiter count guarantees a closing '$' exists.
        let Some(end) = after.find('$') else {
            output.push('$');
            output.push_str(after);
            return Ok(output);
        };

        let content = &after[..end];
        match parse_reference(content) {
            Some((path, index)) => output.push_str(&lookup(values, path, index)),
            None => {
                // Not a variable reference; keep the span verbatim.
                output.push('$');
                output.push_str(content);
                output.push('$');
            }
        }

        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Parse delimiter content as `IDENT(.IDENT)*([INT])?`
///
/// Returns the dotted path and optional 0-based index, or `None` when the
/// content is not a variable reference.
fn parse_reference(content: &str) -> Option<(&str, Option<usize>)> {
    let (path, index) = match content.strip_suffix(']') {
        Some(stripped) => {
            let open = stripped.rfind('[')?;
            let digits = &stripped[open + 1..];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (&stripped[..open], Some(digits.parse::<usize>().ok()?))
        }
        None => (content, None),
    };

    if path.is_empty() {
        return None;
    }

    for segment in path.split('.') {
        if segment.is_empty() || !segment.chars().all(is_identifier_char) {
            return None;
        }
    }

    Some((path, index))
}

/// Identifier characters match the field-pattern language: anything except
/// structural punctuation and whitespace
fn is_identifier_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '$' | '{' | '}' | ',' | '[' | ']' | '.')
}

fn lookup(values: &ValueMap, path: &str, index: Option<usize>) -> String {
    match (values.get(path), index) {
        (Some(extracted), None) => extracted.render(),
        (Some(extracted), Some(i)) => extracted.render_index(i),
        (None, _) => String::new(),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
