//! Field-pattern expression parser.
//!
//! A field-pattern expression is a comma-separated list of patterns, each a
//! root identifier optionally followed by brace-enclosed groups of further
//! patterns:
//!
//! ```text
//! action, pull_request{title,user{login}}, repository{name}
//! ```
//!
//! Parsing produces a tree of [`FieldPattern`] nodes. Successive brace groups
//! on the same root (`a{b}{c}`) merge into one child list, so both descents
//! run under that root.

/// A parsed pattern node
///
/// Leaves (no children) denote a terminal extraction; internal nodes denote
/// descent into the named key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPattern {
    pub name: String,
    pub children: Vec<FieldPattern>,
}

impl FieldPattern {
    /// Create a leaf pattern
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Create an internal pattern with children
    pub fn with_children(name: impl Into<String>, children: Vec<FieldPattern>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// True when this node has no further descent
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Error type for malformed field-pattern expressions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("field-pattern expression is empty")]
    Empty,

    #[error("unbalanced braces at position {position}")]
    UnbalancedBraces { position: usize },

    #[error("empty identifier at position {position}")]
    EmptyIdentifier { position: usize },

    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { position: usize, character: char },
}

/// Parse a field-pattern expression into its pattern trees
///
/// # Errors
///
/// Returns [`PatternError`] when the expression is syntactically invalid:
/// unbalanced braces, empty identifiers, or stray separators. Missing fields
/// in a payload are never a parse concern.
pub fn parse_patterns(input: &str) -> Result<Vec<FieldPattern>, PatternError> {
    let mut parser = Parser::new(input);
    let patterns = parser.parse_list()?;

    // Everything must be consumed at the top level; a stray '}' lands here.
    parser.skip_whitespace();
    if let Some((position, character)) = parser.peek() {
        return Err(PatternError::UnexpectedCharacter {
            position,
            character,
        });
    }

    if patterns.is_empty() {
        return Err(PatternError::Empty);
    }

    Ok(patterns)
}

/// Recursive-descent parser over the expression characters
struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).map(|&c| (self.pos, c))
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some((_, c)) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Parse a comma-separated pattern list, stopping at '}' or end of input
    fn parse_list(&mut self) -> Result<Vec<FieldPattern>, PatternError> {
        let mut patterns = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some((_, '}')) => break,
                _ => {}
            }

            patterns.push(self.parse_pattern()?);

            self.skip_whitespace();
            match self.peek() {
                Some((_, ',')) => self.bump(),
                _ => break,
            }
        }

        Ok(patterns)
    }

    /// Parse one pattern: an identifier plus zero or more brace groups
    fn parse_pattern(&mut self) -> Result<FieldPattern, PatternError> {
        let name = self.parse_identifier()?;
        let mut children = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some((open_pos, '{')) => {
                    self.bump();
                    let group = self.parse_list()?;
                    if group.is_empty() {
                        return Err(PatternError::EmptyIdentifier {
                            position: open_pos + 1,
                        });
                    }
                    children.extend(group);
                    match self.peek() {
                        Some((_, '}')) => self.bump(),
                        _ => {
                            return Err(PatternError::UnbalancedBraces { position: open_pos });
                        }
                    }
                }
                _ => break,
            }
        }

        Ok(FieldPattern { name, children })
    }

    /// Parse an identifier: any run of characters other than `{ } ,` and
    /// whitespace
    fn parse_identifier(&mut self) -> Result<String, PatternError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut name = String::new();

        while let Some((_, c)) = self.peek() {
            if c == '{' || c == '}' || c == ',' || c.is_whitespace() {
                break;
            }
            name.push(c);
            self.bump();
        }

        if name.is_empty() {
            let position = self.peek().map(|(p, _)| p).unwrap_or(start);
            Err(PatternError::EmptyIdentifier { position })
        } else {
            Ok(name)
        }
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
