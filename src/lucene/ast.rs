//! Syntax tree produced by the Lucene-subset parser.
//!
//! Leaf values are kept exactly as written (escape sequences intact, phrase
//! quotes included) so value normalization happens in one place, in the
//! condition builders.

use std::fmt;

/// One node of a parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `a AND b`, `a && b` and implicit adjacency `a b`.
    And(Vec<Node>),
    /// `a OR b`, `a || b`.
    Or(Vec<Node>),
    /// `NOT a`, `!a`.
    Not(Box<Node>),
    /// `-a`.
    Prohibit(Box<Node>),
    /// `+a`.
    Plus(Box<Node>),
    /// `name:expr` where `name` is a dotted field path.
    SearchField { name: String, expr: Box<Node> },
    /// Parenthesized expression outside of a field.
    Group(Box<Node>),
    /// Parenthesized expression directly after `field:`.
    FieldGroup(Box<Node>),
    /// Bare term, escapes preserved.
    Word(String),
    /// Quoted phrase, surrounding quotes preserved.
    Phrase(String),
    Range(Range),
    /// `term~` / `term~0.8`
    Fuzzy { term: String, degree: Option<String> },
    /// `"a phrase"~3`
    Proximity { phrase: String, degree: Option<String> },
    /// `expr^2`
    Boost { expr: Box<Node>, force: String },
    /// `/pattern/`
    Regex(String),
}

/// `[low TO high]`, `{low TO high}` or any mix of brackets.
///
/// Endpoints are stored without phrase quotes; `*` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub low: String,
    pub high: String,
    pub include_low: bool,
    pub include_high: bool,
}

impl Node {
    /// Name of the node kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::And(_) => "AndOperation",
            Node::Or(_) => "OrOperation",
            Node::Not(_) => "Not",
            Node::Prohibit(_) => "Prohibit",
            Node::Plus(_) => "Plus",
            Node::SearchField { .. } => "SearchField",
            Node::Group(_) => "Group",
            Node::FieldGroup(_) => "FieldGroup",
            Node::Word(_) => "Word",
            Node::Phrase(_) => "Phrase",
            Node::Range(_) => "Range",
            Node::Fuzzy { .. } => "Fuzzy",
            Node::Proximity { .. } => "Proximity",
            Node::Boost { .. } => "Boost",
            Node::Regex(_) => "Regex",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::And(parts) => write_joined(f, parts, " AND "),
            Node::Or(parts) => write_joined(f, parts, " OR "),
            Node::Not(inner) => write!(f, "NOT {}", inner),
            Node::Prohibit(inner) => write!(f, "-{}", inner),
            Node::Plus(inner) => write!(f, "+{}", inner),
            Node::SearchField { name, expr } => write!(f, "{}:{}", name, expr),
            Node::Group(inner) | Node::FieldGroup(inner) => write!(f, "({})", inner),
            Node::Word(value) | Node::Phrase(value) => f.write_str(value),
            Node::Regex(pattern) => write!(f, "/{}/", pattern),
            Node::Range(range) => write!(
                f,
                "{}{} TO {}{}",
                if range.include_low { '[' } else { '{' },
                range.low,
                range.high,
                if range.include_high { ']' } else { '}' },
            ),
            Node::Fuzzy { term, degree } => {
                write!(f, "{}~{}", term, degree.as_deref().unwrap_or(""))
            }
            Node::Proximity { phrase, degree } => {
                write!(f, "{}~{}", phrase, degree.as_deref().unwrap_or(""))
            }
            Node::Boost { expr, force } => write!(f, "{}^{}", expr, force),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Node], sep: &str) -> fmt::Result {
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", part)?;
    }
    Ok(())
}
