//! Query compiler: walks a parsed query and produces a [`Predicate`].
//!
//! The object kind bound by the query is threaded through the walk as an
//! explicit value: every call receives the binding established so far and
//! returns the binding after its subtree. `AND`/`OR` operands are compiled
//! left to right, so the first concrete kind named anywhere in the query
//! fixes it for all later fields without an alias prefix.

use crate::backend::ObjectRepository;
use crate::error::SearchError;
use crate::lucene::Node;
use crate::model::ObjectKind;
use crate::predicate::Predicate;
use crate::principal::Principal;
use crate::query::conditions::{build_condition, ConditionContext, Leaf};
use crate::query::fields::{resolve, ResolvedField};
use tracing::debug;

/// Kind bound so far; `None` until a field has been resolved.
pub type Binding = Option<ObjectKind>;

/// Compiles query trees for one principal.
pub struct QueryCompiler<'a> {
    ctx: ConditionContext<'a>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(principal: &'a Principal, repository: &'a dyn ObjectRepository) -> Self {
        Self {
            ctx: ConditionContext {
                principal,
                repository,
            },
        }
    }

    /// Compiles `node` starting from `binding`.
    ///
    /// Returns the predicate and the binding in effect after the whole tree.
    pub fn compile(&self, node: &Node, binding: Binding) -> Result<(Predicate, Binding), SearchError> {
        self.visit(node, binding, None)
    }

    fn visit(
        &self,
        node: &Node,
        binding: Binding,
        field: Option<&ResolvedField>,
    ) -> Result<(Predicate, Binding), SearchError> {
        match node {
            Node::And(parts) => {
                let (predicates, binding) = self.visit_all(parts, binding, field)?;
                Ok((Predicate::And(predicates), binding))
            }
            Node::Or(parts) => {
                let (predicates, binding) = self.visit_all(parts, binding, field)?;
                Ok((Predicate::Or(predicates), binding))
            }
            Node::Not(inner) | Node::Prohibit(inner) => {
                let (predicate, binding) = self.visit(inner, binding, field)?;
                Ok((predicate.negate(), binding))
            }
            Node::Group(inner) | Node::FieldGroup(inner) => self.visit(inner, binding, field),
            Node::SearchField { name, expr } => {
                let resolved = resolve(name, binding)?;
                let binding = bind(binding, resolved.kind)?;
                debug!(field = %name, kind = %resolved.kind, "resolved search field");
                self.visit(expr, binding, Some(&resolved))
            }
            Node::Word(value) => Ok((self.leaf(field, Leaf::Term(value))?, binding)),
            Node::Phrase(phrase) => {
                let value = strip_quotes(phrase);
                Ok((self.leaf(field, Leaf::Term(value))?, binding))
            }
            Node::Range(range) => Ok((self.leaf(field, Leaf::Range(range))?, binding)),
            other => Err(SearchError::unsupported(format!(
                "{} is not supported",
                other.kind_name()
            ))),
        }
    }

    fn visit_all(
        &self,
        parts: &[Node],
        mut binding: Binding,
        field: Option<&ResolvedField>,
    ) -> Result<(Vec<Predicate>, Binding), SearchError> {
        let mut predicates = Vec::with_capacity(parts.len());
        for part in parts {
            let (predicate, next) = self.visit(part, binding, field)?;
            predicates.push(predicate);
            binding = next;
        }
        Ok((predicates, binding))
    }

    fn leaf(&self, field: Option<&ResolvedField>, leaf: Leaf<'_>) -> Result<Predicate, SearchError> {
        let field = field.ok_or_else(|| SearchError::not_queryable("You must specify a field"))?;
        build_condition(&self.ctx, field, leaf)
    }
}

/// Narrows `binding` with a field of `kind`.
///
/// The generic object kind is compatible with everything; two different
/// concrete kinds are not.
pub fn bind(binding: Binding, kind: ObjectKind) -> Result<Binding, SearchError> {
    match binding {
        Some(current) if current.is_concrete() && kind.is_concrete() && kind != current => {
            Err(SearchError::MultipleObjectsQuery {
                message: format!(
                    "Can't search for {} and {} objects in the same query",
                    current, kind
                ),
            })
        }
        Some(current) if current.is_concrete() => Ok(Some(current)),
        _ => Ok(Some(kind)),
    }
}

fn strip_quotes(phrase: &str) -> &str {
    phrase
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(phrase)
}
