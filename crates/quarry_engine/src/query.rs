//! Queries over native fields.

use crate::field::{PointValue, Term};
use crate::schema::{EngineSchema, POINTS_FIELD};
use std::ops::Bound;
use tantivy::query::{AllQuery, BooleanQuery, EmptyQuery, Occur, RangeQuery, TermQuery};
use tantivy::schema::IndexRecordOption;

/// A query against the native field model.
///
/// Ranges are inclusive on both ends and only match points of the same
/// numeric kind: an `IntRange` never matches a `Long` point.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every live document.
    All,
    /// Exact match on a keyword value or on a single text token.
    Term(Term),
    /// Analyzes `text` and matches documents containing every token.
    Text {
        /// Field name.
        field: String,
        /// Free text to analyze.
        text: String,
    },
    /// Inclusive range over int points.
    IntRange {
        /// Field name.
        field: String,
        /// Lower bound.
        lower: i32,
        /// Upper bound.
        upper: i32,
    },
    /// Inclusive range over long points.
    LongRange {
        /// Field name.
        field: String,
        /// Lower bound.
        lower: i64,
        /// Upper bound.
        upper: i64,
    },
    /// Inclusive range over float points.
    FloatRange {
        /// Field name.
        field: String,
        /// Lower bound.
        lower: f32,
        /// Upper bound.
        upper: f32,
    },
    /// Inclusive range over double points.
    DoubleRange {
        /// Field name.
        field: String,
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
    /// Boolean composition of sub-queries.
    Boolean {
        /// Clauses that must match.
        must: Vec<Query>,
        /// Clauses of which at least one should match.
        should: Vec<Query>,
        /// Clauses that must not match.
        must_not: Vec<Query>,
    },
}

impl Query {
    /// Exact-match query.
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term(Term::new(field, value))
    }

    /// Analyzed text query.
    pub fn text(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Inclusive int range.
    pub fn int_range(field: impl Into<String>, lower: i32, upper: i32) -> Self {
        Self::IntRange {
            field: field.into(),
            lower,
            upper,
        }
    }

    /// Inclusive long range.
    pub fn long_range(field: impl Into<String>, lower: i64, upper: i64) -> Self {
        Self::LongRange {
            field: field.into(),
            lower,
            upper,
        }
    }

    /// Inclusive float range.
    pub fn float_range(field: impl Into<String>, lower: f32, upper: f32) -> Self {
        Self::FloatRange {
            field: field.into(),
            lower,
            upper,
        }
    }

    /// Inclusive double range.
    pub fn double_range(field: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self::DoubleRange {
            field: field.into(),
            lower,
            upper,
        }
    }

    /// Conjunction of `queries`.
    pub fn all_of(queries: Vec<Query>) -> Self {
        Self::Boolean {
            must: queries,
            should: Vec::new(),
            must_not: Vec::new(),
        }
    }

    /// Disjunction of `queries`.
    pub fn any_of(queries: Vec<Query>) -> Self {
        Self::Boolean {
            must: Vec::new(),
            should: queries,
            must_not: Vec::new(),
        }
    }

    /// Every document not matching `query`.
    pub fn not(query: Query) -> Self {
        Self::Boolean {
            must: Vec::new(),
            should: Vec::new(),
            must_not: vec![query],
        }
    }

    pub(crate) fn to_tantivy(&self, schema: &EngineSchema) -> Box<dyn tantivy::query::Query> {
        match self {
            Self::All => Box::new(AllQuery),
            Self::Term(term) => Box::new(TermQuery::new(
                schema.term(term),
                IndexRecordOption::Basic,
            )),
            Self::Text { field, text } => {
                let clauses: Vec<(Occur, Box<dyn tantivy::query::Query>)> = schema
                    .analyzer()
                    .tokens(text)
                    .into_iter()
                    .map(|token| {
                        let query: Box<dyn tantivy::query::Query> = Box::new(TermQuery::new(
                            schema.term(&Term::new(field.as_str(), token)),
                            IndexRecordOption::Basic,
                        ));
                        (Occur::Must, query)
                    })
                    .collect();
                if clauses.is_empty() {
                    Box::new(EmptyQuery)
                } else {
                    Box::new(BooleanQuery::new(clauses))
                }
            }
            Self::IntRange {
                field,
                lower,
                upper,
            } => point_range(schema, field, PointValue::Int(*lower), PointValue::Int(*upper)),
            Self::LongRange {
                field,
                lower,
                upper,
            } => point_range(
                schema,
                field,
                PointValue::Long(*lower),
                PointValue::Long(*upper),
            ),
            Self::FloatRange {
                field,
                lower,
                upper,
            } => point_range(
                schema,
                field,
                PointValue::Float(*lower),
                PointValue::Float(*upper),
            ),
            Self::DoubleRange {
                field,
                lower,
                upper,
            } => point_range(
                schema,
                field,
                PointValue::Double(*lower),
                PointValue::Double(*upper),
            ),
            Self::Boolean {
                must,
                should,
                must_not,
            } => {
                let mut clauses: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
                // A pure negation needs a positive clause to subtract from.
                if must.is_empty() && should.is_empty() {
                    clauses.push((Occur::Must, Box::new(AllQuery)));
                }
                clauses.extend(must.iter().map(|q| (Occur::Must, q.to_tantivy(schema))));
                clauses.extend(should.iter().map(|q| (Occur::Should, q.to_tantivy(schema))));
                clauses.extend(
                    must_not
                        .iter()
                        .map(|q| (Occur::MustNot, q.to_tantivy(schema))),
                );
                Box::new(BooleanQuery::new(clauses))
            }
        }
    }
}

fn point_range(
    schema: &EngineSchema,
    field: &str,
    lower: PointValue,
    upper: PointValue,
) -> Box<dyn tantivy::query::Query> {
    let lower = schema.point_bound(field, lower);
    let upper = schema.point_bound(field, upper);
    Box::new(RangeQuery::new_str_bounds(
        POINTS_FIELD.to_string(),
        Bound::Included(lower.as_str()),
        Bound::Included(upper.as_str()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(
            Query::term("category", "tech"),
            Query::Term(Term::new("category", "tech"))
        );
        assert!(matches!(
            Query::long_range("price", 75, 125),
            Query::LongRange {
                lower: 75,
                upper: 125,
                ..
            }
        ));
        assert!(matches!(
            Query::not(Query::All),
            Query::Boolean { ref must_not, .. } if must_not.len() == 1
        ));
    }
}
