//! Structured query expressions produced by the compiler.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::ColumnType;

/// A typed literal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Integer(i64),
    Text(String),
}

impl Literal {
    pub fn value_type(&self) -> ColumnType {
        match self {
            Literal::Integer(_) => ColumnType::Integer,
            Literal::Text(_) => ColumnType::String,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl Operator {
    /// SQL spelling of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
        }
    }
}

/// A single `column operator value` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub value: Literal,
    pub value_type: ColumnType,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: Operator, value: Literal) -> Self {
        let value_type = value.value_type();
        Self {
            column: column.into(),
            operator,
            value,
            value_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ordering {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Avg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub column: String,
}

/// `column = value` in an update's SET clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub column: String,
    pub value: Literal,
    pub value_type: ColumnType,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: Literal) -> Self {
        let value_type = value.value_type();
        Self {
            column: column.into(),
            value,
            value_type,
        }
    }
}

/// Compiler output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum QueryExpression {
    Select {
        table: String,
        predicates: Vec<Predicate>,
    },
    SelectOrdered {
        table: String,
        predicates: Vec<Predicate>,
        ordering: Ordering,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
    SelectAggregate {
        table: String,
        aggregate: Aggregate,
    },
    SelectCount {
        table: String,
        predicates: Vec<Predicate>,
    },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        conditions: Vec<Predicate>,
    },
}

impl QueryExpression {
    /// Unfiltered select over a table.
    pub fn select_all(table: impl Into<String>) -> Self {
        QueryExpression::Select {
            table: table.into(),
            predicates: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        match self {
            QueryExpression::Select { table, .. }
            | QueryExpression::SelectOrdered { table, .. }
            | QueryExpression::SelectAggregate { table, .. }
            | QueryExpression::SelectCount { table, .. }
            | QueryExpression::Update { table, .. } => table,
        }
    }

    /// Operation name, matching the serialized `operation` tag.
    pub fn operation(&self) -> &'static str {
        match self {
            QueryExpression::Select { .. } => "select",
            QueryExpression::SelectOrdered { .. } => "select_ordered",
            QueryExpression::SelectAggregate { .. } => "select_aggregate",
            QueryExpression::SelectCount { .. } => "select_count",
            QueryExpression::Update { .. } => "update",
        }
    }
}
