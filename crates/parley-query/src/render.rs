//! Render a [`QueryExpression`] as SQL text or as a Supabase-style builder
//! chain.

use parley_core::config::QueryRenderer;

use crate::types::{Literal, Operator, Predicate, QueryExpression};

/// Render with the configured renderer.
pub fn render(expr: &QueryExpression, renderer: QueryRenderer) -> String {
    match renderer {
        QueryRenderer::Sql => to_sql(expr),
        QueryRenderer::Fluent => to_fluent(expr),
    }
}

// =============================================================================
// SQL
// =============================================================================

pub fn to_sql(expr: &QueryExpression) -> String {
    match expr {
        QueryExpression::Select { table, predicates } => {
            format!("SELECT * FROM {}{}", table, sql_where(predicates))
        }
        QueryExpression::SelectOrdered {
            table,
            predicates,
            ordering,
            limit,
        } => {
            let mut sql = format!(
                "SELECT * FROM {}{} ORDER BY {} {}",
                table,
                sql_where(predicates),
                ordering.column,
                if ordering.descending { "DESC" } else { "ASC" }
            );
            if let Some(n) = limit {
                sql.push_str(&format!(" LIMIT {}", n));
            }
            sql
        }
        QueryExpression::SelectAggregate { table, aggregate } => {
            format!("SELECT AVG({}) FROM {}", aggregate.column, table)
        }
        QueryExpression::SelectCount { table, predicates } => {
            format!("SELECT COUNT(*) FROM {}{}", table, sql_where(predicates))
        }
        QueryExpression::Update {
            table,
            assignments,
            conditions,
        } => {
            let set = assignments
                .iter()
                .map(|a| format!("{} = {}", a.column, sql_literal(&a.value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("UPDATE {} SET {}{}", table, set, sql_where(conditions))
        }
    }
}

fn sql_where(predicates: &[Predicate]) -> String {
    if predicates.is_empty() {
        return String::new();
    }
    let clauses: Vec<String> = predicates
        .iter()
        .map(|p| match p.operator {
            Operator::Like => format!(
                "{} LIKE {}",
                p.column,
                sql_text(&format!("%{}%", p.value))
            ),
            op => format!("{} {} {}", p.column, op.symbol(), sql_literal(&p.value)),
        })
        .collect();
    format!(" WHERE {}", clauses.join(" AND "))
}

fn sql_literal(value: &Literal) -> String {
    match value {
        Literal::Integer(n) => n.to_string(),
        Literal::Text(s) => sql_text(s),
    }
}

fn sql_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Fluent builder chain
// =============================================================================

pub fn to_fluent(expr: &QueryExpression) -> String {
    match expr {
        QueryExpression::Select { table, predicates } => {
            format!("{}.select(\"*\"){}", fluent_table(table), fluent_filters(predicates))
        }
        QueryExpression::SelectOrdered {
            table,
            predicates,
            ordering,
            limit,
        } => {
            let mut chain = format!(
                "{}.select(\"*\"){}.order({}, desc={})",
                fluent_table(table),
                fluent_filters(predicates),
                quote(&ordering.column),
                if ordering.descending { "True" } else { "False" }
            );
            if let Some(n) = limit {
                chain.push_str(&format!(".limit({})", n));
            }
            chain
        }
        QueryExpression::SelectAggregate { table, aggregate } => format!(
            "{}.select({})",
            fluent_table(table),
            quote(&format!("{}.avg()", aggregate.column))
        ),
        QueryExpression::SelectCount { table, predicates } => format!(
            "{}.select(\"*\", count=\"exact\"){}",
            fluent_table(table),
            fluent_filters(predicates)
        ),
        QueryExpression::Update {
            table,
            assignments,
            conditions,
        } => {
            let fields = assignments
                .iter()
                .map(|a| format!("{}: {}", quote(&a.column), fluent_literal(&a.value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{}.update({{{}}}){}",
                fluent_table(table),
                fields,
                fluent_filters(conditions)
            )
        }
    }
}

fn fluent_table(table: &str) -> String {
    format!("supabase.table({})", quote(table))
}

fn fluent_filters(predicates: &[Predicate]) -> String {
    predicates
        .iter()
        .map(|p| {
            let method = match p.operator {
                Operator::Eq => "eq",
                Operator::Neq => "neq",
                Operator::Gt => "gt",
                Operator::Gte => "gte",
                Operator::Lt => "lt",
                Operator::Lte => "lte",
                Operator::Like => {
                    return format!(
                        ".like({}, {})",
                        quote(&p.column),
                        quote(&format!("%{}%", p.value))
                    )
                }
            };
            format!(".{}({}, {})", method, quote(&p.column), fluent_literal(&p.value))
        })
        .collect()
}

fn fluent_literal(value: &Literal) -> String {
    match value {
        Literal::Integer(n) => n.to_string(),
        Literal::Text(s) => quote(s),
    }
}

/// Double-quoted string literal with JSON escaping.
fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}
