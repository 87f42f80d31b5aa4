//! Schema catalog: the fixed set of contexts a query can target.

use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

/// Declared type of a context column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    Integer,
    String,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::String => write!(f, "STRING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self { name, kind }
    }
}

/// A named schema: target table plus its ordered, typed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaContext {
    /// Uppercase context name.
    pub name: &'static str,
    pub table: &'static str,
    pub columns: Vec<Column>,
    /// Canonical values of the `status` column, used by the status shorthand
    /// ("show active users").
    pub status_values: Vec<&'static str>,
}

impl SchemaContext {
    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Immutable registry of schema contexts, in registration order.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    contexts: Vec<SchemaContext>,
}

static CATALOG: LazyLock<SchemaCatalog> = LazyLock::new(|| {
    use ColumnType::{Integer, String as Text};

    SchemaCatalog::new(vec![
        SchemaContext {
            name: "USERS",
            table: "users",
            columns: vec![
                Column::new("id", Integer),
                Column::new("name", Text),
                Column::new("email", Text),
                Column::new("age", Integer),
                Column::new("status", Text),
            ],
            status_values: vec!["active", "inactive"],
        },
        SchemaContext {
            name: "CONTRACTS",
            table: "contracts",
            columns: vec![
                Column::new("id", Integer),
                Column::new("email", Text),
                Column::new("name", Text),
                Column::new("phone", Text),
                Column::new("address", Text),
                Column::new("status", Text),
            ],
            status_values: vec!["PENDING", "COMPLETED"],
        },
    ])
});

impl SchemaCatalog {
    pub fn new(contexts: Vec<SchemaContext>) -> Self {
        Self { contexts }
    }

    /// The process-wide catalog.
    pub fn global() -> &'static SchemaCatalog {
        &CATALOG
    }

    /// Case-insensitive lookup by context name.
    pub fn lookup(&self, name: &str) -> Option<&SchemaContext> {
        let name = name.trim();
        self.contexts
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// All registered context names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.contexts.iter().map(|c| c.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = SchemaCatalog::global();
        for name in ["USERS", "users", "Users", " uSeRs "] {
            assert_eq!(catalog.lookup(name).unwrap().table, "users");
        }
        assert_eq!(catalog.lookup("contracts").unwrap().table, "contracts");
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let catalog = SchemaCatalog::global();
        assert_eq!(catalog.lookup("USERS"), catalog.lookup("USERS"));
    }

    #[test]
    fn test_unknown_context() {
        let catalog = SchemaCatalog::global();
        assert!(catalog.lookup("ORDERS").is_none());
        assert!(catalog.lookup("").is_none());
    }

    #[test]
    fn test_names_in_registration_order() {
        assert_eq!(SchemaCatalog::global().names(), vec!["USERS", "CONTRACTS"]);
    }

    #[test]
    fn test_column_order_and_types() {
        let users = SchemaCatalog::global().lookup("USERS").unwrap();
        let names: Vec<_> = users.columns.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["id", "name", "email", "age", "status"]);
        assert_eq!(users.column("age").unwrap().kind, ColumnType::Integer);
        assert_eq!(users.column("email").unwrap().kind, ColumnType::String);
        assert!(users.column("phone").is_none());
    }
}
