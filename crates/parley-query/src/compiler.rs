//! Rule-based utterance compiler.
//!
//! Routes an utterance either to the update extractor (any update trigger
//! word wins) or to one select handler chosen by a fixed, first-match-wins
//! intent order. Select handlers that cannot find the column or value they
//! need fall back to an unfiltered select over the context table.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::catalog::{Column, ColumnType, SchemaCatalog, SchemaContext};
use crate::error::QueryError;
use crate::types::{
    Aggregate, AggregateFunction, Assignment, Literal, Operator, Ordering, Predicate,
    QueryExpression,
};

// =============================================================================
// Compiled regex sets (compiled once, reused across calls)
// =============================================================================

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid compiler regex")
}

static UPDATE_TRIGGER: LazyLock<Regex> = LazyLock::new(|| re(r"\b(?:update|set|change|modify)\b"));
static SET_KEYWORD: LazyLock<Regex> = LazyLock::new(|| re(r"\bset\b"));
static WHERE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| re(r"\bwhere\b"));
static CLAUSE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| re(r"\s*,\s*|\s+and\s+"));
static ASSIGNMENT_PAIR: LazyLock<Regex> =
    LazyLock::new(|| re(r"^([a-z_][a-z0-9_]*)\b\s*(?:=|:|\bto\b|\bis\b)\s*(.+)$"));
static CONDITION_PAIR: LazyLock<Regex> =
    LazyLock::new(|| re(r"^([a-z_][a-z0-9_]*)\b\s*(?:=|:|\bis\b|\bequals\b)?\s*(.+)$"));

static MAX_WORDS: LazyLock<Regex> = LazyLock::new(|| re(r"\b(?:max|maximum|highest)\b"));
static MIN_WORDS: LazyLock<Regex> = LazyLock::new(|| re(r"\b(?:min|minimum|lowest)\b"));
static AVERAGE_WORDS: LazyLock<Regex> = LazyLock::new(|| re(r"\b(?:average|avg|mean)\b"));
static COUNT_WORDS: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b(?:count|how\s+many|number\s+of)\b"));
static BETWEEN_WORD: LazyLock<Regex> = LazyLock::new(|| re(r"\bbetween\b"));
static BETWEEN_RANGE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\bbetween\s+(-?\d+)\s*(?:and|to|-)\s*(-?\d+)"));
static CONTAINS_WORDS: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b(?:contains?|containing|like|includes?)\b"));
static ORDER_WORDS: LazyLock<Regex> = LazyLock::new(|| re(r"\b(?:order|sort|sorted|ordered)\b"));
static DESCENDING_WORDS: LazyLock<Regex> = LazyLock::new(|| re(r"\b(?:desc|descending)\b"));

static QUOTED: LazyLock<Regex> = LazyLock::new(|| re(r#"'([^']*)'|"([^"]*)""#));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| re(r"-?\d+"));
static WORD_TOKEN: LazyLock<Regex> = LazyLock::new(|| re(r"[^\s,;]+"));

/// Comparison operators, most specific first. The first operator whose
/// pattern occurs anywhere in the utterance is used.
static COMPARISON_OPERATORS: LazyLock<Vec<(Operator, Regex)>> = LazyLock::new(|| {
    vec![
        (
            Operator::Gte,
            re(r">=|\bat\s+least\b|\bgreater\s+than\s+or\s+equal(?:\s+to)?\b"),
        ),
        (
            Operator::Lte,
            re(r"<=|\bat\s+most\b|\bless\s+than\s+or\s+equal(?:\s+to)?\b"),
        ),
        (
            Operator::Neq,
            re(r"!=|<>|\bis\s+not\b|\bnot\s+equals?(?:\s+to)?\b"),
        ),
        (
            Operator::Gt,
            re(r">|\bgreater(?:\s+than)?\b|\bmore\s+than\b|\babove\b"),
        ),
        (
            Operator::Lt,
            re(r"<|\bless(?:\s+than)?\b|\bfewer\s+than\b|\bbelow\b"),
        ),
        (Operator::Eq, re(r"=|\bequals?(?:\s+to)?\b|\bis\b")),
    ]
});

/// Words skipped when the value is read as the next token after an operator.
const FILLER_WORDS: &[&str] = &["the", "a", "an", "to", "than", "of"];

// =============================================================================
// Intent classification
// =============================================================================

/// Select-side intents, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectIntent {
    Max,
    Min,
    Average,
    Count,
    Comparison,
    Between,
    Contains,
    Order,
    StatusShorthand,
}

const SELECT_PRIORITY: [SelectIntent; 9] = [
    SelectIntent::Max,
    SelectIntent::Min,
    SelectIntent::Average,
    SelectIntent::Count,
    SelectIntent::Comparison,
    SelectIntent::Between,
    SelectIntent::Contains,
    SelectIntent::Order,
    SelectIntent::StatusShorthand,
];

impl SelectIntent {
    fn matches(self, ctx: &SchemaContext, text: &str) -> bool {
        match self {
            SelectIntent::Max => MAX_WORDS.is_match(text),
            SelectIntent::Min => MIN_WORDS.is_match(text),
            SelectIntent::Average => AVERAGE_WORDS.is_match(text),
            SelectIntent::Count => COUNT_WORDS.is_match(text),
            SelectIntent::Comparison => detect_operator(text).is_some(),
            SelectIntent::Between => BETWEEN_WORD.is_match(text),
            SelectIntent::Contains => CONTAINS_WORDS.is_match(text),
            SelectIntent::Order => ORDER_WORDS.is_match(text),
            SelectIntent::StatusShorthand => status_predicate(ctx, text).is_some(),
        }
    }
}

/// Utterance in three aligned forms: the trimmed original, its ASCII
/// lowercase, and the lowercase with the contents of quoted literals blanked
/// out. All have identical byte offsets, so spans found in `lower` or
/// `masked` slice `raw` to recover the caller's spelling of a value.
///
/// Keyword, column and separator scans run on `masked` so that text inside
/// quotes is never read as query syntax.
struct Utterance<'a> {
    raw: &'a str,
    lower: String,
    masked: String,
}

impl<'a> Utterance<'a> {
    fn new(input: &'a str) -> Self {
        let raw = input.trim();
        let lower = raw.to_ascii_lowercase();
        let masked = mask_quoted(&lower);
        Self { raw, lower, masked }
    }

    fn original(&self, range: Range<usize>) -> &'a str {
        &self.raw[range]
    }
}

/// Replace every byte between matching quotes with `_`. Quote characters stay
/// in place and whole characters are replaced, so offsets and UTF-8 validity
/// are preserved.
fn mask_quoted(lower: &str) -> String {
    let mut bytes = lower.as_bytes().to_vec();
    for caps in QUOTED.captures_iter(lower) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            bytes[m.range()].fill(b'_');
        }
    }
    String::from_utf8(bytes).unwrap_or_else(|_| lower.to_string())
}

// =============================================================================
// QueryCompiler
// =============================================================================

/// Compiles utterances against a schema catalog.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'c> {
    catalog: &'c SchemaCatalog,
}

impl QueryCompiler<'static> {
    /// Compiler over the process-wide catalog.
    pub fn new() -> Self {
        Self {
            catalog: SchemaCatalog::global(),
        }
    }
}

impl Default for QueryCompiler<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'c> QueryCompiler<'c> {
    pub fn with_catalog(catalog: &'c SchemaCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c SchemaCatalog {
        self.catalog
    }

    /// Compile `utterance` against the context named `context_name`.
    pub fn compile(
        &self,
        context_name: &str,
        utterance: &str,
    ) -> Result<QueryExpression, QueryError> {
        let ctx = self
            .catalog
            .lookup(context_name)
            .ok_or_else(|| QueryError::UnknownContext(context_name.trim().to_uppercase()))?;
        let utterance = Utterance::new(utterance);

        let result = if UPDATE_TRIGGER.is_match(&utterance.masked) {
            compile_update(ctx, &utterance)
        } else {
            compile_select(ctx, &utterance)
        };

        match &result {
            Ok(expr) => debug!(
                context = ctx.name,
                operation = expr.operation(),
                "Utterance compiled"
            ),
            Err(e) => debug!(context = ctx.name, error = %e, "Utterance rejected"),
        }
        result
    }
}

// =============================================================================
// Update extractor
// =============================================================================

fn compile_update(ctx: &SchemaContext, u: &Utterance<'_>) -> Result<QueryExpression, QueryError> {
    let (assign_src, cond_src) = split_update_clauses(&u.masked);

    let assignments: Vec<Assignment> = parse_pairs(ctx, u, assign_src, &ASSIGNMENT_PAIR)?
        .into_iter()
        .map(|(column, value)| Assignment::new(column.name, value))
        .collect();
    let conditions: Vec<Predicate> = parse_pairs(ctx, u, cond_src, &CONDITION_PAIR)?
        .into_iter()
        .map(|(column, value)| Predicate::new(column.name, Operator::Eq, value))
        .collect();

    if assignments.is_empty() || conditions.is_empty() {
        return Err(QueryError::IncompleteUpdate);
    }

    Ok(QueryExpression::Update {
        table: ctx.table.to_string(),
        assignments,
        conditions,
    })
}

/// Byte ranges of the assignment clause and the condition clause.
///
/// The assignment clause follows `set` (or, without `set`, the first trigger
/// word) and runs up to `where`; the condition clause is everything after
/// `where`.
fn split_update_clauses(text: &str) -> (Range<usize>, Range<usize>) {
    let (head_end, conditions) = match WHERE_KEYWORD.find(text) {
        Some(m) => (m.start(), m.end()..text.len()),
        None => (text.len(), text.len()..text.len()),
    };
    let head = &text[..head_end];
    let assign_start = SET_KEYWORD
        .find(head)
        .or_else(|| UPDATE_TRIGGER.find(head))
        .map(|m| m.end())
        .unwrap_or(head_end);
    (assign_start..head_end, conditions)
}

/// Parse `column <op> value` pairs separated by commas or `and`. Pairs naming
/// columns outside the context are ignored; a repeated column keeps the last
/// value.
fn parse_pairs<'x>(
    ctx: &'x SchemaContext,
    u: &Utterance<'_>,
    clause: Range<usize>,
    pair: &Regex,
) -> Result<Vec<(&'x Column, Literal)>, QueryError> {
    let mut pairs: Vec<(&Column, Literal)> = Vec::new();

    for part in split_ranges(&CLAUSE_SEPARATOR, &u.masked, clause) {
        let piece = &u.masked[part.clone()];
        let trimmed_start = piece.len() - piece.trim_start().len();
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let Some(caps) = pair.captures(piece) else {
            continue;
        };
        let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(column) = ctx.column(name.as_str()) else {
            continue;
        };

        let base = part.start + trimmed_start;
        let raw = clean_value(u.original(base + value.start()..base + value.end()));
        if raw.is_empty() {
            continue;
        }
        let literal = coerce(column, raw)?;

        match pairs.iter_mut().find(|(c, _)| c.name == column.name) {
            Some(existing) => existing.1 = literal,
            None => pairs.push((column, literal)),
        }
    }

    Ok(pairs)
}

/// Split `range` of `text` on `sep`, returning the byte ranges between
/// separators.
fn split_ranges(sep: &Regex, text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = range.start;
    for m in sep.find_iter(&text[range.clone()]) {
        out.push(start..range.start + m.start());
        start = range.start + m.end();
    }
    out.push(start..range.end);
    out
}

// =============================================================================
// Select handlers
// =============================================================================

fn compile_select(ctx: &SchemaContext, u: &Utterance<'_>) -> Result<QueryExpression, QueryError> {
    let text = u.masked.as_str();
    let intent = SELECT_PRIORITY
        .iter()
        .copied()
        .find(|intent| intent.matches(ctx, text));

    let compiled = match intent {
        Some(SelectIntent::Max) => extreme(ctx, text, true),
        Some(SelectIntent::Min) => extreme(ctx, text, false),
        Some(SelectIntent::Average) => average(ctx, text),
        Some(SelectIntent::Count) => Some(count(ctx, text)),
        Some(SelectIntent::Comparison) => Some(compile_comparison(ctx, u)?),
        Some(SelectIntent::Between) => between(ctx, u),
        Some(SelectIntent::Contains) => contains(ctx, u),
        Some(SelectIntent::Order) => order(ctx, text),
        Some(SelectIntent::StatusShorthand) => status_predicate(ctx, text).map(|p| {
            QueryExpression::Select {
                table: ctx.table.to_string(),
                predicates: vec![p],
            }
        }),
        None => None,
    };

    Ok(compiled.unwrap_or_else(|| {
        if intent.is_some() {
            debug!(context = ctx.name, ?intent, "Falling back to unfiltered select");
        }
        QueryExpression::select_all(ctx.table)
    }))
}

fn extreme(ctx: &SchemaContext, text: &str, descending: bool) -> Option<QueryExpression> {
    let column = find_column(ctx, text)?;
    Some(QueryExpression::SelectOrdered {
        table: ctx.table.to_string(),
        predicates: Vec::new(),
        ordering: Ordering {
            column: column.name.to_string(),
            descending,
        },
        limit: Some(1),
    })
}

fn average(ctx: &SchemaContext, text: &str) -> Option<QueryExpression> {
    let column = find_column(ctx, text).filter(|c| c.kind == ColumnType::Integer)?;
    Some(QueryExpression::SelectAggregate {
        table: ctx.table.to_string(),
        aggregate: Aggregate {
            function: AggregateFunction::Avg,
            column: column.name.to_string(),
        },
    })
}

fn count(ctx: &SchemaContext, text: &str) -> QueryExpression {
    QueryExpression::SelectCount {
        table: ctx.table.to_string(),
        predicates: status_predicate(ctx, text).into_iter().collect(),
    }
}

fn between(ctx: &SchemaContext, u: &Utterance<'_>) -> Option<QueryExpression> {
    let text = u.masked.as_str();
    let column = find_column(ctx, text)?;

    let bounds: Vec<i64> = match BETWEEN_RANGE.captures(text) {
        Some(caps) => [caps.get(1), caps.get(2)]
            .into_iter()
            .flatten()
            .filter_map(|m| m.as_str().parse().ok())
            .collect(),
        None => NUMBER
            .find_iter(text)
            .take(2)
            .filter_map(|m| m.as_str().parse().ok())
            .collect(),
    };
    let &[a, b] = bounds.as_slice() else {
        return None;
    };
    let (low, high) = (a.min(b), a.max(b));

    let literal = |n: i64| match column.kind {
        ColumnType::Integer => Literal::Integer(n),
        ColumnType::String => Literal::Text(n.to_string()),
    };
    Some(QueryExpression::Select {
        table: ctx.table.to_string(),
        predicates: vec![
            Predicate::new(column.name, Operator::Gte, literal(low)),
            Predicate::new(column.name, Operator::Lte, literal(high)),
        ],
    })
}

/// `LIKE` only applies to text columns; integer columns fall back.
fn contains(ctx: &SchemaContext, u: &Utterance<'_>) -> Option<QueryExpression> {
    let text = u.masked.as_str();
    let column = find_column(ctx, text).filter(|c| c.kind == ColumnType::String)?;
    let keyword = CONTAINS_WORDS.find(text)?;

    let value = quoted_literal(u).or_else(|| next_token(u, keyword.end()))?;
    Some(QueryExpression::Select {
        table: ctx.table.to_string(),
        predicates: vec![Predicate::new(
            column.name,
            Operator::Like,
            Literal::Text(value.to_string()),
        )],
    })
}

fn order(ctx: &SchemaContext, text: &str) -> Option<QueryExpression> {
    let column = find_column(ctx, text)?;
    Some(QueryExpression::SelectOrdered {
        table: ctx.table.to_string(),
        predicates: Vec::new(),
        ordering: Ordering {
            column: column.name.to_string(),
            descending: DESCENDING_WORDS.is_match(text),
        },
        limit: None,
    })
}

/// Explicit comparison. Unlike the other select handlers a missing column or
/// value is reported to the caller.
fn compile_comparison(
    ctx: &SchemaContext,
    u: &Utterance<'_>,
) -> Result<QueryExpression, QueryError> {
    let text = u.masked.as_str();
    let column =
        find_column(ctx, text).ok_or_else(|| QueryError::ColumnNotFound(ctx.name.to_string()))?;
    let (operator, op_end) =
        detect_operator(text).ok_or_else(|| QueryError::MissingValue(column.name.to_string()))?;

    let raw = value_after(u, op_end, column.kind)
        .ok_or_else(|| QueryError::MissingValue(column.name.to_string()))?;
    let value = coerce(column, raw)?;

    Ok(QueryExpression::Select {
        table: ctx.table.to_string(),
        predicates: vec![Predicate::new(column.name, operator, value)],
    })
}

// =============================================================================
// Extraction helpers
// =============================================================================

/// First context column (in declared order) named as a whole word.
fn find_column<'x>(ctx: &'x SchemaContext, text: &str) -> Option<&'x Column> {
    ctx.columns.iter().find(|c| contains_word(text, c.name))
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let end = start + word.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn detect_operator(text: &str) -> Option<(Operator, usize)> {
    COMPARISON_OPERATORS
        .iter()
        .find_map(|(op, re)| re.find(text).map(|m| (*op, m.end())))
}

/// `status = <value>` when the context has a status column and one of its
/// canonical status values appears as a word.
fn status_predicate(ctx: &SchemaContext, text: &str) -> Option<Predicate> {
    ctx.column("status")?;
    ctx.status_values
        .iter()
        .find(|v| contains_word(text, &v.to_ascii_lowercase()))
        .map(|v| Predicate::new("status", Operator::Eq, Literal::Text(v.to_string())))
}

/// Value following an operator: a quoted literal, a digit run for integer
/// columns, or else the next non-filler word.
fn value_after<'a>(u: &Utterance<'a>, from: usize, kind: ColumnType) -> Option<&'a str> {
    let rest = &u.lower[from..];
    if let Some(caps) = QUOTED.captures(rest) {
        let m = caps.get(1).or_else(|| caps.get(2))?;
        return Some(u.original(from + m.start()..from + m.end()));
    }
    if kind == ColumnType::Integer {
        if let Some(m) = NUMBER.find(rest) {
            return Some(u.original(from + m.start()..from + m.end()));
        }
    }
    next_token(u, from)
}

fn quoted_literal<'a>(u: &Utterance<'a>) -> Option<&'a str> {
    let caps = QUOTED.captures(&u.lower)?;
    let m = caps.get(1).or_else(|| caps.get(2))?;
    Some(u.original(m.range()))
}

fn next_token<'a>(u: &Utterance<'a>, from: usize) -> Option<&'a str> {
    WORD_TOKEN
        .find_iter(&u.lower[from..])
        .map(|m| clean_value(u.original(from + m.start()..from + m.end())))
        .find(|t| !t.is_empty() && !FILLER_WORDS.contains(&t.to_ascii_lowercase().as_str()))
}

/// Trim whitespace, trailing sentence punctuation and matching quotes.
fn clean_value(raw: &str) -> &str {
    let v = raw.trim().trim_end_matches(['?', '!', '.', ';']);
    let v = v.trim();
    for q in ['\'', '"'] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return v[1..v.len() - 1].trim();
        }
    }
    v
}

fn coerce(column: &Column, raw: &str) -> Result<Literal, QueryError> {
    match column.kind {
        ColumnType::String => Ok(Literal::Text(raw.to_string())),
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(Literal::Integer)
            .map_err(|_| QueryError::ValueParseError {
                column: column.name.to_string(),
                value: raw.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(context: &str, utterance: &str) -> Result<QueryExpression, QueryError> {
        QueryCompiler::new().compile(context, utterance)
    }

    fn text(s: &str) -> Literal {
        Literal::Text(s.to_string())
    }

    // ---- Context resolution ----

    #[test]
    fn test_unknown_context() {
        assert_eq!(
            compile("orders", "show everything"),
            Err(QueryError::UnknownContext("ORDERS".to_string()))
        );
    }

    #[test]
    fn test_context_name_is_case_insensitive() {
        assert_eq!(compile("users", "count"), compile("USERS", "count"));
    }

    // ---- Aggregates ----

    #[test]
    fn test_show_max_age() {
        assert_eq!(
            compile("USERS", "show max age").unwrap(),
            QueryExpression::SelectOrdered {
                table: "users".into(),
                predicates: vec![],
                ordering: Ordering {
                    column: "age".into(),
                    descending: true
                },
                limit: Some(1),
            }
        );
    }

    #[test]
    fn test_minimum_age_is_ascending() {
        match compile("USERS", "Who has the MINIMUM age?").unwrap() {
            QueryExpression::SelectOrdered {
                ordering, limit, ..
            } => {
                assert_eq!(ordering.column, "age");
                assert!(!ordering.descending);
                assert_eq!(limit, Some(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_max_without_column_degrades() {
        assert_eq!(
            compile("USERS", "show the max").unwrap(),
            QueryExpression::select_all("users")
        );
    }

    #[test]
    fn test_max_beats_count() {
        assert!(matches!(
            compile("USERS", "count the max age").unwrap(),
            QueryExpression::SelectOrdered { .. }
        ));
    }

    #[test]
    fn test_average_age() {
        assert_eq!(
            compile("USERS", "average age of users").unwrap(),
            QueryExpression::SelectAggregate {
                table: "users".into(),
                aggregate: Aggregate {
                    function: AggregateFunction::Avg,
                    column: "age".into()
                },
            }
        );
    }

    #[test]
    fn test_average_of_text_column_degrades() {
        assert_eq!(
            compile("USERS", "average name").unwrap(),
            QueryExpression::select_all("users")
        );
    }

    #[test]
    fn test_count_contracts() {
        assert_eq!(
            compile("CONTRACTS", "count").unwrap(),
            QueryExpression::SelectCount {
                table: "contracts".into(),
                predicates: vec![]
            }
        );
    }

    #[test]
    fn test_how_many_pending_contracts() {
        assert_eq!(
            compile("CONTRACTS", "how many pending contracts").unwrap(),
            QueryExpression::SelectCount {
                table: "contracts".into(),
                predicates: vec![Predicate::new("status", Operator::Eq, text("PENDING"))]
            }
        );
    }

    // ---- Comparisons ----

    #[test]
    fn test_greater_than() {
        assert_eq!(
            compile("USERS", "show users with age greater than 30").unwrap(),
            QueryExpression::Select {
                table: "users".into(),
                predicates: vec![Predicate::new("age", Operator::Gt, Literal::Integer(30))]
            }
        );
    }

    #[test]
    fn test_symbolic_operators() {
        let cases = [
            ("age >= 18", Operator::Gte),
            ("age <= 65", Operator::Lte),
            ("age > 18", Operator::Gt),
            ("age < 18", Operator::Lt),
            ("age = 18", Operator::Eq),
            ("age != 18", Operator::Neq),
            ("age at least 18", Operator::Gte),
            ("age below 18", Operator::Lt),
        ];
        for (utterance, expected) in cases {
            match compile("USERS", utterance).unwrap() {
                QueryExpression::Select { predicates, .. } => {
                    assert_eq!(predicates.len(), 1, "{utterance}");
                    assert_eq!(predicates[0].operator, expected, "{utterance}");
                    assert_eq!(predicates[0].column, "age");
                }
                other => panic!("{utterance}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_text_equality_keeps_original_case() {
        assert_eq!(
            compile("USERS", "list users where name is Grace").unwrap(),
            QueryExpression::Select {
                table: "users".into(),
                predicates: vec![Predicate::new("name", Operator::Eq, text("Grace"))]
            }
        );
    }

    #[test]
    fn test_quoted_text_value() {
        match compile("CONTRACTS", "email equals 'Ada@Example.com'").unwrap() {
            QueryExpression::Select { predicates, .. } => {
                assert_eq!(predicates[0].column, "email");
                assert_eq!(predicates[0].value, text("Ada@Example.com"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_comparison_errors_surface() {
        assert_eq!(
            compile("USERS", "age >"),
            Err(QueryError::MissingValue("age".into()))
        );
        assert_eq!(
            compile("USERS", "something > 4"),
            Err(QueryError::ColumnNotFound("USERS".into()))
        );
        assert_eq!(
            compile("USERS", "age is old"),
            Err(QueryError::ValueParseError {
                column: "age".into(),
                value: "old".into()
            })
        );
    }

    // ---- Between / contains / order ----

    #[test]
    fn test_between() {
        assert_eq!(
            compile("USERS", "users with age between 40 and 20").unwrap(),
            QueryExpression::Select {
                table: "users".into(),
                predicates: vec![
                    Predicate::new("age", Operator::Gte, Literal::Integer(20)),
                    Predicate::new("age", Operator::Lte, Literal::Integer(40)),
                ]
            }
        );
    }

    #[test]
    fn test_between_needs_two_numbers() {
        assert_eq!(
            compile("USERS", "age between 20").unwrap(),
            QueryExpression::select_all("users")
        );
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            compile("CONTRACTS", "address contains Baker").unwrap(),
            QueryExpression::Select {
                table: "contracts".into(),
                predicates: vec![Predicate::new("address", Operator::Like, text("Baker"))]
            }
        );
    }

    #[test]
    fn test_contains_prefers_quoted_literal() {
        match compile("USERS", "email like \"gmail\"").unwrap() {
            QueryExpression::Select { predicates, .. } => {
                assert_eq!(predicates[0].value, text("gmail"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_operator_word_inside_quotes_is_a_value() {
        assert_eq!(
            compile("USERS", "name contains 'is'").unwrap(),
            QueryExpression::Select {
                table: "users".into(),
                predicates: vec![Predicate::new("name", Operator::Like, text("is"))]
            }
        );
    }

    #[test]
    fn test_column_name_inside_quotes_is_ignored() {
        assert_eq!(
            compile("USERS", "name contains 'age'").unwrap(),
            QueryExpression::Select {
                table: "users".into(),
                predicates: vec![Predicate::new("name", Operator::Like, text("age"))]
            }
        );
    }

    #[test]
    fn test_mask_quoted_keeps_offsets() {
        let masked = mask_quoted("name = 'é and b', x = \"y\"");
        assert_eq!(masked, "name = '________', x = \"_\"");
        assert_eq!(masked.len(), "name = 'é and b', x = \"y\"".len());
    }

    #[test]
    fn test_contains_on_integer_column_degrades() {
        assert_eq!(
            compile("USERS", "age contains 3").unwrap(),
            QueryExpression::select_all("users")
        );
    }

    #[test]
    fn test_sort_by_name_descending() {
        assert_eq!(
            compile("USERS", "sort by name desc").unwrap(),
            QueryExpression::SelectOrdered {
                table: "users".into(),
                predicates: vec![],
                ordering: Ordering {
                    column: "name".into(),
                    descending: true
                },
                limit: None,
            }
        );
    }

    #[test]
    fn test_order_defaults_ascending() {
        match compile("CONTRACTS", "order by email").unwrap() {
            QueryExpression::SelectOrdered { ordering, .. } => assert!(!ordering.descending),
            other => panic!("unexpected {other:?}"),
        }
    }

    // ---- Status shorthand / default ----

    #[test]
    fn test_status_shorthand() {
        assert_eq!(
            compile("USERS", "show inactive users").unwrap(),
            QueryExpression::Select {
                table: "users".into(),
                predicates: vec![Predicate::new("status", Operator::Eq, text("inactive"))]
            }
        );
    }

    #[test]
    fn test_status_shorthand_uses_canonical_value() {
        match compile("CONTRACTS", "list completed contracts").unwrap() {
            QueryExpression::Select { predicates, .. } => {
                assert_eq!(predicates[0].value, text("COMPLETED"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_default_select_all() {
        assert_eq!(
            compile("USERS", "show users").unwrap(),
            QueryExpression::select_all("users")
        );
    }

    // ---- Updates ----

    #[test]
    fn test_update_set_where() {
        assert_eq!(
            compile("USERS", "update set status = active where id = 5").unwrap(),
            QueryExpression::Update {
                table: "users".into(),
                assignments: vec![Assignment::new("status", text("active"))],
                conditions: vec![Predicate::new("id", Operator::Eq, Literal::Integer(5))],
            }
        );
    }

    #[test]
    fn test_update_multiple_assignments() {
        match compile("USERS", "update users set name = 'Ada King', age = 36 where id 2").unwrap()
        {
            QueryExpression::Update {
                assignments,
                conditions,
                ..
            } => {
                assert_eq!(
                    assignments,
                    vec![
                        Assignment::new("name", text("Ada King")),
                        Assignment::new("age", Literal::Integer(36)),
                    ]
                );
                assert_eq!(
                    conditions,
                    vec![Predicate::new("id", Operator::Eq, Literal::Integer(2))]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_quoted_update_value_keeps_separators() {
        assert_eq!(
            compile("USERS", "set name to 'a and b' where id = 1").unwrap(),
            QueryExpression::Update {
                table: "users".into(),
                assignments: vec![Assignment::new("name", text("a and b"))],
                conditions: vec![Predicate::new("id", Operator::Eq, Literal::Integer(1))],
            }
        );
        match compile("USERS", "update set name = \"Smith, Jo\", status = active where id = 3")
            .unwrap()
        {
            QueryExpression::Update { assignments, .. } => assert_eq!(
                assignments,
                vec![
                    Assignment::new("name", text("Smith, Jo")),
                    Assignment::new("status", text("active")),
                ]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_change_to_without_set() {
        match compile("USERS", "change status to inactive where email is a@b.co").unwrap() {
            QueryExpression::Update {
                assignments,
                conditions,
                ..
            } => {
                assert_eq!(assignments, vec![Assignment::new("status", text("inactive"))]);
                assert_eq!(
                    conditions,
                    vec![Predicate::new("email", Operator::Eq, text("a@b.co"))]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_update_precedence_over_aggregate() {
        assert_eq!(
            compile("USERS", "update and show max age"),
            Err(QueryError::IncompleteUpdate)
        );
    }

    #[test]
    fn test_update_missing_where_is_incomplete() {
        assert_eq!(
            compile("USERS", "set status = active"),
            Err(QueryError::IncompleteUpdate)
        );
    }

    #[test]
    fn test_update_unknown_columns_are_ignored() {
        assert_eq!(
            compile("USERS", "update set colour = red where id = 1"),
            Err(QueryError::IncompleteUpdate)
        );
    }

    #[test]
    fn test_update_integer_column_rejects_text() {
        assert_eq!(
            compile("USERS", "update set age = old where id = 1"),
            Err(QueryError::ValueParseError {
                column: "age".into(),
                value: "old".into()
            })
        );
        assert_eq!(
            compile("USERS", "update set status = active where id = five"),
            Err(QueryError::ValueParseError {
                column: "id".into(),
                value: "five".into()
            })
        );
    }

    #[test]
    fn test_set_inside_word_is_not_a_trigger() {
        assert_eq!(
            compile("USERS", "show users named sunset").unwrap(),
            QueryExpression::select_all("users")
        );
    }

    // ---- Column matching ----

    #[test]
    fn test_column_match_requires_word_boundary() {
        // "username" must not select the `name` column.
        assert_eq!(
            compile("USERS", "sort by username").unwrap(),
            QueryExpression::select_all("users")
        );
    }

    #[test]
    fn test_first_declared_column_wins() {
        match compile("USERS", "sort by age then name").unwrap() {
            QueryExpression::SelectOrdered { ordering, .. } => assert_eq!(ordering.column, "name"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("max age", "age"));
        assert!(contains_word("age>30", "age"));
        assert!(!contains_word("agent", "age"));
        assert!(!contains_word("user_id", "id"));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let utterances = [
            "show max age",
            "update set status = active where id = 5",
            "age between 1 and 9",
            "count",
            "gibberish",
        ];
        for u in utterances {
            assert_eq!(compile("USERS", u), compile("USERS", u), "{u}");
        }
    }

    #[test]
    fn test_custom_catalog() {
        let catalog = SchemaCatalog::new(vec![SchemaContext {
            name: "ORDERS",
            table: "orders",
            columns: vec![Column::new("total", ColumnType::Integer)],
            status_values: vec![],
        }]);
        let compiler = QueryCompiler::with_catalog(&catalog);
        assert!(compiler.compile("USERS", "count").is_err());
        assert!(matches!(
            compiler.compile("orders", "max total").unwrap(),
            QueryExpression::SelectOrdered { .. }
        ));
    }
}
