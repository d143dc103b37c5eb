//! The SELECT accumulator.
//!
//! A [`Query`] collects clauses through `&mut self` mutators in any order
//! and renders them in one go. Rendering is terminal: the accumulator is
//! reset afterwards so the same handle can build the next query. A `Query`
//! belongs to one caller at a time; clone it to hand a copy elsewhere.
//!
//! Predicates use `?` as a dialect independent placeholder. Markers are
//! substituted in a single left-to-right pass over the assembled statement,
//! so their numbering follows the textual clause order:
//! SELECT, JOIN, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET. The
//! argument vector is built in that same order.

use crate::dialect::Dialect;
use crate::value::Value;

/// The kind of a JOIN clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
        }
    }
}

/// `<kind> JOIN table ON anchor.anchor_column = table.joined_column`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Join {
    kind: JoinKind,
    table: String,
    anchor_column: String,
    joined_column: String,
}

/// Accumulated state of one SELECT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    table: String,
    columns: Vec<String>,
    joins: Vec<Join>,
    wheres: Vec<String>,
    where_args: Vec<Value>,
    group_by: Option<String>,
    having: Option<String>,
    having_args: Vec<Value>,
    order_by: Option<String>,
    limit: u64,
    offset: u64,
    marker_pos: usize,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the table and the selected columns. No columns selects `*`.
    pub fn select(&mut self, table: &str, columns: &[&str]) -> &mut Self {
        self.table = table.to_string();
        self.columns = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Returns the selected table, empty if none was set.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Adds a predicate. Multiple predicates are ANDed in call order.
    pub fn where_clause(&mut self, predicate: &str, args: &[Value]) -> &mut Self {
        self.wheres.push(predicate.to_string());
        self.where_args.extend_from_slice(args);
        self
    }

    /// Joins `table` on `<select table>.anchor_column = table.joined_column`.
    pub fn join(
        &mut self,
        kind: JoinKind,
        table: &str,
        anchor_column: &str,
        joined_column: &str,
    ) -> &mut Self {
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            anchor_column: anchor_column.to_string(),
            joined_column: joined_column.to_string(),
        });
        self
    }

    pub fn group_by(&mut self, column: &str) -> &mut Self {
        self.group_by = Some(column.to_string());
        self
    }

    /// Sets the HAVING condition, replacing any earlier one together with
    /// its arguments. Its arguments are bound after the WHERE arguments.
    pub fn having(&mut self, condition: &str, args: &[Value]) -> &mut Self {
        self.having = Some(condition.to_string());
        self.having_args = args.to_vec();
        self
    }

    pub fn order_by(&mut self, column: &str) -> &mut Self {
        self.order_by = Some(column.to_string());
        self
    }

    /// Sets the LIMIT, 0 means none.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = limit;
        self
    }

    /// Sets the OFFSET, 0 means none.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Clears all accumulated state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Renders the statement and its arguments, then resets.
    ///
    /// # Panics
    ///
    /// Panics if no table was selected.
    pub fn render(&mut self, dialect: &dyn Dialect) -> (String, Vec<Value>) {
        assert!(!self.table.is_empty(), "query has no table to select from");

        let mut clauses = Vec::with_capacity(8);
        let mut args = Vec::new();

        let selector = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| dialect.quote(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        clauses.push(format!(
            "SELECT {selector} FROM {}",
            dialect.quote(&self.table)
        ));

        for join in &self.joins {
            clauses.push(format!(
                "{} JOIN {} ON {}.{} = {}.{}",
                join.kind.keyword(),
                dialect.quote(&join.table),
                dialect.quote(&self.table),
                dialect.quote(&join.anchor_column),
                dialect.quote(&join.table),
                dialect.quote(&join.joined_column),
            ));
        }

        if !self.wheres.is_empty() {
            clauses.push(format!("WHERE {}", self.wheres.join(" AND ")));
            args.append(&mut self.where_args);
        }

        if let Some(column) = &self.group_by {
            clauses.push(format!("GROUP BY {}", dialect.quote(column)));
        }

        if let Some(condition) = &self.having {
            clauses.push(format!("HAVING {condition}"));
            args.append(&mut self.having_args);
        }

        if let Some(column) = &self.order_by {
            clauses.push(format!("ORDER BY {}", dialect.quote(column)));
        }

        if self.limit > 0 {
            clauses.push("LIMIT ?".to_string());
            args.push(Value::U64(self.limit));
        }

        if self.offset > 0 {
            clauses.push("OFFSET ?".to_string());
            args.push(Value::U64(self.offset));
        }

        let sql = self.substitute_markers(&clauses.join(" "), dialect);
        self.reset();
        (sql, args)
    }

    /// Replaces every `?` in `sql` with the dialect marker for the next
    /// position.
    pub fn substitute_markers(&mut self, sql: &str, dialect: &dyn Dialect) -> String {
        let mut out = String::with_capacity(sql.len() + 8);
        for c in sql.chars() {
            if c == '?' {
                out.push_str(&dialect.next_marker(&mut self.marker_pos));
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Number of markers substituted since the last reset.
    #[must_use]
    pub const fn marker_position(&self) -> usize {
        self.marker_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};

    const PG: PostgresDialect = PostgresDialect::new();
    const LITE: SqliteDialect = SqliteDialect::new();

    #[test]
    fn test_select_all() {
        let (sql, args) = Query::new().select("users", &[]).render(&PG);
        assert_eq!(sql, r#"SELECT * FROM "users""#);
        assert!(args.is_empty());
    }

    #[test]
    fn test_select_columns() {
        let (sql, _) = Query::new().select("users", &["id", "name"]).render(&PG);
        assert_eq!(sql, r#"SELECT "id", "name" FROM "users""#);
    }

    #[test]
    fn test_where_clauses_are_anded() {
        let (sql, args) = Query::new()
            .select("users", &[])
            .where_clause("id > ?", &[3.into()])
            .where_clause("name = ? OR name = ?", &["a".into(), "b".into()])
            .render(&PG);
        assert_eq!(
            sql,
            r#"SELECT * FROM "users" WHERE id > $1 AND name = $2 OR name = $3"#
        );
        assert_eq!(args, vec![Value::I32(3), "a".into(), "b".into()]);
    }

    #[test]
    fn test_markers_numbered_across_clauses() {
        let (sql, args) = Query::new()
            .select("orders", &["user_id"])
            .where_clause("amount > ?", &[10.into()])
            .group_by("user_id")
            .having("COUNT(*) > ?", &[2.into()])
            .order_by("user_id")
            .limit(5)
            .offset(20)
            .render(&PG);
        assert_eq!(
            sql,
            r#"SELECT "user_id" FROM "orders" WHERE amount > $1 GROUP BY "user_id" HAVING COUNT(*) > $2 ORDER BY "user_id" LIMIT $3 OFFSET $4"#
        );
        assert_eq!(
            args,
            vec![Value::I32(10), Value::I32(2), Value::U64(5), Value::U64(20)]
        );
    }

    #[test]
    fn test_second_having_replaces_first() {
        let (sql, args) = Query::new()
            .select("t", &[])
            .group_by("a")
            .having("COUNT(*) > ?", &[Value::I64(1)])
            .having("SUM(b) > ?", &[Value::I64(2)])
            .render(&PG);
        assert_eq!(sql, r#"SELECT * FROM "t" GROUP BY "a" HAVING SUM(b) > $1"#);
        assert_eq!(args, vec![Value::I64(2)]);
    }

    #[test]
    fn test_marker_count_matches_args() {
        for having_args in 0..3 {
            let mut query = Query::new();
            let marks = vec!["?"; having_args].join(" + ");
            let extra: Vec<Value> = (0..having_args).map(|i| Value::I64(i as i64)).collect();
            query
                .select("t", &[])
                .where_clause("a = ? AND b = ?", &[1.into(), 2.into()])
                .limit(1);
            if having_args > 0 {
                query.having(&format!("SUM(x) > {marks}"), &extra);
            }
            let (sql, args) = query.render(&PG);
            let markers = sql.matches('$').count();
            assert_eq!(markers, args.len());
            for n in 1..=args.len() {
                assert!(sql.contains(&format!("${n}")));
            }
            let positions: Vec<usize> = (1..=args.len())
                .map(|n| sql.find(&format!("${n}")).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_sqlite_markers() {
        let (sql, args) = Query::new()
            .select("users", &[])
            .where_clause("id = ?", &[1.into()])
            .limit(2)
            .render(&LITE);
        assert_eq!(sql, r#"SELECT * FROM "users" WHERE id = ? LIMIT ?"#);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_joins_in_call_order() {
        let (sql, _) = Query::new()
            .select("users", &[])
            .join(JoinKind::Inner, "orders", "id", "user_id")
            .join(JoinKind::Left, "profiles", "id", "user_id")
            .join(JoinKind::Full, "audits", "id", "actor_id")
            .render(&LITE);
        assert_eq!(
            sql,
            concat!(
                r#"SELECT * FROM "users" "#,
                r#"INNER JOIN "orders" ON "users"."id" = "orders"."user_id" "#,
                r#"LEFT JOIN "profiles" ON "users"."id" = "profiles"."user_id" "#,
                r#"FULL JOIN "audits" ON "users"."id" = "audits"."actor_id""#,
            )
        );
        assert_eq!(JoinKind::Right.keyword(), "RIGHT");
    }

    #[test]
    fn test_render_resets_state() {
        let mut query = Query::new();
        query
            .select("users", &["id"])
            .where_clause("id = ?", &[1.into()])
            .limit(1);
        let _ = query.render(&PG);
        assert_eq!(query, Query::new());
        let (sql, args) = query
            .select("users", &[])
            .where_clause("id = ?", &[2.into()])
            .render(&PG);
        assert_eq!(sql, r#"SELECT * FROM "users" WHERE id = $1"#);
        assert_eq!(args, vec![Value::I32(2)]);
    }

    #[test]
    #[should_panic(expected = "no table")]
    fn test_render_without_table_panics() {
        let _ = Query::new().where_clause("a = ?", &[1.into()]).render(&PG);
    }

    #[test]
    fn test_substitute_markers_counts() {
        let mut query = Query::new();
        let sql = query.substitute_markers("UPDATE t SET a = ?, b = ? WHERE c = ?", &PG);
        assert_eq!(sql, "UPDATE t SET a = $1, b = $2 WHERE c = $3");
        assert_eq!(query.marker_position(), 3);
    }
}
