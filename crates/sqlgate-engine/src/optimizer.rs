//! Statement rewrite chain
//!
//! A fixed chain of rewrite passes (index hints, then limit, then join
//! ordering), each gated on dialect capabilities and per-call options. A
//! pass that cannot help skips itself; parse failures skip the pass rather
//! than failing the call.

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use sqlgate_core::DialectCapabilities;

use crate::options::ExecutionOptions;

/// A single rewrite pass over a statement.
pub trait QueryOptimizer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this pass can improve the statement as written.
    fn applies_to(
        &self,
        sql: &str,
        capabilities: &DialectCapabilities,
        options: &ExecutionOptions,
    ) -> bool;

    /// Produce the rewritten statement. Only called when `applies_to`
    /// returned true.
    fn rewrite(
        &self,
        sql: &str,
        capabilities: &DialectCapabilities,
        options: &ExecutionOptions,
    ) -> String;
}

/// Parse a statement and return its query body when it is a single SELECT.
fn parse_single_query(sql: &str) -> Option<Box<Query>> {
    let dialect = GenericDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql).ok()?;
    if statements.len() != 1 {
        return None;
    }
    match statements.remove(0) {
        Statement::Query(query) => Some(query),
        _ => None,
    }
}

/// Number of explicit joins in the first FROM item of a SELECT.
fn join_count(query: &Query) -> usize {
    match query.body.as_ref() {
        SetExpr::Select(select) => select.from.iter().map(|t| t.joins.len()).sum(),
        _ => 0,
    }
}

/// Injects `USE INDEX` hints after table references named in the options.
pub struct IndexHintOptimizer;

impl QueryOptimizer for IndexHintOptimizer {
    fn name(&self) -> &str {
        "index_hint"
    }

    fn applies_to(
        &self,
        sql: &str,
        capabilities: &DialectCapabilities,
        options: &ExecutionOptions,
    ) -> bool {
        capabilities.supports_index_hints
            && !options.index_hints.is_empty()
            && parse_single_query(sql).is_some()
    }

    fn rewrite(
        &self,
        sql: &str,
        _capabilities: &DialectCapabilities,
        options: &ExecutionOptions,
    ) -> String {
        // Token-wise insertion: a hint lands directly after a table name
        // that follows FROM or JOIN.
        let tokens: Vec<&str> = sql.split_whitespace().collect();
        let mut rewritten: Vec<String> = Vec::with_capacity(tokens.len());
        let mut hinted = false;
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            rewritten.push(token.to_string());
            let is_table_intro =
                token.eq_ignore_ascii_case("FROM") || token.eq_ignore_ascii_case("JOIN");
            if is_table_intro {
                if let Some(table) = tokens.get(i + 1) {
                    let bare = table.trim_end_matches(',');
                    if let Some(index) = options.index_hints.get(bare) {
                        rewritten.push(format!("{} USE INDEX ({})", bare, index));
                        if let Some(rest) = table.strip_prefix(bare) {
                            if !rest.is_empty() {
                                rewritten.push(rest.to_string());
                            }
                        }
                        hinted = true;
                        i += 2;
                        continue;
                    }
                }
            }
            i += 1;
        }
        if hinted {
            tracing::debug!(hints = options.index_hints.len(), "applied index hints");
            rewritten.join(" ")
        } else {
            sql.to_string()
        }
    }
}

/// Appends a LIMIT to bare SELECTs so the driver never streams more rows
/// than the caller will materialize.
pub struct LimitOptimizer;

impl QueryOptimizer for LimitOptimizer {
    fn name(&self) -> &str {
        "limit"
    }

    fn applies_to(
        &self,
        sql: &str,
        capabilities: &DialectCapabilities,
        options: &ExecutionOptions,
    ) -> bool {
        if !capabilities.supports_limit_clause || options.max_rows == 0 {
            return false;
        }
        match parse_single_query(sql) {
            Some(query) => {
                query.limit.is_none() && query.offset.is_none() && query.fetch.is_none()
            }
            None => false,
        }
    }

    fn rewrite(
        &self,
        sql: &str,
        _capabilities: &DialectCapabilities,
        options: &ExecutionOptions,
    ) -> String {
        let base = sql.trim_end().trim_end_matches(';').trim_end();
        tracing::debug!(limit = options.max_rows, "appended limit clause");
        format!("{} LIMIT {}", base, options.max_rows)
    }
}

/// Applies a STRAIGHT_JOIN directive on multi-join SELECTs for dialects
/// that honor it, pinning the join order to the written order.
pub struct JoinOptimizer;

impl QueryOptimizer for JoinOptimizer {
    fn name(&self) -> &str {
        "join"
    }

    fn applies_to(
        &self,
        sql: &str,
        capabilities: &DialectCapabilities,
        _options: &ExecutionOptions,
    ) -> bool {
        if !capabilities.supports_straight_join {
            return false;
        }
        if sql.to_uppercase().contains("STRAIGHT_JOIN") {
            return false;
        }
        match parse_single_query(sql) {
            Some(query) => join_count(&query) >= 2,
            None => false,
        }
    }

    fn rewrite(
        &self,
        sql: &str,
        _capabilities: &DialectCapabilities,
        _options: &ExecutionOptions,
    ) -> String {
        let trimmed = sql.trim_start();
        if trimmed.len() >= 6 && trimmed[..6].eq_ignore_ascii_case("SELECT") {
            tracing::debug!("applied straight-join directive");
            format!("SELECT STRAIGHT_JOIN{}", &trimmed[6..])
        } else {
            sql.to_string()
        }
    }
}

/// The fixed pass chain. Order is index-hint, limit, join.
///
/// Applicability is judged against the statement as submitted; rewrites
/// then stack in order, each seeing the previous pass's output. Dialect
/// extensions injected by an earlier pass (such as index hints) would
/// otherwise defeat the parse check of a later one.
pub struct OptimizerChain {
    optimizers: Vec<Box<dyn QueryOptimizer>>,
}

impl OptimizerChain {
    pub fn standard() -> Self {
        Self {
            optimizers: vec![
                Box::new(IndexHintOptimizer),
                Box::new(LimitOptimizer),
                Box::new(JoinOptimizer),
            ],
        }
    }

    pub fn optimize(
        &self,
        sql: &str,
        capabilities: &DialectCapabilities,
        options: &ExecutionOptions,
    ) -> String {
        let mut current = sql.to_string();
        for optimizer in &self.optimizers {
            if optimizer.applies_to(sql, capabilities, options) {
                tracing::trace!(pass = optimizer.name(), "optimizer pass applied");
                current = optimizer.rewrite(&current, capabilities, options);
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mysql_caps() -> DialectCapabilities {
        DialectCapabilities {
            supports_limit_clause: true,
            supports_index_hints: true,
            supports_straight_join: true,
            supports_schemas: true,
            supports_catalogs: true,
        }
    }

    mod limit_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_appends_limit_to_bare_select() {
            let chain = OptimizerChain::standard();
            let options = ExecutionOptions::new().with_max_rows(100);
            let out = chain.optimize("SELECT * FROM users", &mysql_caps(), &options);
            assert_eq!(out, "SELECT * FROM users LIMIT 100");
        }

        #[test]
        fn test_existing_limit_is_left_alone() {
            let chain = OptimizerChain::standard();
            let options = ExecutionOptions::new().with_max_rows(100);
            let sql = "SELECT * FROM users LIMIT 5";
            assert_eq!(chain.optimize(sql, &mysql_caps(), &options), sql);
        }

        #[test]
        fn test_skipped_without_capability() {
            let chain = OptimizerChain::standard();
            let options = ExecutionOptions::new().with_max_rows(100);
            let sql = "SELECT * FROM users";
            assert_eq!(
                chain.optimize(sql, &DialectCapabilities::default(), &options),
                sql
            );
        }

        #[test]
        fn test_non_select_is_skipped() {
            let chain = OptimizerChain::standard();
            let options = ExecutionOptions::new().with_max_rows(100);
            let sql = "UPDATE users SET active = 1";
            assert_eq!(chain.optimize(sql, &mysql_caps(), &options), sql);
        }

        #[test]
        fn test_trailing_semicolon_is_handled() {
            let chain = OptimizerChain::standard();
            let options = ExecutionOptions::new().with_max_rows(10);
            let out = chain.optimize("SELECT * FROM t;", &mysql_caps(), &options);
            assert_eq!(out, "SELECT * FROM t LIMIT 10");
        }
    }

    mod index_hint_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_hint_inserted_after_from() {
            let optimizer = IndexHintOptimizer;
            let options = ExecutionOptions::new()
                .with_max_rows(0)
                .with_index_hint("users", "idx_email");
            let caps = mysql_caps();
            let sql = "SELECT * FROM users WHERE email = 'x'";
            assert!(optimizer.applies_to(sql, &caps, &options));
            assert_eq!(
                optimizer.rewrite(sql, &caps, &options),
                "SELECT * FROM users USE INDEX (idx_email) WHERE email = 'x'"
            );
        }

        #[test]
        fn test_hint_inserted_after_join() {
            let optimizer = IndexHintOptimizer;
            let options = ExecutionOptions::new().with_index_hint("orders", "idx_user");
            let caps = mysql_caps();
            let sql = "SELECT * FROM users JOIN orders ON orders.user_id = users.id";
            assert_eq!(
                optimizer.rewrite(sql, &caps, &options),
                "SELECT * FROM users JOIN orders USE INDEX (idx_user) ON orders.user_id = users.id"
            );
        }

        #[test]
        fn test_unrelated_table_is_untouched() {
            let optimizer = IndexHintOptimizer;
            let options = ExecutionOptions::new().with_index_hint("users", "idx_email");
            let caps = mysql_caps();
            let sql = "SELECT * FROM accounts";
            assert_eq!(optimizer.rewrite(sql, &caps, &options), sql);
        }

        #[test]
        fn test_skipped_without_capability() {
            let optimizer = IndexHintOptimizer;
            let options = ExecutionOptions::new().with_index_hint("users", "idx_email");
            assert!(!optimizer.applies_to(
                "SELECT * FROM users",
                &DialectCapabilities::default(),
                &options
            ));
        }
    }

    mod join_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_straight_join_on_multi_join_select() {
            let optimizer = JoinOptimizer;
            let options = ExecutionOptions::default();
            let caps = mysql_caps();
            let sql = "SELECT * FROM a JOIN b ON a.id = b.a_id JOIN c ON b.id = c.b_id";
            assert!(optimizer.applies_to(sql, &caps, &options));
            let out = optimizer.rewrite(sql, &caps, &options);
            assert!(out.starts_with("SELECT STRAIGHT_JOIN "));
        }

        #[test]
        fn test_single_join_is_skipped() {
            let optimizer = JoinOptimizer;
            let options = ExecutionOptions::default();
            assert!(!optimizer.applies_to(
                "SELECT * FROM a JOIN b ON a.id = b.a_id",
                &mysql_caps(),
                &options
            ));
        }

        #[test]
        fn test_existing_directive_is_not_doubled() {
            let optimizer = JoinOptimizer;
            let options = ExecutionOptions::default();
            assert!(!optimizer.applies_to(
                "SELECT STRAIGHT_JOIN * FROM a JOIN b ON a.id = b.a_id JOIN c ON b.id = c.b_id",
                &mysql_caps(),
                &options
            ));
        }
    }

    #[test]
    fn test_chain_order_hint_then_limit() {
        let chain = OptimizerChain::standard();
        let options = ExecutionOptions::new()
            .with_max_rows(50)
            .with_index_hint("users", "idx_email");
        let out = chain.optimize("SELECT * FROM users", &mysql_caps(), &options);
        assert_eq!(out, "SELECT * FROM users USE INDEX (idx_email) LIMIT 50");
    }
}
