use crate::core::db::schema::{table_columns, table_exists, LiveColumn};
use crate::core::db::Session;
use crate::core::Result;
use crate::model::{ColumnDefinition, SchemaModel};
use crate::sql::ddl;
use std::collections::HashSet;
use tracing::{info, warn};

/// A column whose declared type differs from the live one.
///
/// Reported only: column types are never migrated.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDrift {
    pub column: String,
    pub declared: String,
    pub live: String,
}

/// What one synchronization run did to a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncReport {
    pub table_name: String,
    /// The table did not exist and was created from the schema
    pub created: bool,
    /// Columns added, in the order they were applied
    pub added: Vec<String>,
    /// Columns dropped, in the order they were applied
    pub dropped: Vec<String>,
    pub type_drift: Vec<TypeDrift>,
    /// DDL statements that succeeded, in the order they were issued
    pub statements: Vec<String>,
}

impl SyncReport {
    /// Returns true if no DDL was issued.
    pub fn is_unchanged(&self) -> bool {
        !self.created && self.added.is_empty() && self.dropped.is_empty()
    }

    /// Number of DDL statements issued.
    pub fn change_count(&self) -> usize {
        usize::from(self.created) + self.added.len() + self.dropped.len()
    }
}

/// Desired columns missing from the live table, in declared order.
///
/// Matching is by exact (case-sensitive) name.
pub fn plan_additions<'a>(desired: &'a SchemaModel, live: &[LiveColumn]) -> Vec<&'a ColumnDefinition> {
    let live_names: HashSet<&str> = live.iter().map(|c| c.name.as_str()).collect();
    desired
        .columns()
        .iter()
        .filter(|c| !live_names.contains(c.name.as_str()))
        .collect()
}

/// Live columns the schema does not declare, in table order.
pub fn plan_drops<'a>(desired: &SchemaModel, live: &'a [LiveColumn]) -> Vec<&'a str> {
    live.iter()
        .filter(|c| !desired.contains(&c.name))
        .map(|c| c.name.as_str())
        .collect()
}

/// Columns present on both sides whose declared type does not match the
/// live one. Comparison ignores case and any constraints after the type name.
pub fn type_drift(desired: &SchemaModel, live: &[LiveColumn]) -> Vec<TypeDrift> {
    live.iter()
        .filter_map(|live_col| {
            let declared = desired.column(&live_col.name)?;
            if types_match(&declared.sql_type, &live_col.sql_type) {
                None
            } else {
                Some(TypeDrift {
                    column: live_col.name.clone(),
                    declared: declared.sql_type.clone(),
                    live: live_col.sql_type.clone(),
                })
            }
        })
        .collect()
}

/// SQLite stores the declared type name without column constraints, so the
/// declaration matches when it starts with the live type.
fn types_match(declared: &str, live: &str) -> bool {
    let declared = declared.trim().to_uppercase();
    let live = live.trim().to_uppercase();
    if live.is_empty() {
        return declared.is_empty()
            || declared.starts_with("PRIMARY")
            || declared.starts_with("NOT")
            || declared.starts_with("DEFAULT");
    }
    declared == live || declared.starts_with(&format!("{} ", live))
}

/// Converges `schema.table_name()` towards `schema`.
///
/// Creates the table when it is missing. Otherwise adds every declared column
/// the table lacks (planned from one read of the live columns), then drops
/// every live column the schema does not declare (planned from a second read
/// taken after the additions). Each change is its own statement with no
/// surrounding transaction: the first failure stops the run and leaves the
/// changes already applied in place.
///
/// Under [`ErrorPolicy::Collect`](crate::core::ErrorPolicy::Collect) a failed
/// step is kept on the session instead of returned; the run still stops there
/// and the report lists only what was applied before it.
pub fn synchronize(session: &mut Session, schema: &SchemaModel) -> Result<SyncReport> {
    let table = schema.table_name();
    let mut report = SyncReport {
        table_name: table.to_string(),
        ..SyncReport::default()
    };
    let mut guard = StepGuard::new(session, table);

    let exists = table_exists(session, table)?;
    if guard.failed(session) {
        return Ok(report);
    }

    if !exists {
        let sql = ddl::create_table(schema)?;
        session.query_and_close(&sql, &[])?;
        if guard.failed(session) {
            return Ok(report);
        }
        info!(
            "Created table '{}' with {} column(s)",
            table,
            schema.columns().len()
        );
        report.created = true;
        report.statements.push(sql);
        return Ok(report);
    }

    let live = table_columns(session, table)?;
    if guard.failed(session) {
        return Ok(report);
    }
    report.type_drift = type_drift(schema, &live);
    for drift in &report.type_drift {
        warn!(
            "Column '{}.{}' is declared as {} but the table has {}; types are not migrated",
            table, drift.column, drift.declared, drift.live
        );
    }

    for column in plan_additions(schema, &live) {
        let sql = ddl::add_column(table, column)?;
        session.query_and_close(&sql, &[])?;
        if guard.failed(session) {
            return Ok(report);
        }
        info!("Added column '{}' ({}) to '{}'", column.name, column.sql_type, table);
        report.added.push(column.name.clone());
        report.statements.push(sql);
    }

    let live = table_columns(session, table)?;
    if guard.failed(session) {
        return Ok(report);
    }
    for column in plan_drops(schema, &live) {
        let sql = ddl::drop_column(table, column);
        session.query_and_close(&sql, &[])?;
        if guard.failed(session) {
            return Ok(report);
        }
        info!("Dropped column '{}' from '{}'", column, table);
        report.dropped.push(column.to_string());
        report.statements.push(sql);
    }

    Ok(report)
}

/// Detects a step whose error was collected by the session rather than
/// returned.
struct StepGuard<'a> {
    table: &'a str,
    seen: usize,
}

impl<'a> StepGuard<'a> {
    fn new(session: &Session, table: &'a str) -> Self {
        StepGuard {
            table,
            seen: session.errors().len(),
        }
    }

    fn failed(&mut self, session: &Session) -> bool {
        let count = session.errors().len();
        if count > self.seen {
            self.seen = count;
            warn!("Synchronization of '{}' stopped after a collected error", self.table);
            true
        } else {
            false
        }
    }
}

/// Creates the table from the schema; does nothing if it already exists.
///
/// Returns true if the table was created.
pub fn create_table(session: &mut Session, schema: &SchemaModel) -> Result<bool> {
    if table_exists(session, schema.table_name())? {
        return Ok(false);
    }
    Ok(synchronize(session, schema)?.created)
}

pub fn drop_table(session: &mut Session, table: &str) -> Result<()> {
    session.query_and_close(&ddl::drop_table(table), &[])?;
    info!("Dropped table '{}'", table);
    Ok(())
}

/// Deletes every row, keeping the table.
pub fn clear_table(session: &mut Session, table: &str) -> Result<usize> {
    Ok(session
        .query_and_close(&ddl::clear_table(table), &[])?
        .affected_rows())
}

/// Generates a human-readable summary of synchronization reports.
pub fn format_report(reports: &[SyncReport], database: &str) -> String {
    let mut output = format!("Schema synchronization for '{}'\n", database);
    output.push_str(&"=".repeat(60));
    output.push('\n');

    if reports.iter().all(SyncReport::is_unchanged) && reports.iter().all(|r| r.type_drift.is_empty()) {
        output.push_str("All tables are in sync.\n");
        return output;
    }

    for report in reports {
        if report.created {
            output.push_str(&format!("  + {} (created)\n", report.table_name));
            continue;
        }
        if report.is_unchanged() && report.type_drift.is_empty() {
            output.push_str(&format!("  = {}\n", report.table_name));
            continue;
        }
        output.push_str(&format!("  ~ {}\n", report.table_name));
        for column in &report.added {
            output.push_str(&format!("      ++ {}\n", column));
        }
        for column in &report.dropped {
            output.push_str(&format!("      -- {}\n", column));
        }
        for drift in &report.type_drift {
            output.push_str(&format!(
                "      !! {}: declared {}, live {} (not migrated)\n",
                drift.column, drift.declared, drift.live
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionConfig;

    fn live(name: &str, sql_type: &str) -> LiveColumn {
        LiveColumn {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: true,
            is_key: false,
            default: None,
            extra: None,
        }
    }

    fn desired() -> SchemaModel {
        SchemaModel::new(
            "users",
            vec![
                ColumnDefinition::new("id", "INTEGER PRIMARY KEY"),
                ColumnDefinition::new("name", "VARCHAR(255)"),
                ColumnDefinition::new("age", "INT"),
                ColumnDefinition::new("email", "TEXT"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_plans() {
        let live_cols = vec![
            live("id", "INTEGER"),
            live("name", "VARCHAR(255)"),
            live("age", "INT"),
            live("legacy_flag", "INT"),
        ];
        let schema = desired();

        let additions: Vec<&str> = plan_additions(&schema, &live_cols)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(additions, vec!["email"]);
        assert_eq!(plan_drops(&schema, &live_cols), vec!["legacy_flag"]);
    }

    #[test]
    fn test_plans_are_case_sensitive() {
        let live_cols = vec![live("Email", "TEXT")];
        let schema = SchemaModel::new("t", vec![ColumnDefinition::new("email", "TEXT")]).unwrap();
        assert_eq!(plan_additions(&schema, &live_cols).len(), 1);
        assert_eq!(plan_drops(&schema, &live_cols), vec!["Email"]);
    }

    #[test]
    fn test_type_drift_detection() {
        let live_cols = vec![live("id", "INTEGER"), live("name", "TEXT"), live("age", "int")];
        let drift = type_drift(&desired(), &live_cols);
        assert_eq!(
            drift,
            vec![TypeDrift {
                column: "name".to_string(),
                declared: "VARCHAR(255)".to_string(),
                live: "TEXT".to_string(),
            }]
        );
    }

    #[test]
    fn test_synchronize_on_memory_database() {
        let mut session = Session::new(SessionConfig::new(":memory:"));
        let schema = desired();

        let first = synchronize(&mut session, &schema).unwrap();
        assert!(first.created);
        assert_eq!(first.change_count(), 1);
        assert_eq!(first.statements.len(), 1);
        assert!(first.statements[0].starts_with("CREATE TABLE \"users\""));

        let second = synchronize(&mut session, &schema).unwrap();
        assert!(second.is_unchanged());
        assert!(second.type_drift.is_empty());
    }

    #[test]
    fn test_format_report() {
        let reports = vec![
            SyncReport {
                table_name: "users".to_string(),
                added: vec!["email".to_string()],
                dropped: vec!["legacy_flag".to_string()],
                ..SyncReport::default()
            },
            SyncReport {
                table_name: "posts".to_string(),
                created: true,
                ..SyncReport::default()
            },
        ];
        insta::assert_snapshot!(format_report(&reports, "app.db"), @r"
        Schema synchronization for 'app.db'
        ============================================================
          ~ users
              ++ email
              -- legacy_flag
          + posts (created)
        ");
    }

    #[test]
    fn test_format_report_in_sync() {
        let reports = vec![SyncReport {
            table_name: "users".to_string(),
            ..SyncReport::default()
        }];
        assert!(format_report(&reports, "app.db").contains("All tables are in sync."));
    }
}
