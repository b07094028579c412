use crate::error::{Error, Result};
use crate::model::PhysicalLayout;

/// SQL dialect strategy. Only `postgresql` has a concrete implementation;
/// any other name is rejected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgresql,
}

impl Dialect {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "postgresql" => Ok(Dialect::Postgresql),
            other => Err(Error::Config(format!("unsupported SQL dialect '{}'", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgresql => "postgresql",
        }
    }

    /// Schema that base tables live in when the declaration names only a
    /// table.
    pub fn default_schema(&self) -> &'static str {
        match self {
            Dialect::Postgresql => "public",
        }
    }

    pub fn create_schema_sql(&self, schema: &str) -> String {
        match self {
            Dialect::Postgresql => format!("CREATE SCHEMA IF NOT EXISTS {};", schema),
        }
    }

    /// Existence probe for a physical table. Returns a single boolean row.
    pub fn has_table_sql(&self, schema: &str, table: &str) -> String {
        match self {
            Dialect::Postgresql => format!(
                "SELECT EXISTS (\
                 SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = '{}' AND table_name = '{}');",
                schema, table
            ),
        }
    }

    /// Full regeneration statement: drop-if-exists, then create-as-select
    /// with the declared physical layout options appended. The layout syntax
    /// is the Redshift-flavored variant of the postgres dialect; values are
    /// passed through as declared.
    pub fn regenerate_table_sql(
        &self,
        schema: &str,
        table: &str,
        layout: &PhysicalLayout,
        select_sql: &str,
    ) -> String {
        match self {
            Dialect::Postgresql => {
                let distribution = layout
                    .distribution_style
                    .as_deref()
                    .unwrap_or("ALL");
                let sortkey = if layout.sort_keys.is_empty() {
                    String::new()
                } else {
                    format!(" INTERLEAVED SORTKEY({})", layout.sort_keys.join(","))
                };
                format!(
                    "DROP TABLE IF EXISTS {schema}.{table};\n\
                     CREATE TABLE {schema}.{table} DISTSTYLE {distribution}{sortkey} AS {select_sql};",
                )
            }
        }
    }
}
