use serde::Deserialize;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Fixed warehouse namespace holding every physical table backing a derived
/// view. The same view always maps to the same physical location.
pub const SCRATCH_SCHEMA: &str = "pdt_scratch";

/// One view declaration record, as produced by the declaration loader.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewDeclaration {
    /// Unique view name. Mandatory identity field.
    pub view: Option<String>,
    /// Backing table for base (non-derived) views.
    pub sql_table_name: Option<String>,
    pub derived_table: Option<DerivedTableDeclaration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DerivedTableDeclaration {
    /// SQL template; may reference other views via `${view.SQL_TABLE_NAME}`.
    pub sql: String,
    /// Trigger query. Presence makes the derived table persisted.
    pub sql_trigger_value: Option<String>,
    pub distribution_style: Option<String>,
    pub indexes: Option<Vec<String>>,
}

/// Physical layout hints passed through to the dialect, never interpreted.
#[derive(Debug, Clone, Default)]
pub struct PhysicalLayout {
    pub distribution_style: Option<String>,
    pub sort_keys: Vec<String>,
}

/// One loaded view. Immutable after construction; the externally stored
/// trigger value is not part of this entity.
#[derive(Debug, Clone)]
pub struct View {
    name: String,
    declared_table: Option<String>,
    derived: Option<DerivedTable>,
}

#[derive(Debug, Clone)]
struct DerivedTable {
    sql: String,
    trigger_query: Option<String>,
    layout: PhysicalLayout,
}

impl View {
    pub fn new(decl: ViewDeclaration) -> Result<Self> {
        let name = decl
            .view
            .ok_or_else(|| Error::Config("view declaration is missing the 'view' name".into()))?;

        let derived = decl.derived_table.map(|d| DerivedTable {
            sql: d.sql,
            trigger_query: d.sql_trigger_value,
            layout: PhysicalLayout {
                distribution_style: d.distribution_style,
                sort_keys: d.indexes.unwrap_or_default(),
            },
        });

        if derived.is_none() && decl.sql_table_name.is_none() {
            return Err(Error::Config(format!(
                "base view '{}' declares no sql_table_name",
                name
            )));
        }

        Ok(Self {
            name,
            declared_table: decl.sql_table_name,
            derived,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_derived(&self) -> bool {
        self.derived.is_some()
    }

    /// A persisted derived table: derived AND carrying a trigger query.
    /// Only such views are ever candidates for regeneration.
    pub fn is_persisted(&self) -> bool {
        self.derived
            .as_ref()
            .map(|d| d.trigger_query.is_some())
            .unwrap_or(false)
    }

    pub fn schema_name(&self, dialect: Dialect) -> &str {
        if self.is_derived() {
            SCRATCH_SCHEMA
        } else {
            dialect.default_schema()
        }
    }

    /// Derived tables use a table name mangled from the view name; base
    /// tables use their declared one.
    pub fn table_name(&self) -> String {
        match (&self.derived, &self.declared_table) {
            (Some(_), _) => format!("_{}", self.name),
            (None, Some(table)) => table.clone(),
            // Ruled out by the constructor.
            (None, None) => self.name.clone(),
        }
    }

    pub fn qualified_table_name(&self, dialect: Dialect) -> String {
        format!("{}.{}", self.schema_name(dialect), self.table_name())
    }

    pub fn sql_template(&self) -> Option<&str> {
        self.derived.as_ref().map(|d| d.sql.as_str())
    }

    pub fn trigger_query(&self) -> Option<&str> {
        self.derived.as_ref().and_then(|d| d.trigger_query.as_deref())
    }

    pub fn layout(&self) -> PhysicalLayout {
        self.derived
            .as_ref()
            .map(|d| d.layout.clone())
            .unwrap_or_default()
    }
}
