use std::collections::{BTreeMap, HashMap};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::model::{View, ViewDeclaration};
use crate::template;

/// Per-invocation aggregate of everything one run needs: the loaded views,
/// the named-parameter table, and the dialect. Constructed once per run and
/// passed by reference to every component; there is no ambient global state.
pub struct RunContext {
    views: BTreeMap<String, View>,
    parameters: HashMap<String, String>,
    dialect: Dialect,
}

impl RunContext {
    pub fn new(declarations: Vec<ViewDeclaration>, dialect: Dialect) -> Result<Self> {
        let mut views = BTreeMap::new();
        let mut parameters = HashMap::new();

        for decl in declarations {
            let view = View::new(decl)?;
            let name = view.name().to_string();

            // Every loaded view contributes its physical location as a
            // substitutable parameter, base tables included.
            parameters.insert(
                format!("{}.SQL_TABLE_NAME", name),
                view.qualified_table_name(dialect),
            );

            if views.insert(name.clone(), view).is_some() {
                return Err(Error::Config(format!("duplicate view declaration '{}'", name)));
            }
        }

        Ok(Self {
            views,
            parameters,
            dialect,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// Views in name order, which keeps downstream ordering deterministic.
    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    /// Render the final inner SELECT for a persisted derived table by
    /// substituting all known named parameters into its template.
    pub fn render_sql(&self, view: &View) -> Result<String> {
        let sql = view.sql_template().ok_or_else(|| {
            Error::Config(format!("view '{}' is not a derived table", view.name()))
        })?;
        template::render(sql, &self.parameters)
    }
}
