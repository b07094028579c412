use std::time::{Duration, Instant};

use humantime::format_duration;
use tracing::{error, info};

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::graph;
use crate::model::{View, SCRATCH_SCHEMA};
use crate::store::{TriggerValue, TriggerValueStore};
use crate::warehouse::Warehouse;

/// Terminal state of one view within a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    /// Trigger value unchanged; nothing executed, nothing stored.
    Skipped,
    Regenerated { elapsed: Duration },
}

/// Per-view outcomes of one completed run, in execution order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(String, ViewOutcome)>,
}

impl RunSummary {
    pub fn regenerated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ViewOutcome::Regenerated { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ViewOutcome::Skipped))
            .count()
    }
}

enum RefreshAction {
    Fresh,
    Rebuilt {
        value: TriggerValue,
        elapsed: Duration,
    },
}

/// Orchestrates a full run: computes the execution order, then walks it one
/// view at a time on a single connection, wrapping each view's
/// check-and-regenerate sequence in one warehouse transaction. The first
/// failure aborts the whole run; regeneration order is only meaningful with
/// clean predecessors.
pub struct Regenerator<'a, W, S> {
    ctx: &'a RunContext,
    warehouse: &'a mut W,
    store: &'a mut S,
}

impl<'a, W: Warehouse, S: TriggerValueStore> Regenerator<'a, W, S> {
    pub fn new(ctx: &'a RunContext, warehouse: &'a mut W, store: &'a mut S) -> Result<Self> {
        if warehouse.dialect() != ctx.dialect() {
            return Err(Error::Config(format!(
                "warehouse dialect '{}' does not match run dialect '{}'",
                warehouse.dialect().name(),
                ctx.dialect().name()
            )));
        }
        Ok(Self {
            ctx,
            warehouse,
            store,
        })
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        // Graph construction and cycle detection fail here, before any SQL.
        let order = graph::execution_order(self.ctx)?;
        info!(order = ?order, "Regenerating persisted derived tables in dependency order");

        let dialect = self.ctx.dialect();
        self.warehouse
            .execute(&dialect.create_schema_sql(SCRATCH_SCHEMA))
            .await?;

        let mut summary = RunSummary::default();
        for name in &order {
            let view = self.ctx.view(name).ok_or_else(|| {
                Error::Config(format!("execution order names unknown view '{}'", name))
            })?;

            self.warehouse.begin().await?;
            match self.refresh_view(view).await {
                Ok(RefreshAction::Fresh) => {
                    self.warehouse.commit().await?;
                    info!(view = %name, "Trigger value has not changed, skipping");
                    summary.outcomes.push((name.clone(), ViewOutcome::Skipped));
                }
                Ok(RefreshAction::Rebuilt { value, elapsed }) => {
                    self.warehouse.commit().await?;
                    // Stored only once the transaction committed, so a crash
                    // mid-regeneration never marks the view fresh.
                    self.store.put(name, value)?;
                    info!(
                        view = %name,
                        elapsed = %format_duration(elapsed),
                        "Regenerated derived table"
                    );
                    summary
                        .outcomes
                        .push((name.clone(), ViewOutcome::Regenerated { elapsed }));
                }
                Err(err) => {
                    error!(view = %name, error = %err, "View regeneration failed, aborting run");
                    // Only the transaction opened for this view is rolled
                    // back; earlier views stay committed.
                    if let Err(rollback_err) = self.warehouse.rollback().await {
                        error!(view = %name, error = %rollback_err, "Rollback failed");
                    }
                    return Err(err);
                }
            }
        }
        Ok(summary)
    }

    /// One view's check-and-regenerate sequence, inside the caller's
    /// transaction scope.
    async fn refresh_view(&mut self, view: &View) -> Result<RefreshAction> {
        let exists = self.table_exists(view).await?;
        let latest = self.latest_trigger_value(view).await?;

        // Staleness verdict. A missing physical table is unconditionally
        // stale; a missing stored value means first-time materialization.
        if exists {
            if let Some(last_seen) = self.store.get(view.name())? {
                if last_seen == latest {
                    return Ok(RefreshAction::Fresh);
                }
            }
        }

        info!(view = %view.name(), "Regenerating derived table");
        let dialect = self.ctx.dialect();
        let select_sql = self.ctx.render_sql(view)?;
        let ddl = dialect.regenerate_table_sql(
            view.schema_name(dialect),
            &view.table_name(),
            &view.layout(),
            &select_sql,
        );

        let start = Instant::now();
        self.warehouse
            .execute(&ddl)
            .await
            .map_err(|source| Error::Regeneration {
                view: view.name().to_string(),
                source,
            })?;
        Ok(RefreshAction::Rebuilt {
            value: latest,
            elapsed: start.elapsed(),
        })
    }

    async fn table_exists(&mut self, view: &View) -> Result<bool> {
        let dialect = self.ctx.dialect();
        let sql = dialect.has_table_sql(view.schema_name(dialect), &view.table_name());
        let result = self
            .warehouse
            .query_scalar(&sql)
            .await
            .map_err(|e| Error::Query {
                view: view.name().to_string(),
                message: e.to_string(),
            })?;
        match result {
            Some(TriggerValue::Bool(exists)) => Ok(exists),
            Some(other) => Err(Error::Query {
                view: view.name().to_string(),
                message: format!("existence probe returned non-boolean value '{}'", other),
            }),
            None => Err(Error::Query {
                view: view.name().to_string(),
                message: "existence probe returned no rows".to_string(),
            }),
        }
    }

    /// Evaluate the trigger query. Exactly one scalar is required; zero rows
    /// is a query error naming the view.
    async fn latest_trigger_value(&mut self, view: &View) -> Result<TriggerValue> {
        let query = view.trigger_query().ok_or_else(|| {
            Error::Config(format!(
                "view '{}' is not a persisted derived table",
                view.name()
            ))
        })?;
        let result = self
            .warehouse
            .query_scalar(query)
            .await
            .map_err(|e| Error::Query {
                view: view.name().to_string(),
                message: e.to_string(),
            })?;
        result.ok_or_else(|| Error::Query {
            view: view.name().to_string(),
            message: "trigger query returned no rows, exactly one scalar is required".to_string(),
        })
    }
}
