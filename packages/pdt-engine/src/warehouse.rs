use async_trait::async_trait;
use thiserror::Error;
use tokio_postgres::types::Type;
use tokio_postgres::{NoTls, Row};
use tracing::error;

use crate::dialect::Dialect;
use crate::store::TriggerValue;
use crate::template;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error("{0}")]
    Message(String),
}

/// Warehouse connection boundary: statement execution, a single-scalar query
/// shape, and explicit transaction boundaries. One connection, one view at a
/// time; the driver never runs dependent views concurrently.
#[async_trait]
pub trait Warehouse: Send {
    fn dialect(&self) -> Dialect;

    /// Execute one rendered statement batch (the regeneration SQL is a
    /// drop-if-exists followed by a create-as-select).
    async fn execute(&mut self, sql: &str) -> Result<(), WarehouseError>;

    /// First row, first column of the result set; `None` when the query
    /// returns zero rows. Callers decide whether zero rows is an error.
    async fn query_scalar(&mut self, sql: &str) -> Result<Option<TriggerValue>, WarehouseError>;

    async fn begin(&mut self) -> Result<(), WarehouseError>;
    async fn commit(&mut self) -> Result<(), WarehouseError>;
    async fn rollback(&mut self) -> Result<(), WarehouseError>;
}

/// `tokio-postgres` implementation. The connection task is spawned onto the
/// runtime and logs transport errors on its way out.
pub struct PostgresWarehouse {
    client: tokio_postgres::Client,
    dialect: Dialect,
}

impl PostgresWarehouse {
    pub async fn connect(config: &str, dialect: Dialect) -> Result<Self, WarehouseError> {
        let (client, connection) = tokio_postgres::connect(config, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Warehouse connection closed");
            }
        });
        Ok(Self { client, dialect })
    }
}

#[async_trait]
impl Warehouse for PostgresWarehouse {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&mut self, sql: &str) -> Result<(), WarehouseError> {
        // The wire protocol uses $n placeholders, not percents; restore any
        // escaped literal percents before sending.
        let sql = template::collapse_percent_escapes(sql);
        self.client.batch_execute(&sql).await?;
        Ok(())
    }

    async fn query_scalar(&mut self, sql: &str) -> Result<Option<TriggerValue>, WarehouseError> {
        let sql = template::collapse_percent_escapes(sql);
        let rows = self.client.query(sql.as_str(), &[]).await?;
        match rows.first() {
            Some(row) => Ok(Some(scalar_from_row(row)?)),
            None => Ok(None),
        }
    }

    async fn begin(&mut self) -> Result<(), WarehouseError> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), WarehouseError> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), WarehouseError> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }
}

/// Convert the first column of a row into a comparable scalar. Timestamps
/// are normalized to RFC 3339 text so the stored value compares stably.
fn scalar_from_row(row: &Row) -> Result<TriggerValue, WarehouseError> {
    let column = row
        .columns()
        .first()
        .ok_or_else(|| WarehouseError::Message("result row has no columns".into()))?;

    let ty = column.type_();
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(0)?
            .map_or(TriggerValue::Null, TriggerValue::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(0)?
            .map_or(TriggerValue::Null, |v| TriggerValue::Integer(v as i64))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(0)?
            .map_or(TriggerValue::Null, |v| TriggerValue::Integer(v as i64))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(0)?
            .map_or(TriggerValue::Null, TriggerValue::Integer)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(0)?
            .map_or(TriggerValue::Null, |v| TriggerValue::Float(v as f64))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(0)?
            .map_or(TriggerValue::Null, TriggerValue::Float)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<chrono::NaiveDateTime>>(0)?
            .map_or(TriggerValue::Null, |v| {
                TriggerValue::Text(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            })
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(0)?
            .map_or(TriggerValue::Null, |v| TriggerValue::Text(v.to_rfc3339()))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<chrono::NaiveDate>>(0)?
            .map_or(TriggerValue::Null, |v| TriggerValue::Text(v.to_string()))
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        row.try_get::<_, Option<String>>(0)?
            .map_or(TriggerValue::Null, TriggerValue::Text)
    } else {
        return Err(WarehouseError::Message(format!(
            "unsupported trigger value type '{}'",
            ty
        )));
    };
    Ok(value)
}
