// dbvault/src/restore/schema_reset.rs
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::config::DatabaseConfig;
use crate::errors::Result;

/// A live connection used to inspect and clear the target schema.
#[async_trait]
pub trait SchemaAdmin: Send {
    /// Names of all base tables in `schema`, sorted.
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>>;

    /// Runs every statement inside one transaction: all succeed or none apply.
    async fn execute_in_transaction(&mut self, statements: &[String]) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait SchemaConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SchemaAdmin>>;
}

pub struct PgSchemaConnector {
    options: PgConnectOptions,
}

impl PgSchemaConnector {
    pub fn new(db: &DatabaseConfig) -> Self {
        // PgConnectOptions::new() also honours PGPASSWORD / PGSSLMODE from the environment.
        let mut options = PgConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .username(&db.user)
            .database(&db.name);
        if let Some(password) = &db.password {
            options = options.password(password);
        }
        Self { options }
    }
}

#[async_trait]
impl SchemaConnector for PgSchemaConnector {
    async fn connect(&self) -> Result<Box<dyn SchemaAdmin>> {
        let conn = PgConnection::connect_with(&self.options).await?;
        Ok(Box::new(PgSchemaAdmin { conn }))
    }
}

pub struct PgSchemaAdmin {
    conn: PgConnection,
}

#[async_trait]
impl SchemaAdmin for PgSchemaAdmin {
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT tablename::text FROM pg_catalog.pg_tables
             WHERE schemaname = $1
             ORDER BY tablename",
        )
        .bind(schema)
        .fetch_all(&mut self.conn)
        .await?;
        Ok(tables)
    }

    async fn execute_in_transaction(&mut self, statements: &[String]) -> Result<()> {
        let mut tx = self.conn.begin().await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// One `DROP TABLE IF EXISTS ... CASCADE` per table, schema-qualified.
pub fn drop_statements(schema: &str, tables: &[String]) -> Vec<String> {
    tables
        .iter()
        .map(|table| {
            format!(
                "DROP TABLE IF EXISTS {}.{} CASCADE;",
                quote_identifier(schema),
                quote_identifier(table)
            )
        })
        .collect()
}

/// Drops every table in `schema` in a single transaction.
///
/// An empty schema is left alone: no statement is sent and no transaction is opened.
/// Returns the number of tables dropped.
pub async fn clear_schema(admin: &mut dyn SchemaAdmin, schema: &str) -> Result<usize> {
    let tables = admin.list_tables(schema).await?;
    if tables.is_empty() {
        println!("Schema {} is already empty", schema);
        return Ok(0);
    }

    tracing::debug!(schema, count = tables.len(), "dropping tables");
    admin
        .execute_in_transaction(&drop_statements(schema, &tables))
        .await?;
    println!("😳 Database cleared ({} tables dropped)", tables.len());
    Ok(tables.len())
}
