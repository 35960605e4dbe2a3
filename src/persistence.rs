pub mod db_dashboard_driven_ports;
pub mod db_project_driven_ports;
pub mod db_risk_issue_driven_ports;
pub mod db_task_driven_ports;
pub mod db_time_entry_driven_ports;
pub mod db_user_driven_ports;

use crate::external_connections;
use crate::external_connections::ConnectionHandle;
use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::{Acquire, PgConnection, PgPool, Postgres, Transaction};

/// Production connectivity for the driven adapters, backed by a PostgreSQL pool.
/// Cloning is cheap since the pool is reference counted.
#[derive(Clone)]
pub struct ExternalConnectivity {
    db: PgPool,
}

impl ExternalConnectivity {
    pub fn new(db: PgPool) -> Self {
        ExternalConnectivity { db }
    }
}

/// A connection checked out of the pool. It returns to the pool when dropped.
pub struct PooledConnection {
    connection: PoolConnection<Postgres>,
}

impl ConnectionHandle for PooledConnection {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut self.connection
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    type DbHandle<'cxn_borrow> = PooledConnection;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error> {
        let connection = self
            .db
            .acquire()
            .await
            .context("acquiring connection from database pool")?;

        Ok(PooledConnection { connection })
    }
}

impl external_connections::Transactable for ExternalConnectivity {
    type Handle = ConnectivityInTransaction;

    async fn start_transaction(&self) -> Result<Self::Handle, anyhow::Error> {
        let txn = self
            .db
            .begin()
            .await
            .context("starting transaction from database pool")?;

        Ok(ConnectivityInTransaction { txn })
    }
}

/// Connectivity where every query runs inside one database transaction. Dropping it without
/// calling commit rolls the transaction back.
pub struct ConnectivityInTransaction {
    txn: Transaction<'static, Postgres>,
}

/// The transaction's connection, lent out for a single query
pub struct TransactionConnection<'tx> {
    connection: &'tx mut PgConnection,
}

impl ConnectionHandle for TransactionConnection<'_> {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut *self.connection
    }
}

impl external_connections::ExternalConnectivity for ConnectivityInTransaction {
    type DbHandle<'tx_borrow>
        = TransactionConnection<'tx_borrow>
    where
        Self: 'tx_borrow;

    async fn database_cxn(&mut self) -> Result<TransactionConnection<'_>, anyhow::Error> {
        let connection = self
            .txn
            .acquire()
            .await
            .context("acquiring connection from database transaction")?;

        Ok(TransactionConnection { connection })
    }
}

impl external_connections::TransactionHandle for ConnectivityInTransaction {
    async fn commit(self) -> Result<(), anyhow::Error> {
        self.txn
            .commit()
            .await
            .context("committing database transaction")
    }
}

/// Row produced by `SELECT count(*) AS count`
#[derive(sqlx::FromRow)]
struct Count {
    count: Option<i64>,
}

impl Count {
    fn count(&self) -> i64 {
        self.count.unwrap_or(0)
    }
}

/// Row produced by `INSERT ... RETURNING id`
#[derive(sqlx::FromRow)]
struct NewId {
    id: i32,
}
