use sqlx::PgConnection;

/// A live connection to the database which can be lent out to a query
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Provides access to the external systems the domain's driven ports talk to
pub trait ExternalConnectivity {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;
}

/// External connectivity with an open transaction that must be committed for its writes to stick
pub trait TransactionHandle: ExternalConnectivity {
    async fn commit(self) -> Result<(), anyhow::Error>;
}

pub trait Transactable {
    type Handle: TransactionHandle;

    async fn start_transaction(&self) -> Result<Self::Handle, anyhow::Error>;
}

pub trait TransactableExternalConnectivity: ExternalConnectivity + Transactable {}

impl<T: ExternalConnectivity + Transactable> TransactableExternalConnectivity for T {}
