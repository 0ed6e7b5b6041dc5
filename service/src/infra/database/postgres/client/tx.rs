//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

use super::NonTx;

/// Transactional Postgres database client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to check a [`Connection`] out of, if the origin
    /// [`NonTx`] client has none to hand over.
    pool: connection::Pool,

    /// Shared state of this client.
    state: Arc<State>,
}

/// Shared state of a [`Tx`] client.
#[derive(Debug)]
struct State {
    /// Origin [`NonTx`] client whose [`Connection`] the transaction is opened
    /// on, if not yet taken.
    origin: RwLock<Option<NonTx>>,

    /// Lazily opened [`connection::Tx`].
    txn: Arc<RwLock<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client on top of the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            state: Arc::new(State {
                origin: RwLock::new(Some(client)),
                txn: Arc::new(RwLock::new(None)),
            }),
        }
    }

    /// Returns the backing [`Connection`] of this [`Tx`] client, opening the
    /// transaction on first use.
    async fn conn(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let read = self.state.txn.read().await;
        let guard = if read.is_none() {
            drop(read);

            let mut write = self.state.txn.write().await;
            if write.is_none() {
                // Prefer the `Connection` of the origin client, so that the
                // transaction observes its previous non-transactional work.
                let mut handed_over = None;
                if self.state.origin.read().await.is_some() {
                    if let Some(cl) = self.state.origin.write().await.take() {
                        handed_over = cl.take_conn().await;
                    }
                }

                let conn = if let Some(c) = handed_over {
                    c
                } else {
                    self.pool
                        .get()
                        .await
                        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                        .map_err(tracerr::map_from)?
                };

                *write = Some(
                    connection::Tx::from_non_tx(conn)
                        .await
                        .map_err(tracerr::wrap!())?,
                );
            }

            write.downgrade()
        } else {
            read
        };

        Ok(RwLockReadGuard::map(guard, |txn| {
            txn.as_ref()
                .expect("connection cannot be dropped while guard is alive")
        }))
    }

    /// Takes the backing [`connection::Tx`] out of this [`Tx`] client.
    async fn take_txn(&self) -> Option<connection::Tx> {
        self.state.txn.write().await.take()
    }

    /// Commits this [`Tx`] client.
    ///
    /// # Errors
    ///
    /// If the transaction fails to commit.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        if let Some(txn) = self.take_txn().await {
            txn.commit().await.map_err(tracerr::wrap!())
        } else {
            // No transaction was opened, so there is nothing to commit.
            Ok(())
        }
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.conn()
            .await
            .map_err(tracerr::wrap!())?
            .query(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.conn()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.conn()
            .await
            .map_err(tracerr::wrap!())?
            .exec(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn batch_exec(
        &self,
        query: &str,
    ) -> Result<(), Traced<database::Error>> {
        self.conn()
            .await
            .map_err(tracerr::wrap!())?
            .batch_exec(query)
            .await
            .map_err(tracerr::wrap!())
    }
}
