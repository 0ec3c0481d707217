/*!
 * Single-level unit of work over a sea-orm transaction.
 *
 * `run_atomic` commits when the closure returns `Ok`, rolls back when it
 * returns `Err`, and rolls back then resumes the unwind when it panics.
 */

use crate::errors::ServiceError;
use futures::future::{BoxFuture, FutureExt};
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

tokio::task_local! {
    static IN_ATOMIC: ();
}

#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    db: Arc<DatabaseConnection>,
}

impl TransactionCoordinator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Runs `f` inside one database transaction.
    ///
    /// Nesting is rejected with `InternalError`: `f` must not call
    /// `run_atomic` again. If the commit itself fails the caller gets
    /// `InternalError` and must assume nothing was persisted.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// coordinator
    ///     .run_atomic(|txn| {
    ///         Box::pin(async move {
    ///             repo.insert_header(txn, &header).await?;
    ///             repo.insert_lines(txn, &lines).await?;
    ///             Ok(())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_atomic<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>>
            + Send,
        T: Send,
    {
        if IN_ATOMIC.try_with(|_| ()).is_ok() {
            error!("run_atomic called from inside another run_atomic");
            return Err(ServiceError::InternalError(
                "nested transactions are not supported".to_string(),
            ));
        }

        let transaction_id = Uuid::new_v4();
        let start = std::time::Instant::now();

        let txn = self.db.begin().await.map_err(|e| {
            error!(transaction_id = %transaction_id, error = %e, "Failed to begin transaction");
            ServiceError::transaction("begin", e)
        })?;
        debug!(transaction_id = %transaction_id, "Started database transaction");
        counter!("return_orders_db.transaction.started", 1);

        let outcome = IN_ATOMIC
            .scope((), AssertUnwindSafe(f(&txn)).catch_unwind())
            .await;

        let result = match outcome {
            Ok(Ok(value)) => match txn.commit().await {
                Ok(()) => {
                    counter!("return_orders_db.transaction.committed", 1);
                    debug!(transaction_id = %transaction_id, "Transaction committed");
                    Ok(value)
                }
                Err(e) => {
                    counter!("return_orders_db.transaction.commit_failed", 1);
                    error!(transaction_id = %transaction_id, error = %e, "Transaction commit failed");
                    Err(ServiceError::transaction("commit", e))
                }
            },
            Ok(Err(err)) => {
                if let Err(e) = txn.rollback().await {
                    error!(transaction_id = %transaction_id, error = %e, "Rollback failed");
                }
                counter!("return_orders_db.transaction.rolled_back", 1);
                warn!(transaction_id = %transaction_id, error = %err, "Transaction rolled back");
                Err(err)
            }
            Err(panic) => {
                if let Err(e) = txn.rollback().await {
                    error!(transaction_id = %transaction_id, error = %e, "Rollback after panic failed");
                }
                counter!("return_orders_db.transaction.rolled_back", 1);
                error!(transaction_id = %transaction_id, "Transaction rolled back after panic");
                std::panic::resume_unwind(panic);
            }
        };

        histogram!(
            "return_orders_db.transaction.duration",
            start.elapsed().as_secs_f64()
        );
        result
    }
}
