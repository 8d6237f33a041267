use crate::backend::{Connector, Transaction, TxOptions};
use crate::error::DbiError;

/// Owns a transaction until it is committed or rolled back.
///
/// Dropping an unfinished guard rolls back, which also covers a panic unwinding out of
/// the unit of work.
struct TxGuard<T: Transaction> {
    tx: T,
    finished: bool,
}

impl<T: Transaction> TxGuard<T> {
    fn commit(&mut self) -> Result<(), DbiError> {
        self.finished = true;
        match self.tx.commit() {
            Ok(()) => {
                tracing::debug!("transaction committed");
                Ok(())
            }
            Err(err) => {
                if let Err(rb_err) = self.tx.rollback() {
                    tracing::debug!(error = %rb_err, "rollback after failed commit");
                }
                Err(err)
            }
        }
    }

    fn rollback(&mut self) {
        self.finished = true;
        match self.tx.rollback() {
            Ok(()) => tracing::debug!("transaction rolled back"),
            Err(err) => tracing::warn!(error = %err, "rollback failed"),
        }
    }
}

impl<T: Transaction> Drop for TxGuard<T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if std::thread::panicking() {
            tracing::warn!("rolling back transaction during unwind");
        }
        if let Err(err) = self.tx.rollback() {
            tracing::warn!(error = %err, "rollback failed");
        }
    }
}

/// Run `work` inside one transaction.
///
/// Commits when `work` succeeds and surfaces a commit failure. Rolls back when `work`
/// returns an error (the original error is returned, not the rollback's) or panics (the
/// panic continues unchanged once the rollback ran).
///
/// # Errors
/// Returns `DbiError` from `BEGIN`, from `work`, or from `COMMIT`.
pub fn run_in_transaction<'c, C, T, F>(
    connector: &'c C,
    options: &TxOptions,
    work: F,
) -> Result<T, DbiError>
where
    C: Connector + ?Sized,
    F: FnOnce(&mut C::Tx<'c>) -> Result<T, DbiError>,
{
    let tx = connector.begin(options)?;
    tracing::debug!(
        read_only = options.read_only,
        isolation = ?options.isolation,
        "transaction started"
    );
    let mut guard = TxGuard {
        tx,
        finished: false,
    };

    match work(&mut guard.tx) {
        Ok(value) => {
            guard.commit()?;
            Ok(value)
        }
        Err(err) => {
            guard.rollback();
            Err(err)
        }
    }
}
