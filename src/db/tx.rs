/*
 * Responsibility
 * - Unit-of-work state carried across await points (task-local, never
 *   thread-local: one request hops worker threads)
 * - is_current_transaction_read_only(): the answer the connection router
 *   keys on; outside any unit of work there is nothing to inspect and the
 *   caller gets `false`
 */
use std::future::Future;

#[derive(Debug, Clone, Copy)]
struct TxContext {
    read_only: bool,
}

tokio::task_local! {
    static TX: TxContext;
}

/// Whether the active unit of work was declared read-only. `false` when no
/// unit of work is active — an un-scoped operation is assumed to need
/// up-to-date data.
pub fn is_current_transaction_read_only() -> bool {
    TX.try_with(|tx| tx.read_only).unwrap_or(false)
}

/// Whether any unit of work is active on this task.
pub fn in_transaction() -> bool {
    TX.try_with(|_| ()).is_ok()
}

/// Run `fut` as a read-only unit of work. Every pool acquisition inside is
/// routed to the reader replica.
pub async fn read_only<F>(fut: F) -> F::Output
where
    F: Future,
{
    TX.scope(TxContext { read_only: true }, fut).await
}

/// Run `fut` as a writable unit of work. Acquisitions route to the writer,
/// also when nested inside a read-only scope.
pub async fn read_write<F>(fut: F) -> F::Output
where
    F: Future,
{
    TX.scope(TxContext { read_only: false }, fut).await
}
