//! Database dispatch macros for reducing code duplication.
//!
//! Repositories write each statement once and run it on whichever backend the
//! client's pool belongs to. The macros expand at compile time with zero
//! runtime overhead.

/// Macro for generating database dispatch match arms.
///
/// This macro generates match arms for `DbPool` variants, reducing the need
/// to manually write repetitive match statements.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     Postgres(p) => sqlx::query_scalar::<_, i64>(SQL).fetch_one(p).await,
///     SQLite(p) => sqlx::query_scalar::<_, i64>(SQL).fetch_one(p).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
