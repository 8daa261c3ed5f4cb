#![warn(clippy::all, rust_2018_idioms)]

/// Query-scoped logging macros.
///
/// Every event carries the query id as a structured `query_id` field plus the
/// emitting module and line, so one query can be followed through the log
/// file with a single filter. The first argument is anything that implements
/// `Display` (a `QueryHandle` or a plain id string).
#[macro_export]
macro_rules! query_debug {
    ($query_id:expr, $($arg:tt)*) => {
        tracing::debug!(query_id = %$query_id, "[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! query_info {
    ($query_id:expr, $($arg:tt)*) => {
        tracing::info!(query_id = %$query_id, "[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! query_warn {
    ($query_id:expr, $($arg:tt)*) => {
        tracing::warn!(query_id = %$query_id, "[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! query_error {
    ($query_id:expr, $($arg:tt)*) => {
        tracing::error!(query_id = %$query_id, "[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
    };
}
