//! Run lifecycle macros
//!
//! Every engine run is bracketed by one `log_op_start!` and exactly one of
//! `log_op_end!` / `log_op_error!`, all carrying the run's id. Durations are
//! measured from the `Instant` taken when the run started.

/// Log the start of a run
///
/// # Example
///
/// ```
/// # use salvage_core::log_op_start;
/// let run_id = "0190-run";
/// log_op_start!("recover", run_id);
/// log_op_start!("recover", run_id, cutoff_ms = 1_700_000_000_000i64);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr, $run_id:expr $(, $($field:tt)+)?) => {{
        let run_id = &$run_id;
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::__schema::EVENT_START,
            run_id = %run_id,
            $($($field)+)?
        );
    }};
}

/// Log the successful end of a run, with counts as extra fields
///
/// # Example
///
/// ```
/// # use salvage_core::log_op_end;
/// let started = std::time::Instant::now();
/// log_op_end!("recover", "0190-run", started, recovered = 2usize);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, $run_id:expr, $started:expr $(, $($field:tt)+)?) => {{
        let run_id = &$run_id;
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::__schema::EVENT_END,
            run_id = %run_id,
            duration_ms = $started.elapsed().as_millis() as u64,
            $($($field)+)?
        );
    }};
}

/// Log a run that ended in a fatal error
///
/// The error may be anything convertible into `ExError`; its kind and
/// stable code are attached.
///
/// # Example
///
/// ```
/// # use salvage_core::log_op_error;
/// # use salvage_core::errors::{ExError, ExErrorKind};
/// let started = std::time::Instant::now();
/// let err = ExError::new(ExErrorKind::SourceUnavailable);
/// log_op_error!("recover", "0190-run", started, err);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $run_id:expr, $started:expr, $err:expr $(, $($field:tt)+)?) => {{
        let run_id = &$run_id;
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::__schema::EVENT_END_ERROR,
            run_id = %run_id,
            duration_ms = $started.elapsed().as_millis() as u64,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            message = %ex_err,
            $($($field)+)?
        );
    }};
}
