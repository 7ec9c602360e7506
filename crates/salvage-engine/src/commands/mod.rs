//! Command orchestration layer.
//!
//! Each run:
//! - gets a fresh `RunId`, attached to every lifecycle event as `run_id`
//! - emits exactly one `log_op_start!` and one `log_op_end!`/`log_op_error!`
//! - returns a report; only run-level failures become `Err`
//!
//! Lower layers (store, core) use only `tracing::debug!()`/`warn!()`.

pub mod conversation;
pub mod organize;
pub mod recover;

use salvage_core::errors::{ExError, ExErrorKind};
use salvage_store::errors::Result;
use std::path::Path;

/// Refuse an output directory that contains, or sits inside, the history
/// root, since it is cleared before use
///
/// Paths that cannot be resolved yet (a destination that does not exist)
/// cannot overlap and pass.
///
/// # Errors
///
/// `DestinationUnavailable` on overlap.
pub(crate) fn ensure_outside_history(output: &Path, history_root: &Path) -> Result<()> {
    let (Ok(output_abs), Ok(history_abs)) = (output.canonicalize(), history_root.canonicalize())
    else {
        return Ok(());
    };

    if history_abs.starts_with(&output_abs) || output_abs.starts_with(&history_abs) {
        return Err(ExError::new(ExErrorKind::DestinationUnavailable)
            .with_op("prepare_destination")
            .with_path(output)
            .with_message(format!(
                "refusing to clear {}: it overlaps the history root {}",
                output.display(),
                history_root.display()
            )));
    }
    Ok(())
}
