//! Duration logging for document operations.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Operations slower than this are logged at warn level.
const SLOW_OPERATION: Duration = Duration::from_secs(2);

/// Logs how long an operation on one document took when it goes out of scope.
///
/// ```rust,ignore
/// let _timer = OperationTimer::start("undo", path);
/// ```
pub struct OperationTimer {
    operation: &'static str,
    document: PathBuf,
    started: Instant,
}

impl OperationTimer {
    /// Start timing `operation` on `document`.
    pub fn start(operation: &'static str, document: &Path) -> Self {
        Self {
            operation,
            document: document.to_path_buf(),
            started: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        if elapsed >= SLOW_OPERATION {
            warn!(
                operation = self.operation,
                path = %self.document.display(),
                elapsed_ms,
                "Slow document operation"
            );
        } else {
            debug!(
                operation = self.operation,
                path = %self.document.display(),
                elapsed_ms,
                "Document operation finished"
            );
        }
    }
}
