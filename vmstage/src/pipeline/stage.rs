//! Stage definition for table-driven pipeline execution.

/// A stage groups tasks that run one after another.
///
/// Stages are executed in order. A failing task stops the whole pipeline;
/// later tasks and stages never run.
///
/// Generic over task type T to allow different pipeline implementations.
#[derive(Debug, Clone)]
pub struct Stage<T> {
    pub tasks: Vec<T>,
}

impl<T> Stage<T> {
    /// Create a stage whose tasks run sequentially.
    pub fn sequential(tasks: Vec<T>) -> Self {
        Self { tasks }
    }
}
