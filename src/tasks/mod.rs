/// Call descriptor construction
pub mod call;

/// Bundle submission tasks
pub mod submit;

/// Chain head watcher task
pub mod watcher;
