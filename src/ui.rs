// src/ui.rs

//! Task notification interface
//!
//! Core components report what they are doing through the narrow [`Ui`]
//! trait and never through a concrete presentation layer. Work is bracketed
//! by [`Ui::push_task`] / [`Ui::pop_task_and_persist`]; failures are reported
//! with [`Ui::error`] before being propagated.
//!
//! Implementations:
//! - `LogUi`: logs task begin/end to tracing
//! - `SilentUi`: no-op, for tests and scripted use

use std::error::Error as StdError;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Handle for a task started with [`Ui::push_task`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub description: String,
    /// Nesting level at the time the task was pushed
    pub depth: usize,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Notification sink used by expression evaluation, writers and commands
pub trait Ui: Send + Sync {
    /// Begin a task
    fn push_task(&self, name: &str, description: &str) -> Task;

    /// Finish `task`, recording a short summary of its result
    fn pop_task_and_persist(&self, task: Task, result: &str);

    /// Report an error with context; the caller still propagates it
    fn error(&self, err: &dyn StdError, message: &str);

    fn info(&self, message: &str);

    fn debug(&self, message: &str);
}

/// Tracks the stack of open tasks, shared by the implementations below
#[derive(Debug, Default)]
struct TaskStack {
    tasks: Mutex<Vec<Task>>,
}

impl TaskStack {
    fn push(&self, name: &str, description: &str) -> Task {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let task = Task {
            name: name.to_string(),
            description: description.to_string(),
            depth: tasks.len(),
        };
        tasks.push(task.clone());
        task
    }

    /// Pop `task`; returns false if it was not the innermost open task
    fn pop(&self, task: &Task) -> bool {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        match tasks.last() {
            Some(top) if top == task => {
                tasks.pop();
                true
            }
            _ => {
                // Unwind to the task if it is open further down
                if let Some(pos) = tasks.iter().rposition(|t| t == task) {
                    tasks.truncate(pos);
                }
                false
            }
        }
    }

    fn depth(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Logs tasks and messages through tracing
#[derive(Debug, Default)]
pub struct LogUi {
    stack: TaskStack,
}

impl LogUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently open
    pub fn open_tasks(&self) -> usize {
        self.stack.depth()
    }
}

impl Ui for LogUi {
    fn push_task(&self, name: &str, description: &str) -> Task {
        let task = self.stack.push(name, description);
        info!("{}{}", indent(task.depth), description);
        task
    }

    fn pop_task_and_persist(&self, task: Task, result: &str) {
        if !self.stack.pop(&task) {
            warn!("Task '{}' finished out of order", task.name);
        }
        if result.is_empty() {
            info!("{}Done: {}", indent(task.depth), task.name);
        } else {
            info!("{}Done: {} -> {}", indent(task.depth), task.name, result);
        }
    }

    fn error(&self, err: &dyn StdError, message: &str) {
        error!("{}: {}", message, err);
    }

    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn debug(&self, message: &str) {
        debug!("{}", message);
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Silent UI (no-op)
///
/// Still keeps the task stack so mismatched push/pop pairs are detectable.
#[derive(Debug, Default)]
pub struct SilentUi {
    stack: TaskStack,
}

impl SilentUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_tasks(&self) -> usize {
        self.stack.depth()
    }
}

impl Ui for SilentUi {
    fn push_task(&self, name: &str, description: &str) -> Task {
        self.stack.push(name, description)
    }

    fn pop_task_and_persist(&self, task: Task, _result: &str) {
        self.stack.pop(&task);
    }

    fn error(&self, _err: &dyn StdError, _message: &str) {}

    fn info(&self, _message: &str) {}

    fn debug(&self, _message: &str) {}
}
