// src/task/func.rs

use crate::task::context::{Task, TaskContext};

/// Task wrapping a closure as its `process` hook.
///
/// Built by [`SchedulerHandle::add_func`](crate::SchedulerHandle::add_func)
/// and [`then_func`](crate::SchedulerHandle::then_func).
pub struct FuncTask<F> {
    name: String,
    func: F,
}

impl<F> FuncTask<F>
where
    F: FnMut(&TaskContext<'_>) -> anyhow::Result<()> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self::named("func", func)
    }

    pub fn named(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Task for FuncTask<F>
where
    F: FnMut(&TaskContext<'_>) -> anyhow::Result<()> + Send + 'static,
{
    fn process(&mut self, cx: &TaskContext<'_>) -> anyhow::Result<()> {
        (self.func)(cx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
