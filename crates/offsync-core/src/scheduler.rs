//! Cooperative frame scheduler.
//!
//! Tasks are plain values queued for the next frame of the owning loop.
//! Queuing a task that is already pending is a no-op, which is what turns a
//! burst of edits into a single deferred action.

/// Queue of tasks waiting for the next frame.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    pending: Vec<T>,
}

impl<T: PartialEq> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Queue `task` for the next frame unless an equal task is already queued.
    ///
    /// Returns `true` if the task was added.
    pub fn add_once(&mut self, task: T) -> bool {
        if self.is_scheduled(&task) {
            return false;
        }
        self.pending.push(task);
        true
    }

    pub fn is_scheduled(&self, task: &T) -> bool {
        self.pending.contains(task)
    }

    /// Take every task queued so far, in queue order.
    ///
    /// Tasks added while the returned ones run are kept for the following frame.
    pub fn take_pending(&mut self) -> Vec<T> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T: PartialEq> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Task {
        Save,
        Refresh,
    }

    #[test]
    fn test_add_once_coalesces() {
        let mut scheduler = Scheduler::new();
        assert!(scheduler.add_once(Task::Save));
        assert!(!scheduler.add_once(Task::Save));
        assert!(scheduler.add_once(Task::Refresh));
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn test_take_pending_preserves_order() {
        let mut scheduler = Scheduler::new();
        scheduler.add_once(Task::Refresh);
        scheduler.add_once(Task::Save);

        assert_eq!(scheduler.take_pending(), vec![Task::Refresh, Task::Save]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_rescheduling_lands_in_next_frame() {
        let mut scheduler = Scheduler::new();
        scheduler.add_once(Task::Save);

        let frame = scheduler.take_pending();
        for task in frame {
            // A task that re-queues itself while running
            assert!(scheduler.add_once(task));
        }

        assert!(scheduler.is_scheduled(&Task::Save));
        assert_eq!(scheduler.len(), 1);
    }
}
