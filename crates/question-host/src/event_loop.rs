use std::cell::{Cell, RefCell};
use std::time::Duration;

use question_core::{TaskHandle, TaskQueue};
use tracing::trace;

struct Task {
    due: Duration,
    seq: u64,
    run: Box<dyn FnOnce()>,
}

/// Deterministic single-threaded task queue with a virtual clock.
///
/// Nothing runs until the host calls [`turn`](Self::turn),
/// [`run_until_idle`](Self::run_until_idle) or [`advance`](Self::advance).
#[derive(Default)]
pub struct VirtualLoop {
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    tasks: RefCell<Vec<Task>>,
}

impl TaskQueue for VirtualLoop {
    fn defer(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskHandle {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.tasks.borrow_mut().push(Task {
            due: self.now.get() + delay,
            seq,
            run: task,
        });
        trace!(seq, delay_ms = delay.as_millis() as u64, "task deferred");
        TaskHandle(seq)
    }
}

impl VirtualLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Runs the tasks due now that were queued before the call; work they
    /// queue waits for the next turn. Returns the number of tasks run.
    pub fn turn(&self) -> usize {
        let cutoff = self.next_seq.get();
        let mut ran = 0;
        while let Some(task) = self.take_due(cutoff) {
            (task.run)();
            ran += 1;
        }
        ran
    }

    /// Runs turns until nothing is due at the current time.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let count = self.turn();
            if count == 0 {
                return ran;
            }
            ran += count;
        }
    }

    /// Moves the clock forward by `delay`, running every task that falls due
    /// on the way in timeline order.
    pub fn advance(&self, delay: Duration) -> usize {
        let target = self.now.get() + delay;
        let mut ran = self.run_until_idle();
        while let Some(due) = self.next_due(target) {
            self.now.set(due);
            ran += self.run_until_idle();
        }
        self.now.set(target);
        ran + self.run_until_idle()
    }

    fn next_due(&self, limit: Duration) -> Option<Duration> {
        self.tasks
            .borrow()
            .iter()
            .map(|task| task.due)
            .filter(|due| *due <= limit)
            .min()
    }

    fn take_due(&self, cutoff: u64) -> Option<Task> {
        let mut tasks = self.tasks.borrow_mut();
        let now = self.now.get();
        let index = tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due <= now && task.seq < cutoff)
            .min_by_key(|(_, task)| (task.due, task.seq))
            .map(|(index, _)| index)?;
        Some(tasks.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, Rc<VirtualLoop>) {
        (Rc::new(RefCell::new(Vec::new())), Rc::new(VirtualLoop::new()))
    }

    #[test]
    fn zero_delay_tasks_wait_for_a_turn() {
        let (log, tasks) = recorder();
        let sink = log.clone();
        tasks.defer(Duration::ZERO, Box::new(move || sink.borrow_mut().push("a")));

        assert!(log.borrow().is_empty());
        assert_eq!(tasks.turn(), 1);
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn tasks_queued_during_a_turn_run_on_the_next_one() {
        let (log, tasks) = recorder();
        let sink = log.clone();
        let queue = tasks.clone();
        tasks.defer(
            Duration::ZERO,
            Box::new(move || {
                sink.borrow_mut().push("outer");
                let inner = sink.clone();
                queue.defer(Duration::ZERO, Box::new(move || inner.borrow_mut().push("inner")));
            }),
        );

        assert_eq!(tasks.turn(), 1);
        assert_eq!(*log.borrow(), vec!["outer"]);
        assert_eq!(tasks.turn(), 1);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn advance_runs_delayed_tasks_in_timeline_order() {
        let (log, tasks) = recorder();
        for (delay, label) in [(150, "late"), (10, "early"), (0, "now")] {
            let sink = log.clone();
            tasks.defer(
                Duration::from_millis(delay),
                Box::new(move || sink.borrow_mut().push(label)),
            );
        }

        assert_eq!(tasks.advance(Duration::from_millis(100)), 2);
        assert_eq!(*log.borrow(), vec!["now", "early"]);
        assert_eq!(tasks.pending(), 1);

        tasks.advance(Duration::from_millis(50));
        assert_eq!(*log.borrow(), vec!["now", "early", "late"]);
        assert_eq!(tasks.now(), Duration::from_millis(150));
    }
}
