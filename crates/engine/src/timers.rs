//! Virtual-clock timer wheel. Nothing fires on wall time; the host advances
//! the clock with [`crate::Engine::advance`] and due timers run in deadline
//! order, ties broken by scheduling order.

use crate::commands::RequestId;
use crate::events::EventData;
use crate::triggers::ListenerId;
use dom::NodeId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

pub type TimerId = u64;

#[derive(Clone, Debug)]
pub(crate) enum TimerTask {
    /// A `delay` trigger modifier elapsed; continue into debounce/throttle.
    ListenerDelay { listener: ListenerId, data: EventData },
    /// A debounce quiet period elapsed; dispatch now.
    ListenerDebounce { listener: ListenerId, data: EventData },
    Poll { node: NodeId, interval_ms: u64 },
    FetchTimeout { request: RequestId },
    ConfirmExpire { token: u64 },
    SwapDelay { job: u64 },
    SettleClear { job: u64 },
}

pub(crate) struct Timers {
    heap: BinaryHeap<Reverse<(u64, TimerId)>>,
    tasks: HashMap<TimerId, TimerTask>,
    next_id: TimerId,
}

impl Timers {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            tasks: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn schedule(&mut self, deadline: u64, task: TimerTask) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((deadline, id)));
        self.tasks.insert(id, task);
        id
    }

    pub fn cancel(&mut self, id: TimerId) {
        // stale heap entries are skipped when they surface
        self.tasks.remove(&id);
    }

    /// Next due task with deadline at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, TimerTask)> {
        while let Some(Reverse((deadline, id))) = self.heap.peek().copied() {
            if deadline > now {
                return None;
            }
            self.heap.pop();
            if let Some(task) = self.tasks.remove(&id) {
                return Some((deadline, task));
            }
        }
        None
    }

    /// Deadline of the nearest live timer.
    pub fn next_deadline(&mut self) -> Option<u64> {
        while let Some(Reverse((deadline, id))) = self.heap.peek().copied() {
            if self.tasks.contains_key(&id) {
                return Some(deadline);
            }
            self.heap.pop();
        }
        None
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order_with_stable_ties() {
        let mut timers = Timers::new();
        timers.schedule(30, TimerTask::ConfirmExpire { token: 3 });
        timers.schedule(10, TimerTask::ConfirmExpire { token: 1 });
        timers.schedule(10, TimerTask::ConfirmExpire { token: 2 });

        let mut order = Vec::new();
        while let Some((_, TimerTask::ConfirmExpire { token })) = timers.pop_due(100) {
            order.push(token);
        }
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timers = Timers::new();
        let id = timers.schedule(5, TimerTask::ConfirmExpire { token: 9 });
        timers.cancel(id);
        assert!(timers.pop_due(100).is_none());
        assert!(timers.is_empty());
    }

    #[test]
    fn respects_the_clock() {
        let mut timers = Timers::new();
        timers.schedule(50, TimerTask::ConfirmExpire { token: 1 });
        assert!(timers.pop_due(49).is_none());
        assert_eq!(timers.next_deadline(), Some(50));
        assert!(timers.pop_due(50).is_some());
    }
}
