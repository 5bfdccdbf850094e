use std::collections::VecDeque;

use crate::model::{ProcId, ProcState, Process};

/// Round-robin process scheduler: equal quanta, FIFO among READY
/// processes. A preempted process re-enters behind everything that became
/// ready since it started running.
pub struct ProcScheduler {
    quantum_us: u64,
    ready: VecDeque<ProcId>,
    blocked: Vec<ProcId>,
    current: Option<ProcId>,
    remaining_quantum_us: i64,
}

impl ProcScheduler {
    pub fn new(quantum_us: u64) -> Self {
        Self {
            quantum_us,
            ready: VecDeque::new(),
            blocked: Vec::new(),
            current: None,
            remaining_quantum_us: 0,
        }
    }

    pub fn add(&mut self, id: ProcId, procs: &mut [Process]) {
        procs[id.0].state = ProcState::Ready;
        self.ready.push_back(id);
    }

    /// Pops the ready head and gives it a fresh quantum.
    pub fn schedule_next(&mut self, procs: &mut [Process]) -> Option<ProcId> {
        let id = self.ready.pop_front()?;
        procs[id.0].state = ProcState::Running;
        self.current = Some(id);
        self.remaining_quantum_us = self.quantum_us as i64;
        Some(id)
    }

    /// Charges `dt` against the running quantum. Returns true when the
    /// quantum ran out and the process was preempted to the ready tail.
    pub fn consume(&mut self, dt_us: u64, procs: &mut [Process]) -> bool {
        let Some(id) = self.current else {
            return false;
        };
        self.remaining_quantum_us -= dt_us as i64;
        if self.remaining_quantum_us <= 0 {
            procs[id.0].state = ProcState::Ready;
            self.ready.push_back(id);
            self.current = None;
            return true;
        }
        false
    }

    pub fn block_current(&mut self, procs: &mut [Process]) -> Option<ProcId> {
        let id = self.current.take()?;
        procs[id.0].state = ProcState::Blocked;
        self.blocked.push(id);
        Some(id)
    }

    pub fn unblock(&mut self, id: ProcId, procs: &mut [Process]) {
        if let Some(pos) = self.blocked.iter().position(|&p| p == id) {
            self.blocked.remove(pos);
            procs[id.0].state = ProcState::Ready;
            self.ready.push_back(id);
        }
    }

    pub fn terminate_current(&mut self, procs: &mut [Process]) -> Option<ProcId> {
        let id = self.current.take()?;
        procs[id.0].state = ProcState::Terminated;
        Some(id)
    }

    pub fn current(&self) -> Option<ProcId> {
        self.current
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    pub fn blocked(&self) -> &[ProcId] {
        &self.blocked
    }

    /// Anything still running, waiting to run, or waiting on I/O.
    pub fn has_live_processes(&self) -> bool {
        self.current.is_some() || !self.ready.is_empty() || !self.blocked.is_empty()
    }

    pub fn remaining_quantum_us(&self) -> i64 {
        self.remaining_quantum_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OpKind;

    fn procs(n: usize) -> Vec<Process> {
        (0..n)
            .map(|i| Process::new(format!("p{i}"), vec![(OpKind::Read, 100)]))
            .collect()
    }

    fn setup(n: usize) -> (ProcScheduler, Vec<Process>) {
        let mut sched = ProcScheduler::new(20_000);
        let mut table = procs(n);
        for i in 0..n {
            sched.add(ProcId(i), &mut table);
        }
        (sched, table)
    }

    #[test]
    fn round_robin_order_is_fifo() {
        let (mut sched, mut table) = setup(3);
        assert_eq!(sched.schedule_next(&mut table), Some(ProcId(0)));
        assert_eq!(table[0].state, ProcState::Running);
        // Burn the whole quantum: back to the tail, behind 1 and 2.
        assert!(sched.consume(20_000, &mut table));
        assert_eq!(table[0].state, ProcState::Ready);
        assert_eq!(sched.schedule_next(&mut table), Some(ProcId(1)));
        sched.consume(20_000, &mut table);
        assert_eq!(sched.schedule_next(&mut table), Some(ProcId(2)));
        sched.consume(20_000, &mut table);
        assert_eq!(sched.schedule_next(&mut table), Some(ProcId(0)));
    }

    #[test]
    fn partial_consumption_keeps_the_process_running() {
        let (mut sched, mut table) = setup(1);
        sched.schedule_next(&mut table);
        assert!(!sched.consume(5_000, &mut table));
        assert_eq!(sched.current(), Some(ProcId(0)));
        assert_eq!(sched.remaining_quantum_us(), 15_000);
    }

    #[test]
    fn blocked_process_wakes_at_the_ready_tail() {
        let (mut sched, mut table) = setup(2);
        sched.schedule_next(&mut table);
        assert_eq!(sched.block_current(&mut table), Some(ProcId(0)));
        assert_eq!(table[0].state, ProcState::Blocked);
        assert!(sched.has_live_processes());

        sched.unblock(ProcId(0), &mut table);
        assert_eq!(table[0].state, ProcState::Ready);
        // Process 1 was already waiting; 0 queues behind it.
        assert_eq!(sched.schedule_next(&mut table), Some(ProcId(1)));
        sched.consume(20_000, &mut table);
        assert_eq!(sched.schedule_next(&mut table), Some(ProcId(0)));
    }

    #[test]
    fn consume_without_current_is_a_no_op() {
        let (mut sched, mut table) = setup(1);
        assert!(!sched.consume(1_000, &mut table));
        assert!(sched.has_ready());
    }
}
