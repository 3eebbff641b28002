use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use serde::Serialize;
use slotmap::{SlotMap, new_key_type};
use std::collections::VecDeque;

use crate::sim::Process;

// Index into Task Vec
pub type TaskId = usize;
pub type Ticks = u64;
new_key_type! {
    pub struct DsqId;
}

/// Ordering key of a priority DSQ. Compared lexicographically, smallest first.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct Rank(pub [u64; 3]);

impl Rank {
    pub fn new(primary: u64, secondary: u64, tertiary: u64) -> Self {
        Self([primary, secondary, tertiary])
    }
}

// KeyedPriorityQueue is a max-heap, so we need to flip-flop Rank's Ord
impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.0.cmp(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    NotArrived,
    Ready,
    Running,
    Completed,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub process: Process,
    pub state: TaskState,
    pub remaining: Ticks,
    pub allocated_slice: Option<Ticks>,
    pub consumed_slice: Ticks,
    pub first_run: Option<Ticks>,
    pub completion_time: Option<Ticks>,
    pub missed_deadline: bool,
}

impl Task {
    pub fn slice_expired(&self) -> bool {
        self.allocated_slice
            .is_some_and(|slice| self.consumed_slice >= slice)
    }
}

#[derive(Debug)]
pub enum Dsq {
    Fifo {
        tasks: VecDeque<TaskId>,
    },
    Priq {
        tasks: KeyedPriorityQueue<TaskId, Rank>,
    },
}

impl Dsq {
    pub fn new_fifo() -> Self {
        Self::Fifo {
            tasks: VecDeque::new(),
        }
    }

    pub fn new_priq() -> Self {
        Self::Priq {
            tasks: KeyedPriorityQueue::new(),
        }
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        match self {
            Self::Fifo { tasks } => tasks.contains(&task_id),
            Self::Priq { tasks } => tasks.iter().any(|t| *t.0 == task_id),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fifo { tasks } => tasks.len(),
            Self::Priq { tasks } => tasks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the executor and the policies share during one run: the clock,
/// the single CPU slot, the task table and the ready queues.
#[derive(Debug)]
pub struct SimCtx {
    pub now: Ticks,
    pub current: Option<TaskId>,
    pub tasks: Vec<Task>,
    pub dsqs: SlotMap<DsqId, Dsq>,
    pub task_to_dsq: FxHashMap<TaskId, DsqId>,

    // Last task that held the CPU, for context switch accounting
    last_ran: Option<TaskId>,
}

impl Default for SimCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl SimCtx {
    pub fn new() -> Self {
        Self {
            now: 0,
            current: None,
            tasks: Vec::new(),
            dsqs: SlotMap::with_key(),
            task_to_dsq: FxHashMap::default(),
            last_ran: None,
        }
    }

    pub fn create_task(&mut self, process: Process) -> TaskId {
        let id = self.tasks.len();
        let task = Task {
            id,
            remaining: process.burst,
            process,
            state: TaskState::NotArrived,
            allocated_slice: None,
            consumed_slice: 0,
            first_run: None,
            completion_time: None,
            missed_deadline: false,
        };
        self.tasks.push(task);

        id
    }

    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
    }

    pub fn create_dsq_fifo(&mut self) -> DsqId {
        self.dsqs.insert(Dsq::new_fifo())
    }

    pub fn create_dsq_priq(&mut self) -> DsqId {
        self.dsqs.insert(Dsq::new_priq())
    }

    fn dsq_push(&mut self, dsq_id: DsqId, task_id: TaskId, rank: Option<Rank>) {
        assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Task {task_id} already present in some DSQ"
        );

        let now = self.now;
        let task = self.task(task_id);
        debug_assert!(
            task.state == TaskState::Ready,
            "Task {task_id} must be Ready when enqueued"
        );
        debug_assert!(
            task.process.arrival <= now,
            "Task {task_id} enqueued before its arrival"
        );

        let dsq = self.dsqs.get_mut(dsq_id).expect("Unknown DSQ");
        match dsq {
            Dsq::Fifo { tasks } => tasks.push_back(task_id),
            Dsq::Priq { tasks } => {
                tasks.push(
                    task_id,
                    rank.expect("Attempted to push to a PrioDsq with no rank"),
                );
            }
        };

        self.task_to_dsq.insert(task_id, dsq_id);
    }

    pub fn dsq_push_fifo(&mut self, dsq_id: DsqId, task_id: TaskId) {
        self.dsq_push(dsq_id, task_id, None);
    }

    pub fn dsq_push_priq(&mut self, dsq_id: DsqId, task_id: TaskId, rank: Rank) {
        self.dsq_push(dsq_id, task_id, Some(rank));
    }

    pub fn dsq_pop(&mut self, dsq_id: DsqId) -> Option<TaskId> {
        let dsq = self.dsqs.get_mut(dsq_id)?;
        let task = match dsq {
            Dsq::Fifo { tasks } => tasks.pop_front(),
            Dsq::Priq { tasks } => tasks.pop().map(|t| t.0),
        }?;

        let removed = self.task_to_dsq.remove(&task);
        debug_assert!(removed.is_some(), "Task {task} missing DSQ membership");

        Some(task)
    }

    /// Rank of the task a priority DSQ would pop next.
    pub fn dsq_peek_rank(&self, dsq_id: DsqId) -> Option<Rank> {
        match self.dsqs.get(dsq_id)? {
            Dsq::Fifo { .. } => None,
            Dsq::Priq { tasks } => tasks.peek().map(|(_, rank)| *rank),
        }
    }

    pub fn dsq_is_empty(&self, dsq_id: DsqId) -> bool {
        self.dsqs.get(dsq_id).is_none_or(Dsq::is_empty)
    }

    pub fn task_in_any_dsq(&self, task_id: TaskId) -> bool {
        self.task_to_dsq.contains_key(&task_id)
    }

    pub fn task(&self, task_id: TaskId) -> &Task {
        &self.tasks[task_id]
    }

    pub fn task_mut(&mut self, task_id: TaskId) -> &mut Task {
        &mut self.tasks[task_id]
    }

    pub fn cpu_is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn all_completed(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Completed)
    }

    pub fn mark_ready(&mut self, task_id: TaskId) {
        let task = self.task_mut(task_id);
        debug_assert!(
            task.state != TaskState::Completed,
            "Completed task {} cannot be ready",
            task.id
        );
        task.state = TaskState::Ready;
        task.allocated_slice = None;
        task.consumed_slice = 0;
    }

    pub fn mark_completed(&mut self, task_id: TaskId, completion_time: Ticks) {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Completing task {} that is still enqueued",
            task_id
        );

        let task = &mut self.tasks[task_id];
        debug_assert!(
            task.state == TaskState::Running,
            "Task {task_id} must have been running before marked complete"
        );
        debug_assert_eq!(task.remaining, 0, "Task {task_id} completed with work left");
        debug_assert!(
            task.completion_time.is_none(),
            "Task {task_id} completed twice"
        );

        task.state = TaskState::Completed;
        task.allocated_slice = None;
        task.completion_time = Some(completion_time);
    }

    /// Put `task_id` on the CPU for at most `slice` ticks. Returns true when
    /// this is a context switch, i.e. a different task than the last one runs.
    pub fn set_running(&mut self, task_id: TaskId, slice: Ticks) -> bool {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Running task {task_id} must not be enqueued"
        );
        debug_assert!(self.current.is_none(), "CPU already running a task");

        let now = self.now;
        self.current = Some(task_id);
        let task = self.task_mut(task_id);
        debug_assert_eq!(task.state, TaskState::Ready, "Task {task_id} not ready");
        task.state = TaskState::Running;
        task.allocated_slice = Some(slice);
        task.consumed_slice = 0;
        task.first_run.get_or_insert(now);

        let switched = self.last_ran.is_some_and(|prev| prev != task_id);
        self.last_ran = Some(task_id);
        switched
    }

    pub fn clear_cpu(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(id: u64, arrival: Ticks, burst: Ticks) -> Process {
        Process::new(id, arrival, burst)
    }

    #[test]
    fn priq_pops_smallest_rank_first() {
        let mut ctx = SimCtx::new();
        let dsq = ctx.create_dsq_priq();
        for (i, burst) in [5, 2, 9].into_iter().enumerate() {
            let task = ctx.create_task(process(i as u64 + 1, 0, burst));
            ctx.mark_ready(task);
            ctx.dsq_push_priq(dsq, task, Rank::new(burst, task as u64, 0));
        }

        assert_eq!(ctx.dsq_peek_rank(dsq), Some(Rank::new(2, 1, 0)));
        assert_eq!(ctx.dsq_pop(dsq), Some(1));
        assert_eq!(ctx.dsq_pop(dsq), Some(0));
        assert_eq!(ctx.dsq_pop(dsq), Some(2));
        assert_eq!(ctx.dsq_pop(dsq), None);
        assert!(ctx.task_to_dsq.is_empty());
    }

    #[test]
    fn rank_ties_fall_through_to_later_fields() {
        assert!(Rank::new(1, 3, 0) > Rank::new(1, 4, 0));
        assert!(Rank::new(1, 9, 9) > Rank::new(2, 0, 0));
    }

    #[test]
    #[should_panic(expected = "already present in some DSQ")]
    fn task_cannot_sit_in_two_dsqs() {
        let mut ctx = SimCtx::new();
        let a = ctx.create_dsq_fifo();
        let b = ctx.create_dsq_fifo();
        let task = ctx.create_task(process(1, 0, 1));
        ctx.mark_ready(task);
        ctx.dsq_push_fifo(a, task);
        ctx.dsq_push_fifo(b, task);
    }

    #[test]
    fn context_switch_only_counts_a_different_task() {
        let mut ctx = SimCtx::new();
        let a = ctx.create_task(process(1, 0, 3));
        let b = ctx.create_task(process(2, 0, 3));
        ctx.mark_ready(a);
        ctx.mark_ready(b);

        assert!(!ctx.set_running(a, 1));
        ctx.clear_cpu();
        ctx.mark_ready(a);
        assert!(!ctx.set_running(a, 1));
        ctx.clear_cpu();
        ctx.mark_ready(a);
        assert!(ctx.set_running(b, 1));
    }
}
