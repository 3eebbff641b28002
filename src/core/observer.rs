use super::state::{SimCtx, TaskState};

#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, ctx: &SimCtx) {
        self.step += 1;

        if let Some(task_id) = ctx.current {
            let task = ctx.task(task_id);
            debug_assert_eq!(
                task.state,
                TaskState::Running,
                "cpu.current task {task_id} must be Running"
            );
        }

        for task in &ctx.tasks {
            match task.state {
                TaskState::Running => debug_assert_eq!(
                    ctx.current,
                    Some(task.id),
                    "Task {} Running but not on the CPU",
                    task.id
                ),
                TaskState::Ready => {
                    debug_assert!(
                        task.process.arrival <= ctx.now,
                        "Task {} ready before its arrival",
                        task.id
                    );
                    debug_assert!(
                        ctx.task_in_any_dsq(task.id),
                        "Ready task {} missing from every DSQ",
                        task.id
                    );
                }
                TaskState::Completed => {
                    debug_assert_eq!(task.remaining, 0, "Task {} completed with work left", task.id);
                    debug_assert!(
                        task.completion_time.is_some(),
                        "Task {} completed without a completion time",
                        task.id
                    );
                }
                TaskState::NotArrived => {}
            }
            debug_assert!(
                task.remaining <= task.process.burst,
                "Task {} remaining exceeds its burst",
                task.id
            );
        }

        for (&task_id, &dsq_id) in &ctx.task_to_dsq {
            let task = ctx.task(task_id);
            debug_assert_eq!(
                task.state,
                TaskState::Ready,
                "Task {task_id} in DSQ {dsq_id:?} must be Ready"
            );
            if let Some(dsq) = ctx.dsqs.get(dsq_id) {
                debug_assert!(
                    dsq.contains(task_id),
                    "task_to_dsq claims task {task_id} in DSQ {dsq_id:?}, but queue does not contain it"
                );
            } else {
                debug_assert!(false, "task_to_dsq references unknown DSQ {dsq_id:?}");
            }
        }
    }
}
