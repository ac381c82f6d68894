//! # Task Management System
//!
//! A small worker pool for offloading work from the thread that owns the
//! engine state.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed on a worker
//! - `TaskResult`: The result of a completed task, which can spawn additional tasks
//! - `TaskChannel`: Communication channel between the owning thread and one worker
//!
//! The manager is generic over a context type `C`: results are handed a
//! `&mut C` when they are processed, so completion bookkeeping runs on the
//! owning thread without locks.
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send back results
//! 4. Results are processed on the owning thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks, which are published in turn
//!
//! ## Performance Considerations
//! - **Task Granularity**: Balance between too small (high overhead) and too large (poor load balancing)
//! - **Memory**: Each task should own its data to avoid excessive cloning
//! - **Blocking**: Avoid blocking operations in tasks that could starve other work

pub mod task;

use std::{
    collections::VecDeque,
    sync::mpsc::{channel, Receiver, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info};
use web_time::Instant;

use task::{Task, TaskResult};

/// A communication channel between the owning thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks to the worker
/// - `result_receiver`: Receives task results from the worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `_worker`: Handle to the worker thread; the worker exits once the sender is dropped
struct TaskChannel<C> {
    task_sender: Sender<Box<dyn Task<C> + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult<C> + Send>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of active worker channels
/// - `queued_tasks`: Tasks waiting for an available worker
/// - `current_channel`: Index for round-robin scheduling
pub struct TaskManager<C> {
    channels: Vec<TaskChannel<C>>,
    queued_tasks: VecDeque<Box<dyn Task<C> + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// This is set to 1 to ensure tasks are processed in order within each channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl<C: 'static> TaskManager<C> {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create
    pub fn new(num_workers: usize) -> Self {
        info!(
            "Starting {num_workers} task workers, available parallelism: {:?}",
            thread::available_parallelism()
        );

        let mut channels = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task<C> + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult<C> + Send>>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the send failed (the worker is gone), handing the task back
    fn try_send_task(
        &mut self,
        task: Box<dyn Task<C> + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task<C> + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds an available worker channel using round-robin from the last
    /// used channel, skipping channels at `MAX_TASKS_IN_FLIGHT`.
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start_channel = self.current_channel % self.channels.len();
        let mut current = start_channel;
        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// The task runs as soon as a worker becomes available, or is queued if
    /// all workers are busy.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued because all workers are busy
    pub fn publish_task(&mut self, task: Box<dyn Task<C> + Send>) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Schedules queued tasks, oldest first, while workers are available.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                return;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Channel is disconnected, put task back and stop processing
                    self.queued_tasks.push_front(task);
                    return;
                }
            }
        }
    }

    /// Processes all completed task results from worker threads.
    ///
    /// Must be called on the owning thread. Follow-up tasks are published
    /// and queued tasks are scheduled onto the freed workers.
    ///
    /// # Returns
    /// The number of results handled.
    pub fn process_completed_tasks(&mut self, context: &mut C) -> usize {
        let mut handled = 0;
        let mut tasks_to_queue = Vec::new();
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight -= 1;
                handled += 1;
                tasks_to_queue.extend(result.handle_result(context));
            }
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
        self.process_queued_tasks();
        handled
    }

    /// Processes results until all work is done or `timeout` passes.
    ///
    /// # Returns
    /// `true` if nothing is left in flight or queued.
    pub fn wait_for_tasks(&mut self, context: &mut C, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_completed_tasks(context);
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                debug!("Gave up waiting on {} tasks", self.in_flight_count());
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Number of tasks running on workers.
    pub fn in_flight_count(&self) -> usize {
        self.channels.iter().map(|c| c.num_tasks_in_flight).sum()
    }

    /// Number of tasks waiting for a worker.
    pub fn queued_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// True if no task is running or queued.
    pub fn is_idle(&self) -> bool {
        self.in_flight_count() == 0 && self.queued_tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Double(u32);

    struct Doubled(u32);

    impl Task<Vec<u32>> for Double {
        fn process(&self) -> Box<dyn TaskResult<Vec<u32>> + Send> {
            Box::new(Doubled(self.0 * 2))
        }
    }

    impl TaskResult<Vec<u32>> for Doubled {
        fn handle_result(self: Box<Self>, context: &mut Vec<u32>) -> Vec<Box<dyn Task<Vec<u32>> + Send>> {
            context.push(self.0);
            if self.0 < 8 {
                vec![Box::new(Double(self.0))]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn results_and_follow_ups_reach_the_context() {
        let mut manager: TaskManager<Vec<u32>> = TaskManager::new(2);
        let mut seen: Vec<u32> = Vec::new();
        manager.publish_task(Box::new(Double(1)));
        assert!(manager.wait_for_tasks(&mut seen, Duration::from_secs(5)));
        assert_eq!(seen, vec![2, 4, 8]);
    }

    #[test]
    fn excess_tasks_are_queued() {
        let mut manager: TaskManager<Vec<u32>> = TaskManager::new(1);
        assert!(manager.publish_task(Box::new(Double(10))));
        assert!(!manager.publish_task(Box::new(Double(20))));
        assert_eq!(manager.queued_count(), 1);

        let mut seen = Vec::new();
        assert!(manager.wait_for_tasks(&mut seen, Duration::from_secs(5)));
        seen.sort();
        assert_eq!(seen, vec![20, 40]);
    }

    #[test]
    fn no_workers_means_everything_queues() {
        let mut manager: TaskManager<Vec<u32>> = TaskManager::new(0);
        assert!(!manager.publish_task(Box::new(Double(1))));
        assert!(!manager.wait_for_tasks(&mut Vec::new(), Duration::from_millis(5)));
    }
}
