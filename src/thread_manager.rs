use log::info;
pub type TaskID = i32;

/// A unit of work driven repeatedly on its own thread. Returning `false` finishes the task.
pub trait SteppableTask: Send + 'static {
    fn step(&mut self) -> bool;
}

pub struct ThreadManager {
    current_task_id: TaskID,
    tasks: std::collections::HashMap<TaskID, std::thread::JoinHandle<()>>,
    // Dropped to signal shutdown; every receiver then reports disconnection.
    shutdown_sender: Option<crossbeam_channel::Sender<()>>,
    shutdown_receiver: crossbeam_channel::Receiver<()>,
}

impl ThreadManager {
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_sender, shutdown_receiver) = crossbeam_channel::bounded::<()>(0);
        ThreadManager {
            current_task_id: 0,
            tasks: std::collections::HashMap::new(),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver,
        }
    }

    /// Receiver that disconnects once `stop_all_tasks` is called. Tasks that wait inside
    /// `step` select on it so a stop request cuts the wait short.
    #[must_use]
    pub fn shutdown_signal(&self) -> crossbeam_channel::Receiver<()> {
        self.shutdown_receiver.clone()
    }

    /// Spawns a named thread that steps `task` back to back until it finishes or is stopped.
    ///
    /// # Panics
    ///
    /// Will panic if the thread does not spawn successfully.
    pub fn add_task<T>(&mut self, name: &str, task: T) -> TaskID
    where
        T: SteppableTask,
    {
        let id = self.current_task_id;

        let shutdown_receiver = self.shutdown_receiver.clone();
        let task_name = name.to_string();

        let handle = std::thread::Builder::new()
            .name(task_name.clone())
            .spawn(move || {
                info!("ThreadManager: task '{task_name}' started.");
                run_task_continuously(task, &shutdown_receiver);
                info!("ThreadManager: task '{task_name}' finished.");
            })
            .expect("Failed to spawn thread");
        self.tasks.insert(id, handle);
        self.current_task_id += 1;
        id
    }

    pub fn stop_all_tasks(&mut self) {
        info!("ThreadManager: Signaling all tasks to stop...");
        self.shutdown_sender.take();
    }

    /// Joins the task's thread. Returns `false` when the id is unknown.
    pub fn wait_on_task_finish(&mut self, task_id: TaskID) -> bool {
        match self.tasks.remove(&task_id) {
            Some(handle) => {
                let _ = handle.join();
                true
            }
            None => false,
        }
    }
}

impl Default for ThreadManager {
    fn default() -> Self {
        ThreadManager::new()
    }
}

fn run_task_continuously<T: SteppableTask>(
    mut task: T,
    shutdown_receiver: &crossbeam_channel::Receiver<()>,
) {
    loop {
        match shutdown_receiver.try_recv() {
            Ok(()) | Err(crossbeam_channel::TryRecvError::Disconnected) => break,
            Err(crossbeam_channel::TryRecvError::Empty) => {}
        }

        if !task.step() {
            break;
        }

        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::{SteppableTask, ThreadManager};

    /// Forwards a fixed number of values, then finishes on its own.
    struct BoundedForwarder {
        remaining: usize,
        sender: crossbeam_channel::Sender<usize>,
    }

    impl SteppableTask for BoundedForwarder {
        fn step(&mut self) -> bool {
            self.remaining -= 1;
            let _ = self.sender.send(self.remaining);
            self.remaining > 0
        }
    }

    /// Never finishes by itself; counts its steps.
    struct Heartbeat {
        beats: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl SteppableTask for Heartbeat {
        fn step(&mut self) -> bool {
            self.beats
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn when_tasks_finish_by_themselves_then_all_steps_are_observed() {
        let mut manager = ThreadManager::new();
        let (sender_1, receiver_1) = crossbeam_channel::unbounded();
        let (sender_2, receiver_2) = crossbeam_channel::unbounded();

        let task_1 = manager.add_task(
            "forwarder-1",
            BoundedForwarder {
                remaining: 3,
                sender: sender_1,
            },
        );
        let task_2 = manager.add_task(
            "forwarder-2",
            BoundedForwarder {
                remaining: 5,
                sender: sender_2,
            },
        );

        assert!(manager.wait_on_task_finish(task_1));
        assert!(manager.wait_on_task_finish(task_2));

        assert_eq!(receiver_1.try_iter().collect::<Vec<_>>(), vec![2, 1, 0]);
        assert_eq!(receiver_2.try_iter().count(), 5);
    }

    #[test]
    fn when_stop_all_tasks_called_then_endless_tasks_finish() {
        let mut manager = ThreadManager::new();
        let first_beats = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let second_beats = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let first = manager.add_task(
            "heartbeat-1",
            Heartbeat {
                beats: first_beats.clone(),
            },
        );
        let second = manager.add_task(
            "heartbeat-2",
            Heartbeat {
                beats: second_beats.clone(),
            },
        );

        std::thread::sleep(std::time::Duration::from_millis(100));
        manager.stop_all_tasks();
        assert!(manager.wait_on_task_finish(first));
        assert!(manager.wait_on_task_finish(second));

        assert!(first_beats.load(std::sync::atomic::Ordering::SeqCst) >= 1);
        assert!(second_beats.load(std::sync::atomic::Ordering::SeqCst) >= 1);
        assert!(manager.tasks.is_empty());
    }

    #[test]
    fn when_stop_all_tasks_called_then_shutdown_signal_wakes_waiters() {
        let mut manager = ThreadManager::new();
        let shutdown = manager.shutdown_signal();

        let waiter = std::thread::spawn(move || {
            let started = std::time::Instant::now();
            let woken = shutdown.recv_timeout(std::time::Duration::from_secs(30));
            (woken, started.elapsed())
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        manager.stop_all_tasks();
        let (woken, waited) = waiter.join().unwrap();

        assert_eq!(woken, Err(crossbeam_channel::RecvTimeoutError::Disconnected));
        assert!(waited < std::time::Duration::from_secs(5));
    }

    #[test]
    fn when_waiting_on_unknown_task_then_false_is_returned() {
        let mut manager = ThreadManager::new();
        let (sender, _receiver) = crossbeam_channel::unbounded();
        let task = manager.add_task(
            "forwarder",
            BoundedForwarder {
                remaining: 1,
                sender,
            },
        );

        assert!(manager.wait_on_task_finish(task));
        assert!(!manager.wait_on_task_finish(task));
        assert!(!manager.wait_on_task_finish(42));
    }
}
