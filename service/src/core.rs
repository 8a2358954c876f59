//! Deferred command core shared by every service.
//!
//! [`ServiceCore`] owns a small ring of command queues. Producer threads
//! record [`CommandList`]s through cloned [`ServiceProxy`] handles and submit
//! them into the *record* queue; once per drain cycle the service rotates the
//! ring, drains the now *executable* queue in submission order, and publishes
//! its progress counter.
//!
//! # Architecture
//!
//! | Piece          | Role                                                    |
//! |----------------|---------------------------------------------------------|
//! | `ServiceCore`  | queue ring, cycle state, progress publication           |
//! | `ServiceProxy` | cloneable producer handle: record, submit, observe      |
//! | tickets        | `submit_command_list` returns the progress value that   |
//! |                | will be current once that list has executed             |
//!
//! Progress counts retired command lists. It is published with release
//! ordering only at the end of a successful cycle, so `progress() >= ticket`
//! guarantees that every command of the ticketed list has executed. An
//! aborted cycle retires its batch without publishing; the counter catches
//! up on the next successful cycle, which keeps waiters from unblocking
//! before the queue state is consistent again.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::command::{CommandList, ServiceApi};

/// Monotonic count of retired command lists.
pub type ServiceProgress = u64;

/// Default number of queues in the ring: one recording, one executing.
pub const DEFAULT_COMMAND_QUEUE_SLOTS: usize = 2;

static NEXT_SERVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Tuning knobs for a service's command core.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Queue ring length. Two is enough for a single drain thread; more
    /// slots let producers run further ahead of the consumer.
    pub command_queue_slots: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            command_queue_slots: DEFAULT_COMMAND_QUEUE_SLOTS,
        }
    }
}

struct QueueState<A: ServiceApi> {
    queues: Vec<Vec<CommandList<A>>>,
    /// Queue currently accepting submissions.
    record: usize,
    /// Queue drained by the open cycle.
    executable: usize,
    /// A cycle is open between `begin_frame` and `end_frame`/`abort_frame`.
    executing: bool,
    /// Total lists ever accepted; the next ticket value.
    submitted: u64,
    /// Total lists handed to the drain side, including aborted batches.
    retired: u64,
}

struct CoreShared<A: ServiceApi> {
    queues: Mutex<QueueState<A>>,
    progress: AtomicU64,
    view: A::View,
    service_id: u64,
}

/// Queue ring and progress state of one service instance.
///
/// The service owns the core and drives it from its drain thread; producers
/// only ever touch it through [`ServiceProxy`] clones.
pub struct ServiceCore<A: ServiceApi> {
    shared: Arc<CoreShared<A>>,
}

impl<A: ServiceApi> ServiceCore<A> {
    /// Creates a core with an empty queue ring and progress zero.
    ///
    /// The view instance is stored once and cloned out to every
    /// [`ServiceProxy::create_view`] call.
    ///
    /// # Panics
    ///
    /// Panics if the configuration asks for fewer than two queue slots.
    pub fn new(config: &ServiceConfig, view: A::View) -> Self {
        assert!(
            config.command_queue_slots >= 2,
            "command queue ring needs at least two slots, got {}",
            config.command_queue_slots
        );
        let service_id = NEXT_SERVICE_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "service core {} created with {} queue slots",
            service_id,
            config.command_queue_slots
        );
        let mut queues = Vec::with_capacity(config.command_queue_slots);
        queues.resize_with(config.command_queue_slots, Vec::new);
        Self {
            shared: Arc::new(CoreShared {
                queues: Mutex::new(QueueState {
                    queues,
                    record: 0,
                    executable: 0,
                    executing: false,
                    submitted: 0,
                    retired: 0,
                }),
                progress: AtomicU64::new(0),
                view,
                service_id,
            }),
        }
    }

    /// Returns a new producer handle for this core.
    pub fn proxy(&self) -> ServiceProxy<A> {
        ServiceProxy {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Last published progress value.
    pub fn progress(&self) -> ServiceProgress {
        self.shared.progress.load(Ordering::Acquire)
    }

    /// Opens a drain cycle: freezes the current record queue for execution
    /// and rotates submissions onto the next ring slot.
    ///
    /// # Panics
    ///
    /// Panics if a cycle is already open.
    pub fn begin_frame(&self) {
        let mut state = self.shared.queues.lock();
        assert!(
            !state.executing,
            "begin_frame while a cycle is already open"
        );
        state.executing = true;
        state.executable = state.record;
        state.record = (state.record + 1) % state.queues.len();
        debug_assert!(
            state.queues[state.record].is_empty(),
            "rotated onto a queue slot that still holds lists"
        );
        log::trace!(
            "service {} cycle open, draining queue {}",
            self.shared.service_id,
            state.executable
        );
    }

    /// Takes every list frozen by `begin_frame`, in submission order.
    ///
    /// The returned lists count as retired immediately: whether they execute
    /// or the cycle aborts, the queue has seen the last of them.
    ///
    /// # Panics
    ///
    /// Panics if no cycle is open.
    pub fn take_commands(&self) -> Vec<CommandList<A>> {
        let mut state = self.shared.queues.lock();
        assert!(state.executing, "take_commands without an open cycle");
        let executable = state.executable;
        let lists = mem::take(&mut state.queues[executable]);
        state.retired += lists.len() as u64;
        log::trace!(
            "service {} took {} command lists",
            self.shared.service_id,
            lists.len()
        );
        lists
    }

    /// Closes a successful cycle and publishes the retired-list count as the
    /// new progress value.
    ///
    /// # Panics
    ///
    /// Panics if no cycle is open.
    pub fn end_frame(&self) {
        let mut state = self.shared.queues.lock();
        assert!(state.executing, "end_frame without an open cycle");
        state.executing = false;
        self.shared.progress.store(state.retired, Ordering::Release);
        log::trace!(
            "service {} cycle complete, progress {}",
            self.shared.service_id,
            state.retired
        );
    }

    /// Closes a failed cycle without publishing progress.
    ///
    /// Lists still sitting in the executable queue are discarded; they and
    /// the already-taken batch stay counted as retired, so the published
    /// counter catches up on the next successful cycle rather than stalling
    /// forever. Waiters on tickets from the aborted batch therefore unblock
    /// late, never early.
    ///
    /// # Panics
    ///
    /// Panics if no cycle is open.
    pub fn abort_frame(&self) {
        let mut state = self.shared.queues.lock();
        assert!(state.executing, "abort_frame without an open cycle");
        let executable = state.executable;
        let leftovers = mem::take(&mut state.queues[executable]);
        state.retired += leftovers.len() as u64;
        state.executing = false;
        log::warn!(
            "service {} cycle aborted, {} untaken command lists discarded",
            self.shared.service_id,
            leftovers.len()
        );
    }
}

impl<A: ServiceApi> Drop for ServiceCore<A> {
    fn drop(&mut self) {
        let state = self.shared.queues.lock();
        let pending: usize = state.queues.iter().map(Vec::len).sum();
        if pending > 0 {
            log::warn!(
                "service {} dropped with {} unexecuted command lists",
                self.shared.service_id,
                pending
            );
        }
    }
}

/// Cloneable producer handle to a [`ServiceCore`].
///
/// Proxies are `Send` and cheap to clone; hand one to every thread that
/// needs to record work for the service.
pub struct ServiceProxy<A: ServiceApi> {
    shared: Arc<CoreShared<A>>,
}

impl<A: ServiceApi> ServiceProxy<A> {
    /// Creates an empty command list bound to this proxy's service.
    pub fn create_command_list(&self) -> CommandList<A> {
        CommandList::new(self.shared.service_id)
    }

    /// Queues a list for the next drain cycle and returns its ticket: the
    /// progress value that will be current once the list has executed.
    ///
    /// Lists submitted from one thread execute in submission order. Lists
    /// from different threads interleave in lock order, and the relative
    /// order within each thread is still preserved.
    pub fn submit_command_list(&self, list: CommandList<A>) -> ServiceProgress {
        debug_assert_eq!(
            list.service_id(),
            self.shared.service_id,
            "command list submitted to a different service instance"
        );
        let mut state = self.shared.queues.lock();
        state.submitted += 1;
        let ticket = state.submitted;
        let record = state.record;
        state.queues[record].push(list);
        log::trace!(
            "service {} accepted command list, ticket {}",
            self.shared.service_id,
            ticket
        );
        ticket
    }

    /// Last published progress value. Lock-free; safe to poll from any
    /// thread at any time.
    pub fn progress(&self) -> ServiceProgress {
        self.shared.progress.load(Ordering::Acquire)
    }

    /// Returns whether the ticketed list has executed.
    pub fn is_reached(&self, ticket: ServiceProgress) -> bool {
        self.progress() >= ticket
    }

    /// Polls until the ticketed list has executed or the timeout elapses.
    /// Returns `false` on timeout.
    pub fn wait_for(&self, ticket: ServiceProgress, timeout: Duration) -> bool {
        let started = Instant::now();
        while !self.is_reached(ticket) {
            if started.elapsed() >= timeout {
                return false;
            }
            thread::yield_now();
        }
        true
    }

    /// Clones the service's read-only view.
    pub fn create_view(&self) -> A::View {
        self.shared.view.clone()
    }
}

impl<A: ServiceApi> Clone for ServiceProxy<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    struct Trace {
        seen: Vec<u64>,
    }

    #[derive(Error, Debug)]
    #[error("trace failure")]
    struct TraceError;

    impl ServiceApi for Trace {
        type Error = TraceError;
        type View = ();
    }

    fn core() -> ServiceCore<Trace> {
        ServiceCore::new(&ServiceConfig::default(), ())
    }

    /// Runs one full successful cycle, executing every drained list.
    fn drain(core: &ServiceCore<Trace>, api: &mut Trace) {
        core.begin_frame();
        for list in core.take_commands() {
            list.execute(api).unwrap();
        }
        core.end_frame();
    }

    #[test]
    fn test_lists_execute_in_submission_order() {
        let core = core();
        let proxy = core.proxy();
        let mut api = Trace { seen: Vec::new() };

        for base in [10u64, 20, 30] {
            let mut list = proxy.create_command_list();
            list.push(move |api: &mut Trace| {
                api.seen.push(base);
                Ok(())
            });
            list.push(move |api: &mut Trace| {
                api.seen.push(base + 1);
                Ok(())
            });
            proxy.submit_command_list(list);
        }
        drain(&core, &mut api);

        assert_eq!(api.seen, vec![10, 11, 20, 21, 30, 31]);
    }

    #[test]
    fn test_tickets_count_submitted_lists() {
        let core = core();
        let proxy = core.proxy();
        let mut api = Trace { seen: Vec::new() };

        let first = proxy.submit_command_list(proxy.create_command_list());
        let second = proxy.submit_command_list(proxy.create_command_list());
        assert!(first < second);
        assert_eq!(proxy.progress(), 0);

        drain(&core, &mut api);

        assert_eq!(proxy.progress(), second);
        assert!(proxy.is_reached(first));
        assert!(proxy.is_reached(second));
    }

    #[test]
    fn test_mid_cycle_submission_lands_in_next_cycle() {
        let core = core();
        let proxy = core.proxy();
        let mut api = Trace { seen: Vec::new() };

        core.begin_frame();
        let ticket = {
            let mut list = proxy.create_command_list();
            list.push(|api: &mut Trace| {
                api.seen.push(42);
                Ok(())
            });
            proxy.submit_command_list(list)
        };
        assert!(core.take_commands().is_empty());
        core.end_frame();
        assert!(!proxy.is_reached(ticket), "list must not retire early");
        assert!(api.seen.is_empty());

        drain(&core, &mut api);
        assert!(proxy.is_reached(ticket));
        assert_eq!(api.seen, vec![42]);
    }

    #[test]
    fn test_abort_withholds_progress_until_next_cycle() {
        let core = core();
        let proxy = core.proxy();
        let mut api = Trace { seen: Vec::new() };

        let mut list = proxy.create_command_list();
        list.push(|_: &mut Trace| Err(TraceError));
        let failed = proxy.submit_command_list(list);

        core.begin_frame();
        for list in core.take_commands() {
            if list.execute(&mut api).is_err() {
                break;
            }
        }
        core.abort_frame();
        assert_eq!(proxy.progress(), 0, "aborted cycles publish nothing");

        let after = proxy.submit_command_list(proxy.create_command_list());
        drain(&core, &mut api);
        assert_eq!(proxy.progress(), after);
        assert!(
            proxy.is_reached(failed),
            "the discarded batch is retired by the next successful cycle"
        );
    }

    #[test]
    fn test_abort_discards_untaken_lists() {
        let core = core();
        let proxy = core.proxy();
        let mut api = Trace { seen: Vec::new() };

        let mut list = proxy.create_command_list();
        list.push(|api: &mut Trace| {
            api.seen.push(1);
            Ok(())
        });
        proxy.submit_command_list(list);

        core.begin_frame();
        core.abort_frame();

        drain(&core, &mut api);
        assert!(api.seen.is_empty(), "discarded lists never execute");
    }

    #[test]
    #[should_panic(expected = "cycle is already open")]
    fn test_begin_frame_twice_panics() {
        let core = core();
        core.begin_frame();
        core.begin_frame();
    }

    #[test]
    #[should_panic(expected = "without an open cycle")]
    fn test_end_frame_without_begin_panics() {
        let core = core();
        core.end_frame();
    }

    #[test]
    #[should_panic(expected = "at least two slots")]
    fn test_single_slot_ring_is_rejected() {
        let config = ServiceConfig {
            command_queue_slots: 1,
        };
        let _ = ServiceCore::<Trace>::new(&config, ());
    }

    #[test]
    #[should_panic(expected = "different service instance")]
    fn test_cross_service_submission_is_rejected() {
        let first = core();
        let second = core();
        let list = first.proxy().create_command_list();
        second.proxy().submit_command_list(list);
    }

    #[test]
    fn test_many_producers_keep_per_thread_order() {
        let core = core();
        let mut api = Trace { seen: Vec::new() };
        const THREADS: u64 = 4;
        const LISTS: u64 = 25;

        let handles: Vec<_> = (0..THREADS)
            .map(|thread_id| {
                let proxy = core.proxy();
                std::thread::spawn(move || {
                    for seq in 0..LISTS {
                        let mut list = proxy.create_command_list();
                        list.push(move |api: &mut Trace| {
                            api.seen.push(thread_id * 1000 + seq);
                            Ok(())
                        });
                        proxy.submit_command_list(list);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        drain(&core, &mut api);

        assert_eq!(api.seen.len(), (THREADS * LISTS) as usize);
        for thread_id in 0..THREADS {
            let per_thread: Vec<u64> = api
                .seen
                .iter()
                .copied()
                .filter(|value| value / 1000 == thread_id)
                .collect();
            let expected: Vec<u64> =
                (0..LISTS).map(|seq| thread_id * 1000 + seq).collect();
            assert_eq!(per_thread, expected);
        }
    }

    #[test]
    fn test_wait_for_times_out_without_a_drain() {
        let core = core();
        let proxy = core.proxy();
        let ticket = proxy.submit_command_list(proxy.create_command_list());
        assert!(!proxy.wait_for(ticket, Duration::from_millis(10)));
    }

    #[test]
    fn test_wait_for_crosses_threads() {
        let core = core();
        let proxy = core.proxy();
        let ticket = proxy.submit_command_list(proxy.create_command_list());

        let waiter = {
            let proxy = proxy.clone();
            std::thread::spawn(move || proxy.wait_for(ticket, Duration::from_secs(5)))
        };

        let mut api = Trace { seen: Vec::new() };
        drain(&core, &mut api);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_view_clones_come_from_the_stored_instance() {
        #[derive(Clone)]
        struct Tagged(u32);
        struct TaggedApi;
        impl ServiceApi for TaggedApi {
            type Error = TraceError;
            type View = Tagged;
        }

        let core = ServiceCore::<TaggedApi>::new(&ServiceConfig::default(), Tagged(7));
        assert_eq!(core.proxy().create_view().0, 7);
    }

    #[test]
    fn test_three_slot_ring_rotates_cleanly() {
        let config = ServiceConfig {
            command_queue_slots: 3,
        };
        let core = ServiceCore::<Trace>::new(&config, ());
        let proxy = core.proxy();
        let mut api = Trace { seen: Vec::new() };

        for round in 0..6u64 {
            let mut list = proxy.create_command_list();
            list.push(move |api: &mut Trace| {
                api.seen.push(round);
                Ok(())
            });
            let ticket = proxy.submit_command_list(list);
            drain(&core, &mut api);
            assert_eq!(proxy.progress(), ticket);
        }
        assert_eq!(api.seen, vec![0, 1, 2, 3, 4, 5]);
    }
}
