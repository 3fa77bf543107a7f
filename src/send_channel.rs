//! Outbound command channel: unbounded FIFO queue plus one writer worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::error::{BridgeError, ChannelError};
use crate::types::{ChannelState, Command};
use crate::BulkChannel;

const CHANNEL_NAME: &str = "send";

/// Outbound half of a connection.
///
/// Commands are appended to an unbounded FIFO from any thread; a dedicated
/// worker drains the whole queue per iteration and writes each command as
/// one bulk transfer, in enqueue order. FIFO order holds across the channel
/// lifetime: commands enqueued during a drain surface in the next iteration,
/// never mid-drain.
pub struct SendChannel {
    shared: Arc<SendShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct SendShared {
    channel: Arc<dyn BulkChannel>,
    queue: Mutex<VecDeque<Command>>,
    queue_cv: Condvar,
    state: Mutex<ChannelState>,
    cancel: AtomicBool,
    fault: Mutex<Option<ChannelError>>,
}

impl SendChannel {
    pub fn new(channel: Arc<dyn BulkChannel>) -> Self {
        Self {
            shared: Arc::new(SendShared {
                channel,
                queue: Mutex::new(VecDeque::new()),
                queue_cv: Condvar::new(),
                state: Mutex::new(ChannelState::Stopped),
                cancel: AtomicBool::new(false),
                fault: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Launch the writer worker. Fails fast if already running.
    pub fn start(&self) -> Result<(), BridgeError> {
        let mut state = self.shared.state.lock();
        if *state == ChannelState::Running {
            return Err(BridgeError::lifecycle(CHANNEL_NAME, ChannelState::Running));
        }

        self.shared.cancel.store(false, Ordering::SeqCst);
        *self.shared.fault.lock() = None;
        *state = ChannelState::Running;

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("launchpad-send".into())
            .spawn(move || run_send_loop(shared))
            .expect("failed to spawn send worker thread");
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Stop the worker cooperatively. Fails fast if not running.
    ///
    /// Anything still queued is discarded, not flushed — stop latency stays
    /// bounded at the cost of dropped lights (see DESIGN.md). At most one
    /// in-flight write completes after this returns; the worker never
    /// starts a new one.
    pub fn stop(&self) -> Result<(), BridgeError> {
        let mut state = self.shared.state.lock();
        if *state == ChannelState::Stopped {
            return Err(BridgeError::lifecycle(CHANNEL_NAME, ChannelState::Stopped));
        }
        *state = ChannelState::Stopped;
        drop(state);

        self.shared.cancel.store(true, Ordering::SeqCst);
        {
            let mut queue = self.shared.queue.lock();
            let discarded = queue.len();
            queue.clear();
            if discarded > 0 {
                debug!("discarded {discarded} queued commands on stop");
            }
        }
        self.shared.queue_cv.notify_one();

        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Append a command to the FIFO. Non-blocking, legal in any state;
    /// commands enqueued while stopped are only sent if the channel is
    /// started later.
    pub fn enqueue(&self, command: Command) {
        self.shared.queue.lock().push_back(command);
        self.shared.queue_cv.notify_one();
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ChannelState::Running
    }

    /// The fault that stopped the worker, if it died on an I/O error.
    pub fn fault(&self) -> Option<ChannelError> {
        self.shared.fault.lock().clone()
    }
}

fn run_send_loop(shared: Arc<SendShared>) {
    debug!("send worker started");

    loop {
        // Atomically drain everything currently queued into one batch.
        let batch: Vec<Command> = {
            let mut queue = shared.queue.lock();
            while queue.is_empty() && !shared.cancel.load(Ordering::Relaxed) {
                shared.queue_cv.wait(&mut queue);
            }
            if shared.cancel.load(Ordering::Relaxed) {
                break;
            }
            queue.drain(..).collect()
        };

        for command in batch {
            // Cancellation is re-checked per write so stop() cuts a batch
            // short after at most the in-flight transfer.
            if shared.cancel.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = shared.channel.write(&command.to_bytes()) {
                warn!("send worker stopping on write failure: {e}");
                *shared.fault.lock() = Some(e);
                *shared.state.lock() = ChannelState::Stopped;
                shared.cancel.store(true, Ordering::SeqCst);
                return;
            }
        }
    }

    debug!("send worker exiting");
}
