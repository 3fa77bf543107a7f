//! Inbound event channel: one reader worker feeding the scanner and the
//! dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::dispatcher::EventDispatcher;
use crate::error::{BridgeError, ChannelError};
use crate::event_parser::RecordScanner;
use crate::types::ChannelState;
use crate::BulkChannel;

const CHANNEL_NAME: &str = "receive";

/// Default read timeout.
///
/// The timeout exists so a stop request is noticed promptly when the device
/// is idle; it is not a deadline on the data itself. Configurable via
/// [`ReceiveChannel::with_read_timeout`].
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Inbound half of a connection.
///
/// The worker performs one blocking bulk read per iteration into a buffer
/// sized to the input endpoint's max packet size, runs the persistent-mode
/// scanner over whatever arrived, and publishes each decoded event
/// synchronously through the dispatcher, in decode order.
pub struct ReceiveChannel {
    shared: Arc<RecvShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    read_timeout: Duration,
}

struct RecvShared {
    channel: Arc<dyn BulkChannel>,
    dispatcher: Arc<EventDispatcher>,
    state: Mutex<ChannelState>,
    cancel: AtomicBool,
    fault: Mutex<Option<ChannelError>>,
}

impl ReceiveChannel {
    pub fn new(channel: Arc<dyn BulkChannel>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            shared: Arc::new(RecvShared {
                channel,
                dispatcher,
                state: Mutex::new(ChannelState::Stopped),
                cancel: AtomicBool::new(false),
                fault: Mutex::new(None),
            }),
            worker: Mutex::new(None),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the per-read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Launch the reader worker. Fails fast if already running.
    pub fn start(&self) -> Result<(), BridgeError> {
        let mut state = self.shared.state.lock();
        if *state == ChannelState::Running {
            return Err(BridgeError::lifecycle(CHANNEL_NAME, ChannelState::Running));
        }

        self.shared.cancel.store(false, Ordering::SeqCst);
        *self.shared.fault.lock() = None;
        *state = ChannelState::Running;

        let shared = Arc::clone(&self.shared);
        let timeout = self.read_timeout;
        let handle = std::thread::Builder::new()
            .name("launchpad-recv".into())
            .spawn(move || run_receive_loop(shared, timeout))
            .expect("failed to spawn receive worker thread");
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Stop the worker cooperatively. Fails fast if not running.
    ///
    /// Partially-scanned trailing bytes from the last read are abandoned;
    /// at most one in-flight read completes after this returns.
    pub fn stop(&self) -> Result<(), BridgeError> {
        let mut state = self.shared.state.lock();
        if *state == ChannelState::Stopped {
            return Err(BridgeError::lifecycle(CHANNEL_NAME, ChannelState::Stopped));
        }
        *state = ChannelState::Stopped;
        drop(state);

        self.shared.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        Ok(())
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

fn run_receive_loop(shared: Arc<RecvShared>, timeout: Duration) {
    debug!("receive worker started");

    let mut buf = vec![0u8; shared.channel.max_packet_size()];
    let mut scanner = RecordScanner::new();

    while !shared.cancel.load(Ordering::Relaxed) {
        match shared.channel.read(&mut buf, timeout) {
            // Timeout: loop around to check the cancel flag.
            Ok(0) => continue,
            Ok(n) => {
                for event in scanner.scan(&buf[..n]) {
                    shared.dispatcher.publish(&event);
                }
            }
            Err(e) => {
                warn!("receive worker stopping on read failure: {e}");
                *shared.fault.lock() = Some(e);
                *shared.state.lock() = ChannelState::Stopped;
                shared.cancel.store(true, Ordering::SeqCst);
                return;
            }
        }
    }

    debug!("receive worker exiting");
}
