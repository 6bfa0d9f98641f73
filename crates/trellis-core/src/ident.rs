//! Background identifier producer
//!
//! Identifiers are random 128-bit values rendered as 32 lowercase hex
//! characters. A dedicated thread keeps a bounded pool topped up so entity
//! creation never pays generation cost on its own call path.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Mutex, OnceLock};
use std::thread;

use uuid::Uuid;

/// Capacity of the process-wide pool
pub const DEFAULT_POOL_CAPACITY: usize = 100_000;

const PRODUCER_THREAD_NAME: &str = "identifier-producer";

/// Bounded pool of pre-generated identifiers fed by a background thread
///
/// The producer blocks while the pool is full; consumers block while it is
/// empty. Dropping the producer disconnects the channel and the fill thread
/// exits on its next send.
pub struct IdentifierProducer {
    pool: Mutex<Receiver<String>>,
    capacity: usize,
}

enum FillExit {
    Disconnected,
}

impl IdentifierProducer {
    /// Start a producer thread feeding a pool of `capacity` identifiers
    ///
    /// # Errors
    ///
    /// Returns the OS error if the producer thread cannot be spawned.
    pub fn spawn(capacity: usize) -> std::io::Result<Self> {
        let (tx, rx) = sync_channel(capacity);
        thread::Builder::new()
            .name(PRODUCER_THREAD_NAME.to_string())
            .spawn(move || run_producer(tx))?;

        Ok(Self {
            pool: Mutex::new(rx),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take the next identifier, blocking until one is available
    pub fn next_identifier(&self) -> String {
        let pool = match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match pool.recv() {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!(
                    component = "ident",
                    "identifier producer disconnected, generating inline"
                );
                generate()
            }
        }
    }
}

/// Fill loop for the lifetime of the pool; a panic restarts generation
fn run_producer(tx: SyncSender<String>) {
    loop {
        match panic::catch_unwind(AssertUnwindSafe(|| fill(&tx))) {
            Ok(FillExit::Disconnected) => return,
            Err(_) => {
                tracing::warn!(
                    component = "ident",
                    "identifier generation panicked, restarting fill loop"
                );
            }
        }
    }
}

fn fill(tx: &SyncSender<String>) -> FillExit {
    loop {
        if tx.send(generate()).is_err() {
            return FillExit::Disconnected;
        }
    }
}

fn generate() -> String {
    Uuid::new_v4().simple().to_string()
}

static GLOBAL_PRODUCER: OnceLock<Option<IdentifierProducer>> = OnceLock::new();

/// Draw an identifier from the process-wide pool
///
/// The pool is started on first use. If the producer thread cannot be
/// spawned, identifiers are generated on the calling thread instead.
pub fn next_identifier() -> String {
    let producer = GLOBAL_PRODUCER.get_or_init(|| {
        match IdentifierProducer::spawn(DEFAULT_POOL_CAPACITY) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(component = "ident", error = %e, "failed to start identifier producer");
                None
            }
        }
    });
    match producer {
        Some(p) => p.next_identifier(),
        None => generate(),
    }
}
