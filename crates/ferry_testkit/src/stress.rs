//! Stress helpers for concurrent send/pop.

use ferry_engine::{AssumeExists, DeltaBatch, EntityRef, SyncSession};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Configuration for concurrent send/pop runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of sender threads.
    pub threads: usize,
    /// How many times each thread sends the whole entity list.
    pub rounds: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            rounds: 50,
        }
    }
}

/// Sends `entities` from several threads while one thread keeps popping.
///
/// Returns every batch popped, including a final pop after all senders
/// finished, in pop order.
pub fn concurrent_senders(
    session: Arc<SyncSession>,
    entities: Vec<EntityRef>,
    config: &StressConfig,
) -> Vec<DeltaBatch> {
    let entities = Arc::new(entities);
    let done = Arc::new(AtomicBool::new(false));

    let popper = {
        let session = Arc::clone(&session);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut batches = Vec::new();
            while !done.load(Ordering::SeqCst) {
                batches.push(session.pop_batch());
                thread::yield_now();
            }
            batches
        })
    };

    let senders: Vec<_> = (0..config.threads)
        .map(|_| {
            let session = Arc::clone(&session);
            let entities = Arc::clone(&entities);
            let rounds = config.rounds;
            thread::spawn(move || {
                for _ in 0..rounds {
                    for entity in entities.iter() {
                        session
                            .send(&AssumeExists, entity.as_ref())
                            .expect("send failed during stress run");
                    }
                }
            })
        })
        .collect();

    for sender in senders {
        sender.join().expect("sender thread panicked");
    }
    done.store(true, Ordering::SeqCst);

    let mut batches = popper.join().expect("popper thread panicked");
    batches.push(session.pop_batch());
    batches
}
