//! Run-loop drivers for a scheduler.
//!
//! The scheduler deliberately leaves the composition of `schedule()` and
//! thread-context visits to the embedding run loop. Two compositions live
//! here: the cooperative serial driver (single scheduling thread, stream
//! execution inlined) and the threaded driver (one OS thread per lane).
//! Both run the identical scheduler logic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, warn};

use streamvm_core::{Result, Scheduler, VmError};

/// Consecutive no-progress scheduler iterations tolerated before the
/// threaded driver checks for a genuine stall.
const STALL_SPINS: u32 = 1024;

/// Drive the scheduler to completion on the calling thread.
///
/// Alternates a scheduling pass with a full drain of every thread context
/// until the scheduler is empty. Returns the number of scheduling passes.
/// Fails with [`VmError::Stalled`] when a pass promotes nothing and
/// executes nothing while instructions remain admitted, which means some
/// input symbol can never resolve.
pub fn run_to_completion(scheduler: &Scheduler) -> Result<usize> {
    let mut passes = 0;
    while !scheduler.is_empty() {
        let promoted = scheduler.schedule();
        let mut worked = false;
        for ctx in scheduler.thread_ctxs() {
            while ctx.try_receive_and_run()? {
                worked = true;
            }
        }
        passes += 1;
        if promoted == 0 && !worked {
            let inflight = scheduler.stats().in_flight;
            warn!("scheduler stalled after {passes} pass(es), {inflight} instruction(s) stuck");
            return Err(VmError::Stalled { inflight });
        }
    }
    debug!("drained in {passes} scheduling pass(es)");
    Ok(passes)
}

/// Drive the scheduler with one OS thread per thread context.
///
/// The calling thread runs the scheduling passes; each lane's thread
/// context spins on `try_receive_and_run`, yielding when its stream is
/// idle. Returns once the scheduler is empty. The first worker error
/// aborts the run and is returned after all workers have stopped.
pub fn run_threaded(scheduler: &Scheduler) -> Result<()> {
    let done = AtomicBool::new(false);
    let failure: Mutex<Option<VmError>> = Mutex::new(None);

    thread::scope(|scope| {
        for ctx in scheduler.thread_ctxs() {
            let done = &done;
            let failure = &failure;
            scope.spawn(move || loop {
                match ctx.try_receive_and_run() {
                    Ok(true) => {}
                    Ok(false) => {
                        if done.load(Ordering::Acquire) {
                            break;
                        }
                        thread::yield_now();
                    }
                    Err(err) => {
                        let mut slot = failure.lock();
                        if slot.is_none() {
                            *slot = Some(err);
                        }
                        done.store(true, Ordering::Release);
                        break;
                    }
                }
            });
        }

        let mut idle_spins: u32 = 0;
        while !scheduler.is_empty() && !done.load(Ordering::Acquire) {
            let promoted = scheduler.schedule();
            if promoted > 0 {
                idle_spins = 0;
            } else {
                idle_spins = idle_spins.saturating_add(1);
                if idle_spins > STALL_SPINS && is_stalled(scheduler) {
                    let inflight = scheduler.stats().in_flight;
                    warn!("scheduler stalled, {inflight} instruction(s) stuck");
                    let mut slot = failure.lock();
                    if slot.is_none() {
                        *slot = Some(VmError::Stalled { inflight });
                    }
                    break;
                }
            }
            thread::yield_now();
        }
        done.store(true, Ordering::Release);
    });

    match failure.into_inner() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// A run is stalled when instructions remain admitted but nothing is ready
/// or executing anywhere, so no completion can ever unblock them.
fn is_stalled(scheduler: &Scheduler) -> bool {
    if scheduler.is_empty() {
        return false;
    }
    scheduler.streams().iter().all(|stream| {
        let stats = stream.stats();
        stats.ready == 0 && stats.in_flight == 0
    })
}
