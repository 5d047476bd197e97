// Worker processes: each one unmaps its inherited copy of the region and
// reports how long it took
//
// Lifecycle: spawned -> unmapping -> exit(0) | exit(1)

use std::{
    io::Write,
    time::{Duration, Instant},
};

use anyhow::Context;
use log::{debug, warn};
use nix::{
    sys::wait::waitpid,
    unistd::{fork, ForkResult, Pid},
};

use crate::{format_ms, region::Region};

pub trait Workers {
    type Handle;

    /// Start worker `number` (1-indexed). Worker output goes to `out`
    fn spawn(
        &mut self,
        number: usize,
        region: &Region,
        out: &mut dyn Write,
    ) -> anyhow::Result<Self::Handle>;

    /// Block until the worker has terminated. Its exit status is not inspected
    fn wait(&mut self, handle: Self::Handle);
}

/// Time `release` and print the worker's timing line
pub fn timed_release<F>(number: usize, out: &mut dyn Write, release: F) -> anyhow::Result<Duration>
where
    F: FnOnce() -> nix::Result<()>,
{
    let chrono = Instant::now();
    release().context("munmap failed")?;
    let elapsed = chrono.elapsed();

    writeln!(out, "Child {number} unmap time: {} ms", format_ms(elapsed))?;
    out.flush()?;
    Ok(elapsed)
}

/// Real workers, one forked process each
#[derive(Debug, Default)]
pub struct ForkWorkers;

impl Workers for ForkWorkers {
    type Handle = Pid;

    fn spawn(
        &mut self,
        number: usize,
        region: &Region,
        out: &mut dyn Write,
    ) -> anyhow::Result<Pid> {
        match unsafe { fork() }.context("fork failed")? {
            ForkResult::Parent { child } => Ok(child),
            ForkResult::Child => {
                // the child leaves through exit(), the region is never dropped here
                let code = match timed_release(number, out, || unsafe { region.unmap_inherited() })
                {
                    Ok(_) => 0,
                    Err(e) => {
                        eprintln!("{e:#}");
                        1
                    }
                };
                std::process::exit(code);
            }
        }
    }

    fn wait(&mut self, pid: Pid) {
        match waitpid(pid, None) {
            Ok(status) => debug!("Worker {pid}: {status:?}"),
            Err(e) => warn!("waitpid {pid} failed: {e}"),
        }
    }
}
