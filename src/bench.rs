use std::{
    io::Write,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    format_ms,
    params::RunParams,
    region::{Region, FILL_PATTERN},
    thp::{self, ThpMode, ThpProbe},
    workers::Workers,
};

pub struct Benchmark<K: Workers, W: Write> {
    params: RunParams,
    probe: ThpProbe,
    workers: K,
    out: W,
}

impl<K: Workers, W: Write> Benchmark<K, W> {
    pub fn new(params: RunParams, workers: K, out: W) -> Self {
        Self {
            params,
            probe: ThpProbe::default(),
            workers,
            out,
        }
    }

    pub fn with_probe(mut self, probe: ThpProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Probe THP, then run all the rounds, one after the other
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.report_thp_status()?;

        for round in 1..=self.params.repeat_count {
            self.run_round(round)?;
        }
        Ok(())
    }

    /// Never fatal, except for write errors on the output
    fn report_thp_status(&mut self) -> anyhow::Result<()> {
        match self.probe.probe() {
            Ok(status) => {
                writeln!(self.out, "{}", status.enabled_raw)?;
                info!("THP mode: {}", status.mode);
                if let Some(defrag) = &status.defrag {
                    info!("THP defrag: {defrag}");
                }
                if status.mode == ThpMode::Never {
                    warn!("THP disabled, MADV_HUGEPAGE will have no effect");
                }
            }
            Err(e) => warn!("Failed to check transparent hugepage status: {e:#}"),
        }
        Ok(())
    }

    /// Returns the time from the first fork to the last worker exit
    pub fn run_round(&mut self, round: usize) -> anyhow::Result<Duration> {
        writeln!(self.out, "\n=== Round {round} ===")?;

        let mut region = Region::map_anonymous(self.params.memory_size_bytes)?;
        region.advise_huge_pages()?;

        writeln!(
            self.out,
            "Writing to memory (size={} MB)...",
            self.params.memory_size_mb()
        )?;
        let chrono = Instant::now();
        region.fill(FILL_PATTERN);
        debug!("Fill took {:?}", chrono.elapsed());
        if let Some(anon_huge) = thp::anon_huge_pages() {
            debug!(
                "AnonHugePages: {} (region needs {} huge pages)",
                humansize::format_size(anon_huge, humansize::BINARY),
                region.huge_pages()
            );
        }

        // anything still buffered would be printed again by every child
        self.out.flush()?;

        let fork_start = Instant::now();

        let mut handles = Vec::with_capacity(self.params.child_count);
        for index in 0..self.params.child_count {
            let handle = self.workers.spawn(index + 1, &region, &mut self.out)?;
            handles.push(handle);
        }

        // creation order, each wait blocks until that worker is gone
        for handle in handles {
            self.workers.wait(handle);
        }

        let total = fork_start.elapsed();
        writeln!(
            self.out,
            "Total time (fork to last child exit): {} ms",
            format_ms(total)
        )?;
        self.out.flush()?;

        // parent's own copy is released here, outside of the measure
        drop(region);

        Ok(total)
    }
}
