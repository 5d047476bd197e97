// Measure munmap() latency of a THP backed anonymous mapping from N forked children
// Usage:
//   unmap-bench <MEMORY_SIZE_MB> <REPEAT_TIMES> <CHILD_PROCESSES>
//
//   unmap-bench 1024 3 8
//
// Every round maps and fills a fresh region, forks the children, each child
// unmaps its copy of the region and prints how long munmap() took. The parent
// prints the time from the first fork to the last child exit.
//
// RUST_LOG=debug shows AnonHugePages after the fill

use clap::Parser;
use unmap_bench::{workers::ForkWorkers, Benchmark, RunParams};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Size of the mapping in MiB
    #[arg(allow_negative_numbers = true)]
    memory_size_mb: i64,

    /// Number of rounds
    #[arg(allow_negative_numbers = true)]
    repeat_times: i64,

    /// Children forked per round
    #[arg(allow_negative_numbers = true)]
    child_processes: i64,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let params = RunParams::new(cli.memory_size_mb, cli.repeat_times, cli.child_processes)?;

    let mut bench = Benchmark::new(params, ForkWorkers, std::io::stdout());
    bench.run()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
