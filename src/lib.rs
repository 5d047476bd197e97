// Latency of munmap() on a THP backed anonymous mapping, released concurrently
// by several forked processes sharing it copy-on-write
//
// cat /sys/kernel/mm/transparent_hugepage/enabled
// grep AnonHugePages /proc/meminfo

use std::time::Duration;

pub mod bench;
pub mod params;
pub mod region;
pub mod thp;
pub mod workers;

pub use bench::Benchmark;
pub use params::RunParams;

/// Milliseconds with 3 decimals, microsecond resolution
pub fn format_ms(duration: Duration) -> String {
    format!("{:.3}", duration.as_micros() as f64 / 1000.0)
}
