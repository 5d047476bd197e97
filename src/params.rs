use anyhow::{bail, Context};

/// 1 MiB, the unit of the memory size argument
pub const MIB: usize = 1024 * 1024;

/// Validated benchmark parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    /// Size of the mapping in bytes
    pub memory_size_bytes: usize,
    /// Number of rounds
    pub repeat_count: usize,
    /// Workers forked per round
    pub child_count: usize,
}

impl RunParams {
    /// Build from the raw command line values. All of them must be > 0
    pub fn new(memory_size_mb: i64, repeat_count: i64, child_count: i64) -> anyhow::Result<Self> {
        if memory_size_mb <= 0 || repeat_count <= 0 || child_count <= 0 {
            bail!("All parameters must be positive integers");
        }

        let memory_size_bytes = usize::try_from(memory_size_mb)
            .ok()
            .and_then(|mb| mb.checked_mul(MIB))
            .with_context(|| format!("Memory size {memory_size_mb} MB does not fit in usize"))?;

        Ok(Self {
            memory_size_bytes,
            repeat_count: usize::try_from(repeat_count)?,
            child_count: usize::try_from(child_count)?,
        })
    }

    pub fn memory_size_mb(&self) -> usize {
        self.memory_size_bytes / MIB
    }
}
