// Transparent huge pages configuration
// See https://www.kernel.org/doc/html/latest/admin-guide/mm/transhuge.html
//
// cat /sys/kernel/mm/transparent_hugepage/enabled
// always [madvise] never

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context};
use log::debug;

pub const THP_SYSFS_DIR: &str = "/sys/kernel/mm/transparent_hugepage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThpMode {
    Always,
    Madvise,
    Never,
}

impl FromStr for ThpMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "madvise" => Ok(Self::Madvise),
            "never" => Ok(Self::Never),
            x => bail!("Unknown THP mode {x:?}"),
        }
    }
}

impl Display for ThpMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Always => "always",
            Self::Madvise => "madvise",
            Self::Never => "never",
        };
        write!(f, "{s}")
    }
}

/// Return the token between brackets: "always [madvise] never" -> "madvise"
pub fn active_token(line: &str) -> Option<&str> {
    line.split_whitespace()
        .find_map(|token| token.strip_prefix('[')?.strip_suffix(']'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThpStatus {
    /// Raw content of `enabled`
    pub enabled_raw: String,
    pub mode: ThpMode,
    /// Active token of `defrag`, not present on all kernels
    pub defrag: Option<String>,
}

/// Reads the THP sysfs directory
#[derive(Debug, Clone)]
pub struct ThpProbe {
    root: PathBuf,
}

impl Default for ThpProbe {
    fn default() -> Self {
        Self::new(THP_SYSFS_DIR)
    }
}

impl ThpProbe {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn probe(&self) -> anyhow::Result<ThpStatus> {
        let path = self.root.join("enabled");
        let enabled_raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Can't read {path:?}"))?
            .trim()
            .to_string();

        let mode = active_token(&enabled_raw)
            .with_context(|| format!("No active mode in {enabled_raw:?}"))?
            .parse::<ThpMode>()?;

        let defrag = match std::fs::read_to_string(self.root.join("defrag")) {
            Ok(content) => active_token(&content).map(str::to_string),
            Err(e) => {
                debug!("Can't read THP defrag policy: {e}");
                None
            }
        };

        Ok(ThpStatus {
            enabled_raw,
            mode,
            defrag,
        })
    }
}

/// System wide anonymous memory backed by huge pages, in bytes
pub fn anon_huge_pages() -> Option<u64> {
    match procfs::Meminfo::new() {
        Ok(meminfo) => meminfo.anon_hugepages,
        Err(e) => {
            debug!("Can't read /proc/meminfo: {e}");
            None
        }
    }
}
