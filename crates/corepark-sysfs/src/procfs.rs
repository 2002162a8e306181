//! Parsers for `/proc/stat` and `/proc/loadavg`.

use corepark_core::{CoreId, CoreTimes, PlatformError, PlatformResult};

/// Busy counters of `cpu<core>` from the contents of `/proc/stat`.
///
/// User time includes `nice`; system time includes `irq` and `softirq`.
pub fn parse_core_times(stat: &str, core: CoreId) -> PlatformResult<CoreTimes> {
    let label = format!("cpu{core}");

    let line = stat
        .lines()
        .find(|l| l.split_whitespace().next() == Some(label.as_str()))
        .ok_or(PlatformError::UnknownCore(core))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| PlatformError::Parse(format!("{label}: {e}")))?;

    // user nice system idle iowait irq softirq ...
    if fields.len() < 3 {
        return Err(PlatformError::Parse(format!("{label}: too few fields")));
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or(0);

    Ok(CoreTimes {
        user: field(0) + field(1),
        system: field(2) + field(5) + field(6),
    })
}

/// Currently runnable tasks from the contents of `/proc/loadavg`
/// (`0.20 0.18 0.12 3/80 11206`).
pub fn parse_running_tasks(loadavg: &str) -> PlatformResult<u32> {
    loadavg
        .split_whitespace()
        .nth(3)
        .and_then(|f| f.split_once('/'))
        .and_then(|(running, _)| running.parse::<u32>().ok())
        .ok_or_else(|| PlatformError::Parse(format!("unexpected loadavg '{}'", loadavg.trim())))
}
