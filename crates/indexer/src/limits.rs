const MAX_WORKERS: usize = 32;

/// Extraction workers when nothing is configured: half the cores, at least one.
pub(crate) fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus / 2).clamp(1, MAX_WORKERS)
}

pub(crate) fn parse_workers(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_WORKERS)
}

pub(crate) fn clamp_workers(value: usize) -> usize {
    value.clamp(1, MAX_WORKERS)
}
