//! Process memory sampling for the diagnostic endpoint.
//!
//! The sample is the resident set size from `/proc/self/status`, which counts
//! every mapped page in RAM (heap, stacks and code), not only allocator heap.

/// Current process resident set size in bytes, 0 when it cannot be read.
pub fn process_memory_bytes() -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .map(|status| parse_vm_rss(&status))
        .unwrap_or(0)
}

/// Extract `VmRSS` from the contents of `/proc/<pid>/status`.
fn parse_vm_rss(status: &str) -> u64 {
    for line in status.lines() {
        if line.starts_with("VmRSS:") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                if let Ok(kb) = parts[1].parse::<u64>() {
                    return kb * 1024;
                }
            }
        }
    }
    0
}
