//! Top-process rows: memory share derived against the host's total memory.

use crate::types::Process;

pub const DEFAULT_TOP: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedProcess {
    pub pid: i64,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// `rss / total * 100`, or 0 while the total is unknown.
pub fn memory_percent(rss_bytes: u64, total_memory_bytes: Option<u64>) -> f64 {
    match total_memory_bytes {
        Some(total) if total > 0 => rss_bytes as f64 / total as f64 * 100.0,
        _ => 0.0,
    }
}

/// First `limit` processes in the order the backend sent them. No re-sorting:
/// the backend already ranks by CPU.
pub fn rank_processes(
    processes: &[Process],
    total_memory_bytes: Option<u64>,
    limit: usize,
) -> Vec<RankedProcess> {
    processes
        .iter()
        .take(limit)
        .map(|p| RankedProcess {
            pid: p.pid,
            name: match display_name(&p.name) {
                n if n.is_empty() => format!("[{}]", p.pid),
                n => n,
            },
            cpu_percent: p.cpu_percent,
            memory_percent: memory_percent(p.memory_rss_bytes, total_memory_bytes),
        })
        .collect()
}

/// Drops parenthesised qualifiers, e.g. "Chrome Helper (Renderer)" -> "Chrome Helper".
pub fn display_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    let cleaned = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        raw.trim().to_string()
    } else {
        cleaned
    }
}
