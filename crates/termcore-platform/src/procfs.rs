//! Parsers for the Linux `/proc` text formats.
//!
//! Kept free of I/O (except [`read_processes`]) so they can be tested
//! against captured fixtures on any platform.

#![cfg_attr(not(target_os = "linux"), allow(dead_code))]

use std::path::Path;

use termcore_types::error::{Result, TermError};

use crate::services::{LoadAverage, MemoryInfo, ProcessInfo};

/// Clock ticks per second assumed for `/proc/<pid>/stat` times.
const CLOCK_TICKS: f64 = 100.0;

/// Parse `/proc/meminfo`. Unknown or missing keys stay zero.
pub(crate) fn parse_meminfo(text: &str) -> MemoryInfo {
    let mut info = MemoryInfo::default();
    let mut buffers = 0;
    let mut cached = 0;
    let mut reclaimable = 0;
    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        match key.trim() {
            "MemTotal" => info.total_kb = value,
            "MemFree" => info.free_kb = value,
            "MemAvailable" => info.available_kb = value,
            "Buffers" => buffers = value,
            "Cached" => cached = value,
            "SReclaimable" => reclaimable = value,
            "Shmem" => info.shared_kb = value,
            "SwapTotal" => info.swap_total_kb = value,
            "SwapFree" => info.swap_free_kb = value,
            _ => {},
        }
    }
    info.buff_cache_kb = buffers + cached + reclaimable;
    info
}

/// Parse the contents of `/proc/<pid>/stat`.
///
/// Returns `(pid, name, state, cpu ticks)`. The name is parenthesized and
/// may itself contain spaces or parentheses, so it is delimited by the
/// last `)` on the line.
pub(crate) fn parse_stat(text: &str) -> Option<(u32, String, char, u64)> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    if close < open {
        return None;
    }
    let pid = text[..open].trim().parse().ok()?;
    let name = text[open + 1..close].to_string();
    let fields: Vec<&str> = text[close + 1..].split_whitespace().collect();
    // fields[0] is the state; utime and stime are stat fields 14 and 15.
    let state = fields.first()?.chars().next()?;
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some((pid, name, state, utime + stime))
}

/// Extract `VmRSS` (KiB) from `/proc/<pid>/status`. Kernel threads have none.
pub(crate) fn parse_status_rss(text: &str) -> u64 {
    text.lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

pub(crate) fn parse_loadavg(text: &str) -> Option<LoadAverage> {
    let mut it = text.split_whitespace().map(|v| v.parse::<f64>().ok());
    Some(LoadAverage {
        one: it.next()??,
        five: it.next()??,
        fifteen: it.next()??,
    })
}

pub(crate) fn parse_uptime(text: &str) -> Option<u64> {
    let secs: f64 = text.split_whitespace().next()?.parse().ok()?;
    Some(secs as u64)
}

/// Walk a procfs mount and collect every numeric directory.
///
/// Processes that exit between the directory scan and the reads are
/// skipped silently.
pub(crate) fn read_processes(proc_root: &Path) -> Result<Vec<ProcessInfo>> {
    let dir = std::fs::read_dir(proc_root)
        .map_err(|e| TermError::from_io(&proc_root.display().to_string(), e))?;
    let mut out = Vec::new();
    for entry in dir.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let path = entry.path();
        let Ok(stat) = std::fs::read_to_string(path.join("stat")) else {
            continue;
        };
        let Some((pid, comm, state, ticks)) = parse_stat(&stat) else {
            log::debug!("Unparseable stat for {name}");
            continue;
        };
        let rss_kb = std::fs::read_to_string(path.join("status"))
            .map(|s| parse_status_rss(&s))
            .unwrap_or(0);
        out.push(ProcessInfo {
            pid,
            name: comm,
            state,
            rss_kb,
            cpu_secs: ticks as f64 / CLOCK_TICKS,
        });
    }
    out.sort_by_key(|p| p.pid);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:       16303428 kB
MemFree:         8201004 kB
MemAvailable:   12000000 kB
Buffers:          100000 kB
Cached:          2000000 kB
SwapCached:            0 kB
Shmem:             50000 kB
SReclaimable:     300000 kB
SwapTotal:       2097148 kB
SwapFree:        2000000 kB
";

    #[test]
    fn meminfo_fields() {
        let m = parse_meminfo(MEMINFO);
        assert_eq!(m.total_kb, 16303428);
        assert_eq!(m.free_kb, 8201004);
        assert_eq!(m.available_kb, 12000000);
        assert_eq!(m.buff_cache_kb, 2400000);
        assert_eq!(m.shared_kb, 50000);
        assert_eq!(m.swap_total_kb, 2097148);
        assert_eq!(m.swap_free_kb, 2000000);
    }

    #[test]
    fn meminfo_garbage_is_zeroed() {
        assert_eq!(parse_meminfo("nonsense\nMemTotal: lots\n"), MemoryInfo::default());
    }

    #[test]
    fn stat_with_spaces_in_name() {
        let line = "1234 (Web Content) S 1 1234 1234 0 -1 4194560 100 0 0 0 250 50 0 0 20 0 1 0 100 0 0";
        let (pid, name, state, ticks) = parse_stat(line).unwrap();
        assert_eq!(pid, 1234);
        assert_eq!(name, "Web Content");
        assert_eq!(state, 'S');
        assert_eq!(ticks, 300);
    }

    #[test]
    fn stat_with_paren_in_name() {
        let line = "7 (a) b) R 1 7 7 0 -1 0 0 0 0 0 10 5 0 0";
        let (_, name, state, ticks) = parse_stat(line).unwrap();
        assert_eq!(name, "a) b");
        assert_eq!(state, 'R');
        assert_eq!(ticks, 15);
    }

    #[test]
    fn stat_truncated_is_none() {
        assert!(parse_stat("1 (init) S 0").is_none());
        assert!(parse_stat("garbage").is_none());
    }

    #[test]
    fn status_rss() {
        let text = "Name:\tbash\nVmPeak:\t  9000 kB\nVmRSS:\t  4321 kB\n";
        assert_eq!(parse_status_rss(text), 4321);
        assert_eq!(parse_status_rss("Name:\tkthreadd\n"), 0);
    }

    #[test]
    fn loadavg_and_uptime() {
        let l = parse_loadavg("0.52 0.58 0.59 1/389 12345\n").unwrap();
        assert_eq!(l.one, 0.52);
        assert_eq!(l.fifteen, 0.59);
        assert!(parse_loadavg("0.1").is_none());
        assert_eq!(parse_uptime("3725.81 12000.00\n"), Some(3725));
        assert_eq!(parse_uptime(""), None);
    }

    #[test]
    fn read_processes_from_fake_proc() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("42");
        std::fs::create_dir(&p).unwrap();
        std::fs::write(
            p.join("stat"),
            "42 (worker) S 1 42 42 0 -1 0 0 0 0 0 100 100 0 0",
        )
        .unwrap();
        std::fs::write(p.join("status"), "VmRSS:\t 2048 kB\n").unwrap();
        std::fs::create_dir(dir.path().join("self")).unwrap();
        std::fs::create_dir(dir.path().join("7")).unwrap(); // exited, no stat

        let procs = read_processes(dir.path()).unwrap();
        assert_eq!(procs.len(), 1);
        assert_eq!(procs[0].pid, 42);
        assert_eq!(procs[0].name, "worker");
        assert_eq!(procs[0].rss_kb, 2048);
        assert!((procs[0].cpu_secs - 2.0).abs() < 1e-9);
    }
}
