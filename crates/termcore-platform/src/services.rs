//! Platform service traits and desktop implementation.

use std::path::Path;

use termcore_types::error::{Result, TermError};

// ---------------------------------------------------------------------------
// Process service
// ---------------------------------------------------------------------------

/// Snapshot of one running process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Executable name (truncated by the kernel to 15 bytes on Linux).
    pub name: String,
    /// Single-letter scheduler state (`R`, `S`, `Z`, ...).
    pub state: char,
    /// Resident set size in KiB.
    pub rss_kb: u64,
    /// User + system CPU time consumed so far, in seconds.
    pub cpu_secs: f64,
}

/// Abstraction over process listing and termination.
pub trait ProcessService {
    /// All processes visible to this user, ordered by pid.
    fn processes(&self) -> Result<Vec<ProcessInfo>>;

    /// Ask a process to terminate (SIGTERM on unix).
    fn terminate(&self, pid: u32) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Memory service
// ---------------------------------------------------------------------------

/// Memory and swap totals, in KiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: u64,
    pub buff_cache_kb: u64,
    pub shared_kb: u64,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
}

impl MemoryInfo {
    /// Memory in use, excluding buffers and page cache.
    pub fn used_kb(&self) -> u64 {
        self.total_kb
            .saturating_sub(self.free_kb)
            .saturating_sub(self.buff_cache_kb)
    }

    pub fn swap_used_kb(&self) -> u64 {
        self.swap_total_kb.saturating_sub(self.swap_free_kb)
    }

    /// Share of memory not available to new processes, 0-100.
    pub fn used_percent(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        let unavailable = self.total_kb.saturating_sub(self.available_kb);
        unavailable as f64 * 100.0 / self.total_kb as f64
    }
}

/// Abstraction over memory statistics.
pub trait MemoryService {
    fn memory_info(&self) -> Result<MemoryInfo>;
}

// ---------------------------------------------------------------------------
// Disk service
// ---------------------------------------------------------------------------

/// Capacity of the file system holding a path, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub free_bytes: u64,
    /// Free space usable by unprivileged users.
    pub available_bytes: u64,
}

impl DiskUsage {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }

    pub fn used_percent(&self) -> f64 {
        let used = self.used_bytes();
        let denom = used + self.available_bytes;
        if denom == 0 {
            return 0.0;
        }
        used as f64 * 100.0 / denom as f64
    }
}

/// Abstraction over file system capacity queries.
pub trait DiskService {
    fn disk_usage(&self, path: &Path) -> Result<DiskUsage>;
}

// ---------------------------------------------------------------------------
// Load service
// ---------------------------------------------------------------------------

/// 1, 5 and 15 minute load averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Abstraction over scheduler load and uptime.
pub trait LoadService {
    fn load_average(&self) -> Result<LoadAverage>;

    /// Seconds since boot.
    fn uptime_secs(&self) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// Unified service trait
// ---------------------------------------------------------------------------

/// Aggregate trait giving commands access to every system service.
///
/// Shared read-only between sessions, hence `Send + Sync`.
pub trait SystemService:
    ProcessService + MemoryService + DiskService + LoadService + Send + Sync
{
}

impl<T> SystemService for T where
    T: ProcessService + MemoryService + DiskService + LoadService + Send + Sync
{
}

// ---------------------------------------------------------------------------
// Desktop implementation
// ---------------------------------------------------------------------------

/// Services for the host machine, read from `/proc` on Linux.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopPlatform;

impl DesktopPlatform {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported<T>(what: &str) -> Result<T> {
    Err(TermError::Command(format!(
        "{what}: not supported on this platform"
    )))
}

impl ProcessService for DesktopPlatform {
    #[cfg(target_os = "linux")]
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        crate::procfs::read_processes(Path::new("/proc"))
    }

    #[cfg(not(target_os = "linux"))]
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        unsupported("process listing")
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        if pid == 0 || pid > i32::MAX as u32 {
            return Err(TermError::InvalidArgument(format!(
                "kill: invalid process ID: {pid}"
            )));
        }
        send_sigterm(pid)
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    log::info!("Sending SIGTERM to {pid}");
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(TermError::NotFound(format!("process {pid}"))),
        Err(Errno::EPERM) => Err(TermError::PermissionDenied(format!("process {pid}"))),
        Err(e) => Err(TermError::Command(format!("kill: {pid}: {e}"))),
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> Result<()> {
    Err(TermError::Command(
        "kill: not supported on this platform".to_string(),
    ))
}

impl MemoryService for DesktopPlatform {
    #[cfg(target_os = "linux")]
    fn memory_info(&self) -> Result<MemoryInfo> {
        let text = std::fs::read_to_string("/proc/meminfo")
            .map_err(|e| TermError::from_io("/proc/meminfo", e))?;
        Ok(crate::procfs::parse_meminfo(&text))
    }

    #[cfg(not(target_os = "linux"))]
    fn memory_info(&self) -> Result<MemoryInfo> {
        unsupported("memory statistics")
    }
}

impl DiskService for DesktopPlatform {
    #[cfg(unix)]
    fn disk_usage(&self, path: &Path) -> Result<DiskUsage> {
        let st = nix::sys::statvfs::statvfs(path)
            .map_err(|e| TermError::from_io(&path.display().to_string(), e.into()))?;
        let frag = st.fragment_size() as u64;
        Ok(DiskUsage {
            total_bytes: st.blocks() as u64 * frag,
            free_bytes: st.blocks_free() as u64 * frag,
            available_bytes: st.blocks_available() as u64 * frag,
        })
    }

    #[cfg(not(unix))]
    fn disk_usage(&self, _path: &Path) -> Result<DiskUsage> {
        Err(TermError::Command(
            "disk usage: not supported on this platform".to_string(),
        ))
    }
}

impl LoadService for DesktopPlatform {
    #[cfg(target_os = "linux")]
    fn load_average(&self) -> Result<LoadAverage> {
        let text = std::fs::read_to_string("/proc/loadavg")
            .map_err(|e| TermError::from_io("/proc/loadavg", e))?;
        crate::procfs::parse_loadavg(&text)
            .ok_or_else(|| TermError::Command("malformed /proc/loadavg".to_string()))
    }

    #[cfg(not(target_os = "linux"))]
    fn load_average(&self) -> Result<LoadAverage> {
        unsupported("load average")
    }

    #[cfg(target_os = "linux")]
    fn uptime_secs(&self) -> Result<u64> {
        let text = std::fs::read_to_string("/proc/uptime")
            .map_err(|e| TermError::from_io("/proc/uptime", e))?;
        crate::procfs::parse_uptime(&text)
            .ok_or_else(|| TermError::Command("malformed /proc/uptime".to_string()))
    }

    #[cfg(not(target_os = "linux"))]
    fn uptime_secs(&self) -> Result<u64> {
        unsupported("uptime")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_used_excludes_cache() {
        let m = MemoryInfo {
            total_kb: 1000,
            free_kb: 200,
            available_kb: 600,
            buff_cache_kb: 300,
            shared_kb: 0,
            swap_total_kb: 500,
            swap_free_kb: 400,
        };
        assert_eq!(m.used_kb(), 500);
        assert_eq!(m.swap_used_kb(), 100);
        assert!((m.used_percent() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn memory_percent_of_empty_is_zero() {
        assert_eq!(MemoryInfo::default().used_percent(), 0.0);
    }

    #[test]
    fn disk_usage_percent() {
        let d = DiskUsage {
            total_bytes: 100,
            free_bytes: 30,
            available_bytes: 30,
        };
        assert_eq!(d.used_bytes(), 70);
        assert!((d.used_percent() - 70.0).abs() < 1e-9);
        assert_eq!(DiskUsage::default().used_percent(), 0.0);
    }

    #[test]
    fn terminate_rejects_pid_zero() {
        let err = DesktopPlatform::new().terminate(0).unwrap_err();
        assert_eq!(err.kind(), termcore_types::ErrorKind::InvalidArgument);
    }

    #[cfg(unix)]
    #[test]
    fn disk_usage_of_root_is_nonzero() {
        let d = DesktopPlatform::new().disk_usage(Path::new("/")).unwrap();
        assert!(d.total_bytes > 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn own_process_is_listed() {
        let me = std::process::id();
        let procs = DesktopPlatform::new().processes().unwrap();
        assert!(procs.iter().any(|p| p.pid == me));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn memory_total_is_nonzero() {
        let m = DesktopPlatform::new().memory_info().unwrap();
        assert!(m.total_kb > 0);
    }

    fn assert_system_service<T: SystemService>(_: &T) {}

    #[test]
    fn desktop_platform_is_a_system_service() {
        assert_system_service(&DesktopPlatform::new());
    }
}
