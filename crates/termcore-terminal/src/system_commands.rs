//! Process and resource commands: ps, kill, top, df, free.

use termcore_platform::SystemService;
use termcore_types::error::{Result, TermError};

use crate::registry::{Arity, Command, CommandOutput, CommandRegistry, Environment};

/// Register the system commands.
pub fn register_system_commands(reg: &mut CommandRegistry) -> Result<()> {
    reg.register(Box::new(PsCmd))?;
    reg.register(Box::new(KillCmd))?;
    reg.register(Box::new(TopCmd))?;
    reg.register(Box::new(DfCmd))?;
    reg.register(Box::new(FreeCmd))?;
    Ok(())
}

const PS_LIMIT: usize = 20;
const TOP_LIMIT: usize = 10;

fn system<'a>(env: &Environment<'a>, cmd: &str) -> Result<&'a dyn SystemService> {
    env.system
        .ok_or_else(|| TermError::Command(format!("{cmd}: system information unavailable")))
}

/// Human-readable byte count (`512B`, `1.5K`, `20.0G`).
fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["K", "M", "G", "T", "P"];
    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1}{}", UNITS[unit])
}

fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;
    if days > 0 {
        format!("{days}d {hours:02}:{mins:02}")
    } else {
        format!("{hours:02}:{mins:02}")
    }
}

// ---------------------------------------------------------------------------
// ps / kill
// ---------------------------------------------------------------------------

struct PsCmd;
impl Command for PsCmd {
    fn name(&self) -> &str {
        "ps"
    }
    fn description(&self) -> &str {
        "List running processes"
    }
    fn usage(&self) -> &str {
        "ps"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let procs = system(env, "ps")?.processes()?;
        let rows = procs
            .iter()
            .take(PS_LIMIT)
            .map(|p| {
                vec![
                    p.pid.to_string(),
                    p.state.to_string(),
                    p.rss_kb.to_string(),
                    format!("{:.1}", p.cpu_secs),
                    p.name.clone(),
                ]
            })
            .collect();
        Ok(CommandOutput::Table {
            headers: ["PID", "S", "RSS(KiB)", "CPU(s)", "NAME"]
                .map(String::from)
                .to_vec(),
            rows,
        })
    }
}

struct KillCmd;
impl Command for KillCmd {
    fn name(&self) -> &str {
        "kill"
    }
    fn description(&self) -> &str {
        "Terminate a process"
    }
    fn usage(&self) -> &str {
        "kill <pid>"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let pid: u32 = args[0].parse().map_err(|_| {
            TermError::InvalidArgument(format!("kill: {}: invalid process id", args[0]))
        })?;
        system(env, "kill")?.terminate(pid)?;
        log::info!("Sent SIGTERM to process {pid}");
        Ok(CommandOutput::Text(format!("Process {pid} terminated")))
    }
}

// ---------------------------------------------------------------------------
// top
// ---------------------------------------------------------------------------

struct TopCmd;
impl Command for TopCmd {
    fn name(&self) -> &str {
        "top"
    }
    fn description(&self) -> &str {
        "Show load, memory and the largest processes"
    }
    fn usage(&self) -> &str {
        "top"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let sys = system(env, "top")?;
        let load = sys.load_average()?;
        let uptime = sys.uptime_secs()?;
        let mem = sys.memory_info()?;
        let mut procs = sys.processes()?;
        procs.sort_by(|a, b| b.rss_kb.cmp(&a.rss_kb).then(a.pid.cmp(&b.pid)));

        let mut out = vec![
            format!(
                "up {}, load average: {:.2}, {:.2}, {:.2}",
                format_uptime(uptime),
                load.one,
                load.five,
                load.fifteen
            ),
            format!(
                "Mem: {} total, {} used, {} available ({:.1}% in use)",
                human_bytes(mem.total_kb * 1024),
                human_bytes(mem.used_kb() * 1024),
                human_bytes(mem.available_kb * 1024),
                mem.used_percent()
            ),
            String::new(),
            format!("{:>7}  {:>10}  NAME", "PID", "RSS(KiB)"),
        ];
        out.extend(
            procs
                .iter()
                .take(TOP_LIMIT)
                .map(|p| format!("{:>7}  {:>10}  {}", p.pid, p.rss_kb, p.name)),
        );
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// df / free
// ---------------------------------------------------------------------------

struct DfCmd;
impl Command for DfCmd {
    fn name(&self) -> &str {
        "df"
    }
    fn description(&self) -> &str {
        "Show disk usage of the session's file system"
    }
    fn usage(&self) -> &str {
        "df"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let headers = ["Filesystem", "Size", "Used", "Avail", "Use%"]
            .map(String::from)
            .to_vec();
        let label = env.vfs.label();
        let row = match env.vfs.host_root() {
            Some(root) => {
                let usage = system(env, "df")?.disk_usage(root)?;
                vec![
                    label,
                    human_bytes(usage.total_bytes),
                    human_bytes(usage.used_bytes()),
                    human_bytes(usage.available_bytes),
                    format!("{:.0}%", usage.used_percent()),
                ]
            },
            // In-memory file systems have no backing device.
            None => vec![label, "-".into(), "-".into(), "-".into(), "-".into()],
        };
        Ok(CommandOutput::Table {
            headers,
            rows: vec![row],
        })
    }
}

struct FreeCmd;
impl Command for FreeCmd {
    fn name(&self) -> &str {
        "free"
    }
    fn description(&self) -> &str {
        "Show memory and swap usage"
    }
    fn usage(&self) -> &str {
        "free"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let m = system(env, "free")?.memory_info()?;
        let headers = ["", "total", "used", "free", "shared", "buff/cache", "available"]
            .map(String::from)
            .to_vec();
        let rows = vec![
            vec![
                "Mem:".to_string(),
                m.total_kb.to_string(),
                m.used_kb().to_string(),
                m.free_kb.to_string(),
                m.shared_kb.to_string(),
                m.buff_cache_kb.to_string(),
                m.available_kb.to_string(),
            ],
            vec![
                "Swap:".to_string(),
                m.swap_total_kb.to_string(),
                m.swap_used_kb().to_string(),
                m.swap_free_kb.to_string(),
            ],
        ];
        Ok(CommandOutput::Table { headers, rows })
    }
}
