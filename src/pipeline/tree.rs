//! Process tree utilities
//!
//! Liveness checks, `/proc` process table scans and signal delivery that
//! treats "no such process" as success.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::collections::{HashMap, HashSet};
use std::io;

/// Length the kernel truncates process names (`comm`) to.
const COMM_MAX_LEN: usize = 15;

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    /// Single-letter scheduler state from `/proc/<pid>/stat`.
    pub state: char,
}

impl ProcessEntry {
    /// Exited but not yet reaped (`Z`), or being torn down (`X`). Such an
    /// entry keeps its name in the table but runs no code.
    pub fn is_exited(&self) -> bool {
        matches!(self.state, 'Z' | 'X' | 'x')
    }
}

/// Check if a process with the given PID is alive
///
/// Sends the null signal. `EPERM` means the process exists but belongs to
/// someone else, so it counts as alive.
pub fn is_process_alive(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };

    match kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(Errno::ESRCH) => false,
        Err(_) => false,
    }
}

/// Deliver `signal` to `pid`; a vanished process is not an error.
pub fn signal_process(pid: u32, signal: Signal) -> nix::Result<()> {
    let Some(target) = to_pid(pid) else {
        return Ok(());
    };
    match kill(target, signal) {
        Err(Errno::ESRCH) => Ok(()),
        other => other,
    }
}

/// Deliver `signal` to the process group led by `pgid`.
pub fn signal_group(pgid: u32, signal: Signal) -> nix::Result<()> {
    let Some(target) = to_pid(pgid) else {
        return Ok(());
    };
    match killpg(target, signal) {
        Err(Errno::ESRCH) => Ok(()),
        other => other,
    }
}

fn to_pid(pid: u32) -> Option<Pid> {
    // PID 0 would address our own process group
    match i32::try_from(pid) {
        Ok(v) if v > 0 => Some(Pid::from_raw(v)),
        _ => None,
    }
}

/// Parse the contents of `/proc/<pid>/stat`.
///
/// The name field is wrapped in parentheses and may itself contain spaces
/// or parentheses, so it is delimited by the last `)`.
pub fn parse_stat(stat: &str) -> Option<ProcessEntry> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    if close < open {
        return None;
    }

    let pid = stat[..open].trim().parse().ok()?;
    let name = stat[open + 1..close].to_string();
    let mut rest = stat[close + 1..].split_whitespace();
    let state = rest.next()?.chars().next()?;
    let ppid = rest.next()?.parse().ok()?;

    Some(ProcessEntry {
        pid,
        ppid,
        name,
        state,
    })
}

/// Snapshot of every process visible in `/proc`.
///
/// Processes that exit while the table is being read are skipped.
#[cfg(target_os = "linux")]
pub fn read_process_table() -> io::Result<Vec<ProcessEntry>> {
    let mut table = Vec::new();

    for entry in std::fs::read_dir("/proc")?.flatten() {
        let file_name = entry.file_name();
        if !file_name.to_string_lossy().bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) {
            if let Some(process) = parse_stat(&stat) {
                table.push(process);
            }
        }
    }

    Ok(table)
}

#[cfg(not(target_os = "linux"))]
pub fn read_process_table() -> io::Result<Vec<ProcessEntry>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process table scan requires /proc",
    ))
}

/// All processes below `root` in `table`, breadth first. `root` itself is
/// not included.
pub fn descendants_of(table: &[ProcessEntry], root: u32) -> Vec<ProcessEntry> {
    let mut children: HashMap<u32, Vec<&ProcessEntry>> = HashMap::new();
    for process in table {
        if process.pid != process.ppid {
            children.entry(process.ppid).or_default().push(process);
        }
    }

    let mut seen = HashSet::from([root]);
    let mut queue = vec![root];
    let mut found = Vec::new();

    while let Some(parent) = queue.pop() {
        for child in children.get(&parent).into_iter().flatten() {
            if seen.insert(child.pid) {
                found.push((*child).clone());
                queue.push(child.pid);
            }
        }
    }

    found
}

/// PIDs of every live descendant of `root`; empty if `/proc` is unreadable.
pub fn descendant_pids(root: u32) -> Vec<u32> {
    match read_process_table() {
        Ok(table) => descendants_of(&table, root).into_iter().map(|p| p.pid).collect(),
        Err(_) => Vec::new(),
    }
}

/// Argument vector of `pid`, from `/proc/<pid>/cmdline`.
pub fn read_cmdline(pid: u32) -> Option<Vec<String>> {
    let raw = std::fs::read(format!("/proc/{pid}/cmdline")).ok()?;
    Some(
        raw.split(|b| *b == 0)
            .filter(|arg| !arg.is_empty())
            .map(|arg| String::from_utf8_lossy(arg).into_owned())
            .collect(),
    )
}

/// Whether `process` is an instance of `executable`.
///
/// Interpreted tools (a script run via `env python3`) show the interpreter
/// as their kernel name, so the first two arguments are checked as well.
pub fn is_instance_of(process: &ProcessEntry, executable: &str) -> bool {
    if process_name_matches(&process.name, executable) {
        return true;
    }
    let Some(args) = read_cmdline(process.pid) else {
        return false;
    };
    let executable = executable.strip_suffix(".exe").unwrap_or(executable);
    args.iter().take(2).any(|arg| {
        let base = arg.rsplit('/').next().unwrap_or(arg);
        base.strip_suffix(".exe").unwrap_or(base) == executable
    })
}

/// Compare a kernel process name against an executable name.
///
/// Handles the 15-byte `comm` truncation and a trailing `.exe`.
pub fn process_name_matches(comm: &str, executable: &str) -> bool {
    let executable = executable.strip_suffix(".exe").unwrap_or(executable);
    if comm == executable {
        return true;
    }
    comm.len() == COMM_MAX_LEN && executable.starts_with(comm)
}
