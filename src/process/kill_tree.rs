// src/process/kill_tree.rs

//! Recursive termination of a process and all of its descendants.
//!
//! Descendant discovery must guard against PID reuse: a process only counts
//! as a descendant if its creation time is not earlier than its parent's.
//! Backends are selected at compile time.

use tracing::debug;

/// Forcibly terminate `root_pid` and every live descendant of it,
/// children-first.
pub fn kill_process_tree(root_pid: u32) {
    debug!(pid = root_pid, "killing process tree");
    imp::kill_process_tree(root_pid);
}

/// Parse the ppid and starttime fields out of one `/proc/<pid>/stat` line.
///
/// The comm field (field 2) may contain spaces and parentheses, so parsing
/// starts after the *last* closing parenthesis. Returns `(ppid, starttime)`.
#[cfg(unix)]
pub fn parse_stat_line(line: &str) -> Option<(u32, u64)> {
    let rparen = line.rfind(')')?;
    let rest = line.get(rparen + 1..)?;
    let mut fields = rest.split_ascii_whitespace();
    // After comm: state(3) ppid(4) ... starttime(22).
    let ppid: u32 = fields.nth(1)?.parse().ok()?;
    let start_time: u64 = fields.nth(17)?.parse().ok()?;
    Some((ppid, start_time))
}

#[cfg(unix)]
mod imp {
    use std::fs;

    use tracing::debug;

    use super::parse_stat_line;

    struct ProcEntry {
        pid: u32,
        ppid: u32,
        start_time: u64,
    }

    pub(super) fn kill_process_tree(root_pid: u32) {
        let procs = snapshot();
        let root_start = procs
            .iter()
            .find(|e| e.pid == root_pid)
            .map(|e| e.start_time);

        if let Some(root_start) = root_start {
            let mut victims = Vec::new();
            collect_descendants(&procs, root_pid, root_start, &mut victims);
            // Children before parents, so nothing gets re-parented mid-kill.
            for pid in victims.iter().rev() {
                debug!(pid, "killing descendant process");
                kill(*pid);
            }
        }

        kill(root_pid);
    }

    /// Descendants of `parent`, parents before children.
    ///
    /// A process whose recorded start time predates its parent's cannot be a
    /// real child; its PID was reused by an unrelated process and it is left
    /// alone.
    fn collect_descendants(
        procs: &[ProcEntry],
        parent: u32,
        parent_start: u64,
        out: &mut Vec<u32>,
    ) {
        for entry in procs {
            if entry.ppid == parent && entry.start_time >= parent_start {
                out.push(entry.pid);
                collect_descendants(procs, entry.pid, entry.start_time, out);
            }
        }
    }

    fn snapshot() -> Vec<ProcEntry> {
        let mut entries = Vec::new();
        let Ok(dir) = fs::read_dir("/proc") else {
            return entries;
        };
        for dent in dir.flatten() {
            let Some(pid) = dent
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            let Ok(stat) = fs::read_to_string(dent.path().join("stat")) else {
                continue;
            };
            if let Some((ppid, start_time)) = parse_stat_line(&stat) {
                entries.push(ProcEntry {
                    pid,
                    ppid,
                    start_time,
                });
            }
        }
        entries
    }

    fn kill(pid: u32) {
        // SIGKILL: the tree is being torn down after a timeout or abort, so
        // there is no graceful-shutdown window.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(windows)]
mod imp {
    /// taskkill /T kills the whole tree in one OS-level operation.
    pub(super) fn kill_process_tree(root_pid: u32) {
        let _ = std::process::Command::new("taskkill")
            .args(["/PID", &root_pid.to_string(), "/T", "/F"])
            .output();
    }
}
