#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for {:?} to exist", path);
}

pub fn wait_for_path_removed(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for {:?} to be removed", path);
}

pub fn read_pid(path: &Path) -> i32 {
    let contents = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("Failed to read PID file {:?}: {err}", path));
    contents
        .trim()
        .parse()
        .unwrap_or_else(|err| panic!("Invalid PID file content {contents:?}: {err}"))
}

pub fn is_process_alive(pid: i32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

pub fn wait_for_process_exit(pid: i32) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let proc_path = PathBuf::from(format!("/proc/{pid}"));
    let stat_path = PathBuf::from(format!("/proc/{pid}/stat"));

    while Instant::now() < deadline {
        if !proc_path.exists() {
            return;
        }

        // A zombie (killed but not yet reaped) counts as exited.
        if let Ok(stat) = fs::read_to_string(&stat_path) {
            if let Some(state_start) = stat.rfind(')') {
                let state_part = stat[state_start + 1..].trim();
                if matches!(state_part.chars().next(), Some('Z') | Some('X')) {
                    return;
                }
            }
        }

        thread::sleep(Duration::from_millis(100));
    }

    panic!("Timed out waiting for PID {pid} to exit");
}
