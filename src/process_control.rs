use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
};

use chrono::Local;

use crate::{
    error::{SupervisorError, SupervisorResult},
    launch_plan::LaunchPlan,
    SERVICE_OUTPUT_FILE_PREFIX,
};

/// Per-run files the service writes its stdout and stderr into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputFiles {
    pub(crate) stdout: PathBuf,
    pub(crate) stderr: PathBuf,
}

impl OutputFiles {
    pub(crate) fn for_run(dir: &Path, generation: u64) -> Self {
        let stem = format!(
            "{SERVICE_OUTPUT_FILE_PREFIX}-{}-{generation}",
            Local::now().format("%Y%m%d-%H%M%S")
        );
        Self {
            stdout: dir.join(format!("{stem}.stdout.log")),
            stderr: dir.join(format!("{stem}.stderr.log")),
        }
    }

    fn open_for_child(&self) -> io::Result<(File, File)> {
        for path in [&self.stdout, &self.stderr] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let open = |path: &Path| OpenOptions::new().create(true).append(true).open(path);
        Ok((open(&self.stdout)?, open(&self.stderr)?))
    }
}

/// Spawns the plan as a detached child writing into `output`.
///
/// The child gets its own process group (a new console process group on
/// Windows) and holds its own handles to the output files, so neither
/// terminal signals nor the shell going away reach it. It is never waited on
/// by the caller.
pub(crate) fn spawn_detached(plan: &LaunchPlan, output: &OutputFiles) -> io::Result<Child> {
    let (stdout_file, stderr_file) = output.open_for_child()?;

    let mut command = Command::new(&plan.program);
    command
        .args(&plan.args)
        .current_dir(&plan.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(crate::CREATE_NEW_PROCESS_GROUP | crate::CREATE_NO_WINDOW);
    }

    command.spawn()
}

/// Hangs up the whole process group the service leads, helpers included.
#[cfg(unix)]
pub(crate) fn send_hangup(pid: u32) -> SupervisorResult<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let raw_pid = i32::try_from(pid).map_err(|error| SupervisorError::signal(pid, error))?;
    killpg(Pid::from_raw(raw_pid), Signal::SIGHUP).map_err(|error| SupervisorError::signal(pid, error))
}

#[cfg(target_os = "windows")]
pub(crate) fn send_hangup(pid: u32) -> SupervisorResult<()> {
    // No hangup on Windows; taskkill without /f asks the process tree to close.
    let status = Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/t"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|error| SupervisorError::signal(pid, error))?;
    if status.success() {
        Ok(())
    } else {
        Err(SupervisorError::signal(pid, format!("taskkill exited with {status}")))
    }
}

#[cfg(not(any(unix, target_os = "windows")))]
pub(crate) fn send_hangup(pid: u32) -> SupervisorResult<()> {
    Err(SupervisorError::signal(
        pid,
        "signalling processes is not supported on this platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use nix::{sys::signal::kill, unistd::Pid};

    use super::*;

    fn shell_plan(dir: &Path, script: &str) -> LaunchPlan {
        LaunchPlan {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            cwd: dir.to_path_buf(),
        }
    }

    fn wait_for_exit(child: &mut Child) -> std::process::ExitStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(status) = child.try_wait().expect("try_wait") {
                return status;
            }
            assert!(Instant::now() < deadline, "child did not exit");
            thread::sleep(Duration::from_millis(20));
        }
    }

    // Zombies still accept signal 0, so look at the process state too.
    fn process_is_alive(pid: i32) -> bool {
        if kill(Pid::from_raw(pid), None).is_err() {
            return false;
        }
        match fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(") ")
                .map_or(true, |(_, rest)| !rest.starts_with('Z')),
            Err(_) => true,
        }
    }

    #[test]
    fn spawn_detached_reports_missing_program() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = LaunchPlan {
            program: dir.path().join("does-not-exist"),
            args: Vec::new(),
            cwd: dir.path().to_path_buf(),
        };
        let output = OutputFiles::for_run(&dir.path().join("logs"), 1);
        let error = spawn_detached(&plan, &output).expect_err("missing program must fail");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn output_files_are_named_per_run() {
        let dir = Path::new("/var/log/ob");
        let first = OutputFiles::for_run(dir, 1);
        let second = OutputFiles::for_run(dir, 2);
        assert_ne!(first, second);
        assert!(first.stdout.starts_with(dir));
        let name = first.stdout.file_name().and_then(|name| name.to_str()).expect("file name");
        assert!(name.starts_with("openbazaard-"));
        assert!(name.ends_with("-1.stdout.log"));
        assert!(first.stderr.to_string_lossy().ends_with("-1.stderr.log"));
    }

    #[test]
    fn child_keeps_writing_without_anyone_reading_its_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = OutputFiles::for_run(&dir.path().join("logs"), 1);
        let plan = shell_plan(
            dir.path(),
            "i=0; while [ $i -lt 5 ]; do echo tick; echo warn >&2; i=$((i+1)); sleep 0.02; done; echo done > finished",
        );

        let mut child = spawn_detached(&plan, &output).expect("spawn sh");
        assert!(child.stdout.is_none());
        assert!(child.stderr.is_none());

        let status = wait_for_exit(&mut child);
        assert!(status.success(), "child died early: {status}");
        assert!(dir.path().join("finished").exists());
        let stdout = fs::read_to_string(&output.stdout).expect("stdout file");
        assert_eq!(stdout.lines().filter(|line| *line == "tick").count(), 5);
        let stderr = fs::read_to_string(&output.stderr).expect("stderr file");
        assert_eq!(stderr.lines().count(), 5);
    }

    #[test]
    fn send_hangup_terminates_a_default_handling_child() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = OutputFiles::for_run(&dir.path().join("logs"), 1);
        let mut child = spawn_detached(&shell_plan(dir.path(), "sleep 30"), &output).expect("spawn sh");
        send_hangup(child.id()).expect("send SIGHUP");
        wait_for_exit(&mut child);
    }

    #[test]
    fn send_hangup_reaches_helper_processes_of_the_service() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = OutputFiles::for_run(&dir.path().join("logs"), 1);
        let plan = shell_plan(dir.path(), "sh -c 'sleep 30' & echo $! > worker; wait");
        let mut child = spawn_detached(&plan, &output).expect("spawn sh");

        let worker_file = dir.path().join("worker");
        let deadline = Instant::now() + Duration::from_secs(5);
        let worker_pid = loop {
            if let Some(pid) = fs::read_to_string(&worker_file)
                .ok()
                .and_then(|raw| raw.trim().parse::<i32>().ok())
            {
                break pid;
            }
            assert!(Instant::now() < deadline, "worker never started");
            thread::sleep(Duration::from_millis(20));
        };

        send_hangup(child.id()).expect("send SIGHUP");
        wait_for_exit(&mut child);

        let deadline = Instant::now() + Duration::from_secs(5);
        while process_is_alive(worker_pid) {
            assert!(Instant::now() < deadline, "worker {worker_pid} survived the hangup");
            thread::sleep(Duration::from_millis(20));
        }
    }
}
