#![allow(dead_code)]

use codenav::config::Config;
use codenav::exec::{CommandSpec, ExecError, ProcessExecutor, ProcessOutput};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&CommandSpec) -> Result<ProcessOutput, ExecError> + Send + Sync>;

/// Records every command and answers with a canned response instead of spawning.
pub struct FakeExecutor {
    calls: Mutex<Vec<CommandSpec>>,
    responder: Responder,
}

impl FakeExecutor {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&CommandSpec) -> Result<ProcessOutput, ExecError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Always exits with `exit_code`, printing `stdout`.
    pub fn replying(stdout: &str, exit_code: i32) -> Arc<Self> {
        let stdout = stdout.to_string();
        Self::new(move |_| Ok(output(&stdout, "", Some(exit_code))))
    }

    /// Behaves like a successful `git clone`: creates the target directory.
    pub fn cloning() -> Arc<Self> {
        Self::new(|spec| {
            let target = PathBuf::from(spec.args.last().expect("clone target"));
            std::fs::create_dir_all(&target).expect("create clone target");
            std::fs::write(target.join("README.md"), "cloned\n").expect("write clone file");
            Ok(output("", "Cloning into...\n", Some(0)))
        })
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ProcessExecutor for FakeExecutor {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ExecError> {
        self.calls.lock().unwrap().push(spec.clone());
        (self.responder)(spec)
    }
}

pub fn output(stdout: &str, stderr: &str, exit_code: Option<i32>) -> ProcessOutput {
    ProcessOutput {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code,
        duration: Duration::from_millis(5),
    }
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Defaults with the clone cache inside `root`.
pub fn config_in(root: &Path) -> Config {
    Config::default().with_cache_root(root.join("cache"))
}

pub fn args_of(spec: &CommandSpec) -> Vec<String> {
    spec.args
        .iter()
        .map(|arg| arg.to_string_lossy().to_string())
        .collect()
}

/// Writes a script and marks it executable.
pub fn write_executable(root: &Path, rel: &str, content: &str) {
    write(root, rel, content);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = root.join(rel);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
