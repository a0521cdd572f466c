//! End-to-end tests for the `bg-remover` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Isolated home so no user config or binary leaks into a test.
struct TestContext {
    home: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
        }
    }

    fn binary_path(&self) -> PathBuf {
        self.home.path().join("bin").join("bg-remover")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bg-remover"));
        cmd.env("BG_REMOVER_HOME", self.home.path())
            .env("BG_REMOVER_TEMP_DIR", self.home.path().join("tmp"))
            .env_remove("BG_REMOVER_CONFIG")
            .env_remove("BG_REMOVER_BINARY_PATH")
            .env_remove("BG_REMOVER_PLATFORM")
            .env_remove("BG_REMOVER_TIMEOUT");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().unwrap()
    }

    #[cfg(unix)]
    fn install_stub(&self, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.binary_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn write_config(&self, text: &str) -> PathBuf {
        let path = self.home.path().join("config.toml");
        std::fs::write(&path, text).unwrap();
        path
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn test_help_lists_commands() {
    let ctx = TestContext::new();
    let out = ctx.run(&["--help"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for command in ["install", "run", "transfer", "status"] {
        assert!(text.contains(command), "missing {command} in help:\n{text}");
    }
}

#[test]
fn test_version() {
    let ctx = TestContext::new();
    let out = ctx.run(&["--version"]);
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("bg-remover "));
}

#[test]
fn test_status_without_binary() {
    let ctx = TestContext::new();
    let out = ctx.run(&["status"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("no (run 'bg-remover install')"), "stdout:\n{text}");
    assert!(text.contains("macos-arm64"));
}

#[test]
fn test_run_without_binary_fails() {
    let ctx = TestContext::new();
    let out = ctx.run(&["run", "-i", "in.jpg", "-o", "out.png"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("bg-remover install"), "stderr: {}", stderr(&out));
}

#[test]
fn test_install_unsupported_platform_fails() {
    let ctx = TestContext::new();
    let out = ctx
        .cmd()
        .args(["install", "--platform", "windows"])
        .env("BG_REMOVER_API_URL", "http://127.0.0.1:9")
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Unsupported platform: windows"));
    assert!(stdout(&out).contains("FORKING.md"));
    assert!(!ctx.binary_path().exists());
}

#[test]
fn test_invalid_config_is_reported() {
    let ctx = TestContext::new();
    let config = ctx.write_config("timeout = 0\n");
    let out = ctx.run(&["--config", config.to_str().unwrap(), "status"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("timeout"));
}

#[cfg(unix)]
#[test]
fn test_run_accepts_zero_byte_output() {
    let ctx = TestContext::new();
    ctx.install_stub(": > \"$4\"");
    let output = ctx.home.path().join("out.png");

    let out = ctx.run(&[
        "run",
        "-i",
        "in.jpg",
        "-o",
        output.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(std::fs::metadata(&output).unwrap().len(), 0);
}

#[cfg(unix)]
fn transfer_fixture(ctx: &TestContext) -> (PathBuf, PathBuf) {
    ctx.install_stub("cp \"$2\" \"$4\"");
    let root = ctx.home.path().join("disk");
    std::fs::create_dir_all(root.join("in")).unwrap();
    std::fs::write(root.join("in/photo.jpg"), b"pixels").unwrap();
    let config = ctx.write_config(&format!(
        "[disks.uploads]\nroot = \"{}\"\n",
        root.display()
    ));
    (root, config)
}

#[cfg(unix)]
fn assert_transferred(root: &Path) {
    assert_eq!(std::fs::read(root.join("out/photo.png")).unwrap(), b"pixels");
}

#[cfg(unix)]
#[test]
fn test_transfer_between_disks() {
    let ctx = TestContext::new();
    let (root, config) = transfer_fixture(&ctx);

    let out = ctx.run(&[
        "--config",
        config.to_str().unwrap(),
        "transfer",
        "--from",
        "uploads:in/photo.jpg",
        "--to",
        "uploads:out/photo.png",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_transferred(&root);
}

#[cfg(unix)]
#[test]
fn test_transfer_through_queue() {
    let ctx = TestContext::new();
    let (root, config) = transfer_fixture(&ctx);

    let out = ctx.run(&[
        "-q",
        "--config",
        config.to_str().unwrap(),
        "transfer",
        "--from",
        "uploads:in/photo.jpg",
        "--to",
        "uploads:out/photo.png",
        "--queued",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_transferred(&root);
    assert!(stdout(&out).is_empty());
}

#[cfg(unix)]
#[test]
fn test_transfer_missing_input_fails() {
    let ctx = TestContext::new();
    let (_root, config) = transfer_fixture(&ctx);

    let out = ctx.run(&[
        "--config",
        config.to_str().unwrap(),
        "transfer",
        "--from",
        "uploads:in/missing.jpg",
        "--to",
        "uploads:out/photo.png",
    ]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("not found"));
}
