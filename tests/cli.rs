//! The `fzcomp` binary as the shell scripts call it

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// A directory tree plus a config whose selector is `selector_script`
    fn new(selector_script: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("work/project")).unwrap();
        fs::write(dir.path().join("work/notes.txt"), "").unwrap();

        let selector = dir.path().join("selector");
        let mut file = fs::File::create(&selector).unwrap();
        writeln!(file, "#!/bin/sh\n{}", selector_script).unwrap();
        file.sync_all().unwrap();
        drop(file);
        fs::set_permissions(&selector, fs::Permissions::from_mode(0o755)).unwrap();

        let workspace = Self { dir };
        workspace.write_config(&format!(
            "[selector]\nbinary = '{}'\n",
            selector.display()
        ));
        workspace
    }

    fn write_config(&self, content: &str) {
        fs::write(self.config(), content).unwrap();
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn cwd(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    fn fzcomp(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_fzcomp"));
        command
            .arg("-c")
            .arg(self.config())
            .args(args)
            .current_dir(self.cwd())
            .env("SHELL", "/bin/sh")
            .env_remove("TMUX");
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.fzcomp(args).output().unwrap()
    }

    fn run_with_input(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .fzcomp(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        child.wait_with_output().unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn complete_replaces_left_buffer() {
    let ws = Workspace::new("head -n 1");
    let output = ws.run(&["widget", "complete", "--lbuffer=cd proj**", "--rbuffer= && ls"]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "cd project/ ");
}

#[test]
fn complete_without_trigger_falls_back() {
    let ws = Workspace::new("head -n 1");
    let output = ws.run(&["widget", "complete", "--lbuffer=cd proj"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).is_empty());
}

#[test]
fn cancelled_selection_leaves_buffer() {
    let ws = Workspace::new("cat > /dev/null\nexit 130");
    let output = ws.run(&["widget", "complete", "--lbuffer=vim **"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
}

#[test]
fn missing_selector_is_a_configuration_error() {
    let ws = Workspace::new("head -n 1");
    ws.write_config("[selector]\nbinary = '/nonexistent/fzcomp-selector'\n");
    let output = ws.run(&["widget", "complete", "--lbuffer=vim **"]);

    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("/nonexistent/fzcomp-selector"));
}

#[test]
fn invalid_configuration_is_reported_to_widgets() {
    let ws = Workspace::new("head -n 1");
    ws.write_config("[completion]\ntrigger = '* *'\n");
    let output = ws.run(&["widget", "insert-path", "--lbuffer=ls "]);

    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("completion.trigger"));
}

#[test]
fn change_directory_asks_to_execute() {
    let ws = Workspace::new("head -n 1");
    let output = ws.run(&["widget", "change-directory", "--lbuffer=git st"]);

    assert_eq!(output.status.code(), Some(4));
    assert_eq!(stdout(&output), "builtin cd -- project");
}

#[test]
fn history_selects_newest_duplicate() {
    let ws = Workspace::new("head -n 1");
    let listing = "    7  git status\n    8  ls\n    9  git status\n";
    let output = ws.run_with_input(&["widget", "history", "--lbuffer=git"], listing);

    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "9");
}

#[test]
fn history_in_vi_mode_returns_text() {
    let ws = Workspace::new("head -n 1");
    let listing = "    1  make\n    2  make test\n";
    let output = ws.run_with_input(&["widget", "history", "--mode", "vi"], listing);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "make test");
}

#[test]
fn environment_overrides_the_trigger() {
    let ws = Workspace::new("head -n 1");
    let output = ws
        .fzcomp(&["widget", "complete", "--lbuffer=cd proj~~"])
        .env("FZCOMP_COMPLETION_TRIGGER", "~~")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "cd project/ ");
}

#[test]
fn compgen_lists_directories() {
    let ws = Workspace::new("head -n 1");
    let output = ws.run(&["compgen", "dir"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "project\n");

    let root = ws.cwd();
    let output = ws.run(&["compgen", "path", root.to_str().unwrap()]);
    let mut lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    lines.sort();
    let base = Path::new(&root);
    assert_eq!(
        lines,
        vec![
            base.join("notes.txt").display().to_string(),
            base.join("project").display().to_string(),
        ]
    );
}

#[test]
fn init_prints_integration_scripts() {
    let ws = Workspace::new("head -n 1");

    let zsh = stdout(&ws.run(&["init", "zsh"]));
    assert!(zsh.contains("zle -N __fzcomp_complete"));
    assert!(zsh.contains("bindkey -M emacs '^T' __fzcomp_insert_path"));

    let bash = stdout(&ws.run(&["init", "bash"]));
    assert!(bash.contains("bind -m emacs-standard -x"));
    assert!(bash.contains("__fzcomp_history"));
}

#[test]
fn config_show_prints_effective_configuration() {
    let ws = Workspace::new("head -n 1");
    let output = ws.run(&["config", "--show"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("[completion]"));
    assert!(text.contains("trigger = \"**\""));
}
