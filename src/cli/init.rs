//! `fzcomp init`: shell integration scripts
//!
//! The printed script defines one shell function per widget, each calling
//! `fzcomp widget <name>` and acting on its exit status, binds them to the
//! configured keys and appends the clap-generated completion for the
//! `fzcomp` command itself.

use clap::{CommandFactory, ValueEnum};
use clap_complete::{Shell, generate};

use crate::bindings::{BindingTable, Widget};
use crate::cli::CliArgs;
use crate::completion::quote;

/// Shells `fzcomp init` supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InitShell {
    Zsh,
    Bash,
}

/// Build the integration script for `shell`
///
/// # Arguments
/// * `shell` - Target shell
/// * `bindings` - Key chord per widget
/// * `program` - Path of the fzcomp executable
///
/// # Returns
/// * `String` - Script to be sourced by the shell
pub fn init_script(shell: InitShell, bindings: &BindingTable, program: &str) -> String {
    match shell {
        InitShell::Zsh => zsh_script(bindings, program),
        InitShell::Bash => bash_script(bindings, program),
    }
}

/// Shell function implementing `widget`
fn function_name(widget: Widget) -> String {
    format!("__fzcomp_{}", widget.name().replace('-', "_"))
}

/// Completion script for the fzcomp command itself
fn self_completion(shell: Shell) -> String {
    let mut cmd = CliArgs::command();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, "fzcomp", &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

const ZSH_WIDGETS: &str = r#"
__fzcomp_complete() {
  local out ret
  out="$("$__fzcomp_bin" widget complete --lbuffer="$LBUFFER" --rbuffer="$RBUFFER")"
  ret=$?
  case $ret in
    0) LBUFFER="$out"; zle reset-prompt ;;
    1) zle reset-prompt ;;
    *) zle "${__fzcomp_default_completion:-expand-or-complete}" ;;
  esac
}

__fzcomp_insert_path() {
  local out ret
  out="$("$__fzcomp_bin" widget insert-path --lbuffer="$LBUFFER" --rbuffer="$RBUFFER")"
  ret=$?
  [[ $ret -eq 0 ]] && LBUFFER="$out"
  zle reset-prompt
  return 0
}

__fzcomp_change_directory() {
  local out ret
  out="$("$__fzcomp_bin" widget change-directory --lbuffer="$LBUFFER" --rbuffer="$RBUFFER")"
  ret=$?
  if [[ $ret -eq 4 ]]; then
    zle push-line
    BUFFER="$out"
    zle accept-line
  fi
  zle reset-prompt
  return 0
}

__fzcomp_history() {
  local out ret mode=emacs
  [[ $KEYMAP == vi* || -o vi ]] && mode=vi
  out="$(builtin fc -rl 1 2> /dev/null | "$__fzcomp_bin" widget history --mode "$mode" --lbuffer="$LBUFFER" --rbuffer="$RBUFFER")"
  ret=$?
  case $ret in
    3) zle vi-fetch-history -n "$out" ;;
    0) BUFFER="$out"; CURSOR=$#BUFFER ;;
  esac
  zle reset-prompt
  return 0
}
"#;

fn zsh_script(bindings: &BindingTable, program: &str) -> String {
    let complete_key = bindings
        .chord(Widget::Complete)
        .map(|c| c.to_zsh())
        .unwrap_or_else(|| "^I".to_string());

    let mut binds = String::new();
    for (widget, chord) in bindings.iter() {
        let function = function_name(widget);
        binds.push_str(&format!("zle -N {function}\n"));
        for keymap in ["emacs", "viins", "vicmd"] {
            binds.push_str(&format!(
                "bindkey -M {keymap} '{}' {function}\n",
                chord.to_zsh()
            ));
        }
    }

    format!(
        r#"# fzcomp key bindings for zsh
typeset -g __fzcomp_bin={bin}

# the binding replaced by the complete widget, captured once
if [[ -z "$__fzcomp_default_completion" ]]; then
  __fzcomp_default_completion="$(bindkey '{complete_key}' | awk '{{print $2}}')"
  case "$__fzcomp_default_completion" in
    ''|undefined-key|__fzcomp_*) __fzcomp_default_completion=expand-or-complete ;;
  esac
fi
{widgets}
{binds}
if (( $+functions[compdef] )); then
{completion}
fi
"#,
        bin = quote(program),
        widgets = ZSH_WIDGETS,
        completion = self_completion(Shell::Zsh),
    )
}

// Each key runs the widget through `bind -x`, then the continuation key,
// which the widget rebinds to the readline command that should follow.
const BASH_WIDGETS: &str = r#"
__fzcomp_then() {
  bind "\"\\e[9900~\": $1"
}

__fzcomp_complete() {
  local left="${READLINE_LINE:0:READLINE_POINT}" right="${READLINE_LINE:READLINE_POINT}" out ret
  out="$("$__fzcomp_bin" widget complete --lbuffer="$left" --rbuffer="$right")"
  ret=$?
  case $ret in
    0) READLINE_LINE="$out$right"; READLINE_POINT=${#out}; __fzcomp_then redraw-current-line ;;
    1) __fzcomp_then redraw-current-line ;;
    *) __fzcomp_then "$__fzcomp_default_completion" ;;
  esac
}

__fzcomp_insert_path() {
  local left="${READLINE_LINE:0:READLINE_POINT}" right="${READLINE_LINE:READLINE_POINT}" out ret
  out="$("$__fzcomp_bin" widget insert-path --lbuffer="$left" --rbuffer="$right")"
  ret=$?
  if [[ $ret -eq 0 ]]; then
    READLINE_LINE="$out$right"
    READLINE_POINT=${#out}
  fi
  __fzcomp_then redraw-current-line
}

__fzcomp_change_directory() {
  local left="${READLINE_LINE:0:READLINE_POINT}" right="${READLINE_LINE:READLINE_POINT}" out ret
  out="$("$__fzcomp_bin" widget change-directory --lbuffer="$left" --rbuffer="$right")"
  ret=$?
  if [[ $ret -eq 4 ]]; then
    READLINE_LINE="$out"
    READLINE_POINT=${#out}
    __fzcomp_then accept-line
  else
    __fzcomp_then redraw-current-line
  fi
}

__fzcomp_history() {
  local left="${READLINE_LINE:0:READLINE_POINT}" right="${READLINE_LINE:READLINE_POINT}" out ret mode=emacs
  [[ -o vi ]] && mode=vi
  out="$(builtin fc -lr -2147483648 2> /dev/null | "$__fzcomp_bin" widget history --mode "$mode" --lbuffer="$left" --rbuffer="$right")"
  ret=$?
  case $ret in
    3) READLINE_LINE="!$out"; READLINE_POINT=${#READLINE_LINE}; __fzcomp_then history-expand-line ;;
    0) READLINE_LINE="$out"; READLINE_POINT=${#out}; __fzcomp_then redraw-current-line ;;
    *) __fzcomp_then redraw-current-line ;;
  esac
}
"#;

/// Key sequence running the `bind -x` handler of `widget`
fn bash_handler_key(widget: Widget) -> String {
    let n = Widget::ALL
        .iter()
        .position(|w| *w == widget)
        .map_or(0, |i| i + 1);
    format!("\\e[990{n}~")
}

fn bash_script(bindings: &BindingTable, program: &str) -> String {
    let complete_key = bindings
        .chord(Widget::Complete)
        .map(|c| c.to_bash())
        .unwrap_or_else(|| "\\C-i".to_string());

    let mut binds = String::new();
    for (widget, chord) in bindings.iter() {
        let handler = bash_handler_key(widget);
        for keymap in ["emacs-standard", "vi-insert"] {
            binds.push_str(&format!(
                "bind -m {keymap} -x '\"{handler}\": {}'\n",
                function_name(widget)
            ));
            binds.push_str(&format!(
                "bind -m {keymap} '\"{}\": \"{handler}\\e[9900~\"'\n",
                chord.to_bash()
            ));
        }
    }

    format!(
        r#"# fzcomp key bindings for bash
__fzcomp_bin={bin}

# the binding replaced by the complete widget, captured once
if [[ -z "${{__fzcomp_default_completion-}}" ]]; then
  __fzcomp_default_completion="$(bind -p 2> /dev/null | grep -F '"{complete_key}": ' | head -n 1 | sed 's/^[^:]*: //')"
  [[ -z "$__fzcomp_default_completion" ]] && __fzcomp_default_completion=complete
fi
{widgets}
{binds}
{completion}"#,
        bin = quote(program),
        widgets = BASH_WIDGETS,
        completion = self_completion(Shell::Bash),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyBindingConfig;

    fn table() -> BindingTable {
        BindingTable::from_config(&KeyBindingConfig::default()).unwrap()
    }

    #[test]
    fn test_function_names() {
        assert_eq!(function_name(Widget::Complete), "__fzcomp_complete");
        assert_eq!(function_name(Widget::ChangeDirectory), "__fzcomp_change_directory");
    }

    #[test]
    fn test_zsh_script_binds_every_widget() {
        let script = init_script(InitShell::Zsh, &table(), "/opt/fz comp/fzcomp");

        assert!(script.contains("typeset -g __fzcomp_bin=/opt/fz\\ comp/fzcomp"));
        assert!(script.contains("bindkey '^I' | awk '{print $2}'"));
        assert!(script.contains("bindkey -M emacs '^I' __fzcomp_complete"));
        assert!(script.contains("bindkey -M viins '^T' __fzcomp_insert_path"));
        assert!(script.contains("bindkey -M vicmd '\\ec' __fzcomp_change_directory"));
        assert!(script.contains("bindkey -M emacs '^R' __fzcomp_history"));
        assert!(script.contains("zle -N __fzcomp_history"));
        assert!(script.contains("_fzcomp"));
    }

    #[test]
    fn test_bash_script_chains_continuation_key() {
        let script = init_script(InitShell::Bash, &table(), "/usr/bin/fzcomp");

        assert!(script.contains("__fzcomp_bin=/usr/bin/fzcomp"));
        assert!(script.contains("grep -F '\"\\C-i\": '"));
        assert!(script.contains("bind -m emacs-standard -x '\"\\e[9901~\": __fzcomp_complete'"));
        assert!(script.contains("bind -m vi-insert '\"\\C-t\": \"\\e[9902~\\e[9900~\"'"));
        assert!(script.contains("bind -m emacs-standard '\"\\ec\": \"\\e[9903~\\e[9900~\"'"));
        assert!(script.contains("complete -F _fzcomp"));
    }

    #[test]
    fn test_custom_keys() {
        let config = KeyBindingConfig {
            history: "alt-r".to_string(),
            ..KeyBindingConfig::default()
        };
        let table = BindingTable::from_config(&config).unwrap();

        let zsh = init_script(InitShell::Zsh, &table, "fzcomp");
        assert!(zsh.contains("bindkey -M emacs '\\er' __fzcomp_history"));
        let bash = init_script(InitShell::Bash, &table, "fzcomp");
        assert!(bash.contains("'\"\\er\": \"\\e[9904~\\e[9900~\"'"));
    }
}
