//! Prompt construction and response interpretation for the simulated shell.
//!
//! Nothing here emulates commands. The illusion of a real shell comes entirely
//! from the text generator; this module only frames the request and decides
//! what to do with the reply.

use crate::domain::{Transcript, VirtualMachine};

/// Marker the generator returns for screen-clearing commands.
pub const CLEAR_MARKER: &str = "[CLEAR]";

/// Fixed transcript text for any failed shell request.
pub const SHELL_FAILURE_MESSAGE: &str =
    "Error: the shell did not respond. Check the connection to the text generation service.";

/// Default number of trailing transcript characters sent as context.
pub const DEFAULT_TAIL_CHARS: usize = 800;

/// What a successful generator reply means for the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellReply {
    /// Clear the screen.
    Clear,
    /// Append this text verbatim.
    Output(String),
}

/// Build the prompt for one command.
///
/// `history` is the transcript before the command was appended; only its last
/// `tail_chars` characters are included.
pub fn build_prompt(
    vm: &VirtualMachine,
    history: &Transcript,
    command: &str,
    tail_chars: usize,
) -> String {
    let tail = history.tail(tail_chars);
    format!(
        "You are simulating a {flavor} terminal session on a virtual machine named \"{name}\" \
         running {version}. The current working directory is {cwd}.\n\
         \n\
         Recent terminal output:\n\
         {tail}\n\
         \n\
         The user typed the command:\n\
         {command}\n\
         \n\
         Rules: return only the text the shell would print for this command, with no \
         explanations, commentary or markdown code fences. If the command clears the screen \
         (for example `clear` or `cls`), return exactly {marker} and nothing else.",
        flavor = vm.os_family.shell_flavor(),
        name = vm.name,
        version = vm.os_version,
        cwd = vm.working_directory(),
        marker = CLEAR_MARKER,
    )
}

/// Decide what a reply means.
pub fn interpret_reply(text: String) -> ShellReply {
    if text.trim().contains(CLEAR_MARKER) {
        ShellReply::Clear
    } else {
        ShellReply::Output(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OsFamily, Turn};

    #[test]
    fn test_prompt_names_flavor_and_directory() {
        let vm = VirtualMachine::new("Web01", OsFamily::Linux, 2048);
        let prompt = build_prompt(&vm, &Transcript::new(), "pwd", DEFAULT_TAIL_CHARS);
        assert!(prompt.contains("Linux bash"));
        assert!(prompt.contains("/home/web01"));
        assert!(prompt.contains("pwd"));
        assert!(prompt.contains(CLEAR_MARKER));

        let vm = VirtualMachine::new("Desk", OsFamily::Windows, 4096);
        let prompt = build_prompt(&vm, &Transcript::new(), "dir", DEFAULT_TAIL_CHARS);
        assert!(prompt.contains("cmd.exe"));
        assert!(prompt.contains("C:\\Users\\desk"));
    }

    #[test]
    fn test_prompt_history_is_bounded() {
        let vm = VirtualMachine::new("Web01", OsFamily::Linux, 2048);
        let mut history = Transcript::new();
        history.push(Turn::assistant(format!("OLDEST{}", "x".repeat(2000))));
        history.push(Turn::assistant("newest line"));

        let prompt = build_prompt(&vm, &history, "ls", 100);
        assert!(prompt.contains("newest line"));
        assert!(!prompt.contains("OLDEST"));
    }

    #[test]
    fn test_interpret_reply() {
        assert_eq!(interpret_reply("[CLEAR]".to_string()), ShellReply::Clear);
        assert_eq!(interpret_reply("  [CLEAR]\n".to_string()), ShellReply::Clear);
        assert_eq!(
            interpret_reply("total 4\n".to_string()),
            ShellReply::Output("total 4\n".to_string())
        );
    }
}
