//! This module implements prompting.

use libc::tcgetattr;
use libc::tcsetattr;
use libc::termios;
use libc::ECHO;
use libc::ECHOE;
use libc::ICANON;
use libc::STDIN_FILENO;
use libc::TCSANOW;
use libc::VMIN;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::mem::MaybeUninit;

/// Restores the terminal state saved before hidden input when dropped,
/// and emits the newline the terminal swallowed.
struct EchoGuard(termios);

impl Drop for EchoGuard {
    fn drop(&mut self) {
        println!();
        unsafe {
            tcsetattr(STDIN_FILENO, TCSANOW, &self.0);
        }
    }
}

/// Turns off canonical mode and echo for password entry, returning the
/// guard that undoes it.
fn hide_input() -> EchoGuard {
    let saved = unsafe {
        let mut t: termios = MaybeUninit::zeroed().assume_init();
        tcgetattr(STDIN_FILENO, &mut t);
        t
    };

    let mut raw = saved;
    raw.c_lflag &= !(ICANON | ECHO | ECHOE);
    raw.c_cc[VMIN] = 1;
    unsafe {
        tcsetattr(STDIN_FILENO, TCSANOW, &raw);
    }
    EchoGuard(saved)
}

/// Shows a prompt and reads one line. Returns `None` on end of input.
///
/// Arguments:
/// - `text` is the prompt's text. If `None`, the function uses the default text.
/// - `hidden` tells whether the input is echoed (password entry).
pub fn prompt(text: Option<&str>, hidden: bool) -> Option<String> {
    print!("{}", text.unwrap_or("> "));
    let _ = io::stdout().flush();

    let guard = hidden.then(hide_input);
    let input = io::stdin().lock().lines().next()?.ok()?;
    drop(guard);

    Some(input)
}
