use std::io::{self, BufRead, Write};

use crate::dispatch::{Confirm, Present};

/// Prints titled result blocks to the terminal.
pub struct ConsolePresenter;

impl Present for ConsolePresenter {
    fn show(&self, text: &str, title: &str) {
        println!("[ {} ]", title);
        println!("{}", text);
    }
}

/// Reads a y/n answer from the terminal; anything but y/yes declines.
pub struct ConsoleConfirmer;

impl Confirm for ConsoleConfirmer {
    fn confirm(&self, question: &str) -> bool {
        print!("{} [y/N] ", question);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

pub fn display_error(message: &str) {
    eprintln!("Error: {}", message);
}
