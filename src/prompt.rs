// Console input behind a small trait so the bootstrap flows and commands
// can be driven by a script in tests. `ConsolePrompter` is the real
// implementation and uses `dialoguer`.

use std::io;

use dialoguer::{Input, Select};

pub trait Prompter {
    /// Ask for a value. Blank answers are refused at an attended terminal.
    fn input(&self, prompt: &str) -> io::Result<String>;

    /// Ask for a value, returning `default` when left blank.
    fn input_with_default(&self, prompt: &str, default: &str) -> io::Result<String>;

    /// Pick one of `items`, returning its index.
    fn select(&self, prompt: &str, items: &[String]) -> io::Result<usize>;
}

/// Interactive prompts on the attached terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn input(&self, prompt: &str) -> io::Result<String> {
        // Re-asks on a blank line at a terminal, but returns "" when stderr
        // is not one. Callers check for blank answers themselves.
        Input::<String>::new().with_prompt(prompt).interact_text()
    }

    fn input_with_default(&self, prompt: &str, default: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .default(default.to_string())
            .show_default(true)
            .interact_text()
    }

    fn select(&self, prompt: &str, items: &[String]) -> io::Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
    }
}

impl<T: Prompter + ?Sized> Prompter for &T {
    fn input(&self, prompt: &str) -> io::Result<String> {
        (**self).input(prompt)
    }

    fn input_with_default(&self, prompt: &str, default: &str) -> io::Result<String> {
        (**self).input_with_default(prompt, default)
    }

    fn select(&self, prompt: &str, items: &[String]) -> io::Result<usize> {
        (**self).select(prompt, items)
    }
}
