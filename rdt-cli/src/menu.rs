use anyhow::{Context, Result};
use rustyline::DefaultEditor;

/// Prints a numbered list of `options` and reads back a selection.
///
/// The original tool drove its menus through PyInquirer's arrow-key list
/// prompts; `rustyline` only gives us a plain line editor, so the menu is
/// rendered as a numbered list and the operator types the number.
pub fn prompt_choice(editor: &mut DefaultEditor, title: &str, options: &[&str]) -> Result<usize> {
    println!("{title}");
    for (index, option) in options.iter().enumerate() {
        println!("  {}) {}", index + 1, option);
    }
    loop {
        let line = editor
            .readline("> ")
            .context("failed to read menu selection")?;
        editor.add_history_entry(line.as_str()).ok();
        match line.trim().parse::<usize>() {
            Ok(choice) if choice >= 1 && choice <= options.len() => return Ok(choice - 1),
            _ => println!("enter a number between 1 and {}", options.len()),
        }
    }
}

/// Reads one line of free-form text, re-prompting on an empty answer.
pub fn prompt_line(editor: &mut DefaultEditor, prompt: &str) -> Result<String> {
    loop {
        let line = editor
            .readline(&format!("{prompt}: "))
            .context("failed to read input")?;
        editor.add_history_entry(line.as_str()).ok();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            println!("this field can't be empty");
            continue;
        }
        return Ok(trimmed.to_string());
    }
}

/// Reads and parses a `SocketAddr`, re-prompting until one parses.
pub fn prompt_addr(editor: &mut DefaultEditor, prompt: &str) -> Result<std::net::SocketAddr> {
    loop {
        let line = prompt_line(editor, prompt)?;
        match line.parse() {
            Ok(addr) => return Ok(addr),
            Err(_) => println!("expected an address like 127.0.0.1:9000"),
        }
    }
}

/// Reads and parses a bind port, re-prompting until one parses.
pub fn prompt_port(editor: &mut DefaultEditor, prompt: &str) -> Result<u16> {
    loop {
        let line = prompt_line(editor, prompt)?;
        match line.parse() {
            Ok(port) => return Ok(port),
            Err(_) => println!("expected a port number between 0 and 65535"),
        }
    }
}

/// Reads a requested fragment size (0 = auto, else 1..=1463), re-prompting
/// until one parses and fits the protocol's maximum.
pub fn prompt_fragment_size(editor: &mut DefaultEditor) -> Result<u16> {
    loop {
        let line = editor
            .readline("Fragment size, 0 for auto (max 1463): ")
            .context("failed to read fragment size")?;
        editor.add_history_entry(line.as_str()).ok();
        match line.trim().parse::<u16>() {
            Ok(size) if size as usize <= rdt_proto::MAX_FRAGMENT_PAYLOAD => return Ok(size),
            _ => println!("enter a number between 0 and {}", rdt_proto::MAX_FRAGMENT_PAYLOAD),
        }
    }
}
