// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Help text generation with colorization support.

use crate::colors;
use clap::builder::styling::Styles;

/// Clap styles for help output.
pub fn styles() -> Styles {
    if !colors::should_colorize() {
        return Styles::plain();
    }

    use anstyle::{Ansi256Color, Color, Style};

    let color = |code| Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(code))));

    Styles::styled()
        .header(color(colors::codes::HEADER))
        .usage(color(colors::codes::HEADER))
        .literal(color(colors::codes::LITERAL))
        .placeholder(color(colors::codes::CONTEXT))
        .valid(color(colors::codes::CONTEXT))
}

/// Main help template, with the command list ahead of the options.
pub fn template() -> String {
    format!(
        "{{about-with-newline}}
{{usage-heading}} {{usage}}

{{before-help}}{}
{{options}}{{after-help}}",
        colors::header("Options:")
    )
}

/// Commands shown before the options in main help.
pub fn commands() -> String {
    let row = |name: &str, args: &str, about: &str| {
        let name = format!("{name:<8}");
        let args = format!("{args:<24}");
        format!("  {}{}{about}\n", colors::literal(&name), colors::context(&args))
    };

    let mut out = String::new();
    out.push_str(&colors::header("Data:"));
    out.push('\n');
    out.push_str(&row("add", "<collection> [k=v]...", "Add an entity"));
    out.push_str(&row("edit", "<id> <k=v>...", "Update entity fields"));
    out.push_str(&row("rm", "<id>", "Delete an entity"));
    out.push_str(&row("list", "<collection>", "List live entities"));
    out.push('\n');
    out.push_str(&colors::header("Queue:"));
    out.push('\n');
    out.push_str(&row("pending", "", "Show changes waiting to be pushed"));
    out.push_str(&row("failed", "", "Show changes that need attention"));
    out.push_str(&row("retry", "<change-id>", "Queue a failed change again"));
    out.push_str(&row("discard", "<change-id>", "Drop a failed change"));
    out.push('\n');
    out.push_str(&colors::header("Sync:"));
    out.push('\n');
    out.push_str(&row("init", "[--url <url>]", "Set up .pantry/ here"));
    out.push_str(&row("sync", "", "Push and pull once"));
    out.push_str(&row("status", "", "Show queue counts and last sync"));
    out
}

#[cfg(test)]
#[path = "help_tests.rs"]
mod tests;
