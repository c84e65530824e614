use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use blogctl_migrate::{ErrorKind, MigrationError};

const EXIT_GENERIC_FAILURE: u8 = 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style() -> OutputStyle {
    output_style_for(std::io::stderr().is_terminal())
}

pub(crate) fn output_style_for(stderr_is_terminal: bool) -> OutputStyle {
    if stderr_is_terminal {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn print_status(style: OutputStyle, status: &str, message: &str) {
    println!("{}", render_status_line(style, status, message));
}

pub(crate) fn print_failure(err: &anyhow::Error, style: OutputStyle) {
    for line in render_failure_lines(err, style) {
        eprintln!("{line}");
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => {
            let badge = format!("[{}]", status.to_ascii_uppercase());
            format!("{} {message}", colorize(status_style(status), &badge))
        }
    }
}

pub(crate) fn render_failure_lines(err: &anyhow::Error, style: OutputStyle) -> Vec<String> {
    let Some(migration) = err.downcast_ref::<MigrationError>() else {
        return vec![render_status_line(style, "error", &format!("{err:#}"))];
    };

    let Some(classified) = migration.classified() else {
        return vec![render_status_line(style, "error", &migration.to_string())];
    };

    let mut lines = classified.report_lines();
    if let Some(first) = lines.first_mut() {
        *first = render_status_line(style, kind_badge(classified.kind()), first);
    }
    lines
}

pub(crate) fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<MigrationError>()
        .and_then(|migration| u8::try_from(migration.exit_code()).ok())
        .unwrap_or(EXIT_GENERIC_FAILURE)
}

fn kind_badge(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Config => "config",
        ErrorKind::System => "system",
        ErrorKind::Process => "error",
    }
}

fn status_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        _ => AnsiColor::BrightRed,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
