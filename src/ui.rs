use anstyle::{AnsiColor, Style};
use is_terminal::IsTerminal;
use std::fmt::Display;
use std::io::{self, Write};
use std::time::{Duration, Instant};

const STATUS_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy)]
enum StatusKind {
    Pending,
    Success,
    Info,
    Warn,
    Error,
}

impl StatusKind {
    fn to_stderr(self) -> bool {
        matches!(self, StatusKind::Warn | StatusKind::Error)
    }
}

fn supports_color(is_terminal: bool) -> bool {
    is_terminal && std::env::var_os("NO_COLOR").is_none()
}

fn style_for(kind: StatusKind) -> Style {
    let style = Style::new().bold();
    match kind {
        StatusKind::Pending => style.fg_color(Some(AnsiColor::Cyan.into())),
        StatusKind::Success => style.fg_color(Some(AnsiColor::Green.into())),
        StatusKind::Info => style.fg_color(Some(AnsiColor::Blue.into())),
        StatusKind::Warn => style.fg_color(Some(AnsiColor::Yellow.into())),
        StatusKind::Error => style.fg_color(Some(AnsiColor::Red.into())),
    }
}

fn render_status(kind: StatusKind, label: &str, message: &str, use_color: bool) -> String {
    let padded_label = if label.is_empty() {
        " ".repeat(STATUS_WIDTH)
    } else {
        format!("{:>width$}", label, width = STATUS_WIDTH)
    };

    let (prefix, suffix) = if use_color {
        let style = style_for(kind);
        (style.render().to_string(), style.render_reset().to_string())
    } else {
        (String::new(), String::new())
    };

    let mut rendered = String::new();
    for (idx, line) in message.split('\n').enumerate() {
        if idx == 0 {
            rendered.push_str(&format!("{prefix}{padded_label}{suffix} {line}\n"));
        } else {
            rendered.push_str(&format!("{:>width$} {line}\n", "", width = STATUS_WIDTH));
        }
    }
    rendered
}

fn write_status(kind: StatusKind, label: &str, message: &str) {
    let (use_color, mut handle): (bool, Box<dyn Write>) = if kind.to_stderr() {
        let stderr = io::stderr();
        (
            supports_color(stderr.is_terminal()),
            Box::new(stderr.lock()) as Box<dyn Write>,
        )
    } else {
        let stdout = io::stdout();
        (
            supports_color(stdout.is_terminal()),
            Box::new(stdout.lock()) as Box<dyn Write>,
        )
    };

    let _ = handle.write_all(render_status(kind, label, message, use_color).as_bytes());
    let _ = handle.flush();
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 60 {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        if seconds == 0 {
            format!("{minutes}m")
        } else {
            format!("{minutes}m {seconds}s")
        }
    } else if duration.as_secs_f64() >= 1.0 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if duration.as_millis() >= 1 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}µs", duration.as_micros())
    }
}

pub fn info(message: impl Display) {
    write_status(StatusKind::Info, "Info", &message.to_string());
}

pub fn success(label: &str, message: impl Display) {
    write_status(StatusKind::Success, label, &message.to_string());
}

/// A pending status line that reports elapsed time when it settles
pub struct Progress {
    message: String,
    started: Instant,
    complete: bool,
}

impl Progress {
    pub fn new(label: impl Into<String>, message: impl Into<String>) -> Self {
        let label = label.into();
        let message = message.into();
        write_status(StatusKind::Pending, &label, &message);

        Self {
            message,
            started: Instant::now(),
            complete: false,
        }
    }

    pub fn success(mut self, label: &str, detail: Option<String>) {
        if self.complete {
            return;
        }

        self.complete = true;
        let mut combined = self.message.clone();
        if let Some(detail) = detail {
            if !detail.is_empty() {
                combined.push(' ');
                combined.push_str(&detail);
            }
        }
        let elapsed = format_duration(self.started.elapsed());
        combined.push_str(" in ");
        combined.push_str(&elapsed);

        write_status(StatusKind::Success, label, &combined);
    }

    pub fn fail(mut self, label: &str, error: impl Display) {
        if self.complete {
            return;
        }

        self.complete = true;
        let elapsed = format_duration(self.started.elapsed());
        let combined = format!("{} after {}: {}", self.message, elapsed, error);
        write_status(StatusKind::Error, label, &combined);
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.complete {
            let combined = format!("{} (aborted)", self.message);
            write_status(StatusKind::Warn, "Cancelled", &combined);
            self.complete = true;
        }
    }
}
