// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a [`CrashContext`] into a deliverable [`Report`].
//!
//! Rendering never fails: sections whose inputs are missing (no backtrace,
//! unreadable source file) are left out rather than erroring, so a report is
//! always produced for delivery.

use crashrelay_core::Report;
use tracing::debug;

use crate::context::{CrashContext, SourceLocation};

/// Most annotation rows rendered into the context table.
const VALUE_TABLE_LIMIT: usize = 25;

/// Renders crash contexts as plain text or rich HTML reports.
pub struct ReportRenderer {
    application_name: Option<String>,
    application_version: Option<String>,
    rich: bool,
    snippet_line_limit: usize,
}

impl ReportRenderer {
    /// Creates a renderer. `rich` selects HTML bodies over plain text.
    pub fn new(
        application_name: Option<String>,
        application_version: Option<String>,
        rich: bool,
    ) -> Self {
        Self {
            application_name,
            application_version,
            rich,
            snippet_line_limit: 50,
        }
    }

    /// Caps how many source lines the snippet window may show.
    pub fn with_snippet_line_limit(mut self, limit: usize) -> Self {
        self.snippet_line_limit = limit;
        self
    }

    /// Subject line for the report, prefixed with the application identity
    /// when one is configured.
    pub fn subject(&self) -> String {
        match self.identity() {
            Some(identity) => format!("{identity} Crash Report"),
            None => "Crash Report".to_string(),
        }
    }

    /// Renders a complete report for delivery.
    pub fn render(&self, ctx: &CrashContext) -> Report {
        let body = if self.rich {
            self.render_html(ctx)
        } else {
            self.render_text(ctx)
        };
        Report {
            subject: self.subject(),
            body,
            rich: self.rich,
            attachments: Vec::new(),
            created_at: ctx.captured_at,
        }
    }

    fn identity(&self) -> Option<String> {
        match (&self.application_name, &self.application_version) {
            (Some(name), Some(version)) => Some(format!("{name} {version}")),
            (Some(name), None) => Some(name.clone()),
            _ => None,
        }
    }

    fn render_text(&self, ctx: &CrashContext) -> String {
        let mut body = ctx.captured_at.format("%d %B %Y, %I:%M %p\n").to_string();
        if let Some(identity) = self.identity() {
            body.push_str(&identity);
            body.push('\n');
        }
        body.push('\n');

        body.push_str(&format!("{}: {}\n", ctx.kind, ctx.message));
        if let Some(location) = &ctx.location {
            body.push_str(&format!("at {location}"));
            if let Some(thread) = &ctx.thread {
                body.push_str(&format!(" (thread {thread})"));
            }
            body.push('\n');
        }

        if let Some(backtrace) = &ctx.backtrace {
            body.push('\n');
            body.push_str(backtrace.trim_end());
            body.push('\n');
        }

        if !ctx.values.is_empty() {
            let rule = "-".repeat(90);
            body.push('\n');
            body.push_str(&rule);
            body.push('\n');
            body.push_str(&format!("{:<25}{}\n", "Variable", "Value"));
            body.push_str(&rule);
            body.push('\n');
            for (name, value) in ctx.values.iter().take(VALUE_TABLE_LIMIT) {
                body.push_str(&format!("{name:<25}{value}\n"));
            }
        }

        if let Some(snippet) = self.snippet_for(ctx) {
            let file = ctx
                .location
                .as_ref()
                .map(|l| l.file.as_str())
                .unwrap_or_default();
            body.push_str(&format!("\nsource window ({file}):\n"));
            body.push_str(&snippet);
        }

        body
    }

    fn render_html(&self, ctx: &CrashContext) -> String {
        let identity = self
            .identity()
            .map(|i| escape_html(&i))
            .unwrap_or_else(|| "unnamed application".to_string());

        let location_html = match &ctx.location {
            Some(location) => {
                let thread = ctx
                    .thread
                    .as_deref()
                    .map(|t| format!(" on thread <code>{}</code>", escape_html(t)))
                    .unwrap_or_default();
                format!(
                    "<p class=\"location\">at <code>{}</code>{}</p>",
                    escape_html(&location.to_string()),
                    thread
                )
            }
            None => String::new(),
        };

        let backtrace_html = match &ctx.backtrace {
            Some(backtrace) => format!(
                "<section>\n<h2>Stack backtrace</h2>\n<pre>{}</pre>\n</section>",
                escape_html(backtrace.trim_end())
            ),
            None => String::new(),
        };

        let values_html = if ctx.values.is_empty() {
            String::new()
        } else {
            let mut rows = String::new();
            for (name, value) in ctx.values.iter().take(VALUE_TABLE_LIMIT) {
                rows.push_str(&format!(
                    "<tr><td><code>{}</code></td><td>{}</td></tr>\n",
                    escape_html(name),
                    escape_html(value)
                ));
            }
            format!(
                "<section>\n<h2>Context</h2>\n<table class=\"values\">\n\
                 <thead><tr><th>Variable</th><th>Value</th></tr></thead>\n\
                 <tbody>\n{rows}</tbody>\n</table>\n</section>"
            )
        };

        let snippet_html = match self.snippet_for(ctx) {
            Some(snippet) => format!(
                "<section>\n<h2>Source</h2>\n<pre>{}</pre>\n</section>",
                escape_html(snippet.trim_end())
            ),
            None => String::new(),
        };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{subject}</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        <header>
            <h1>Crash Report</h1>
            <p class="subtitle">{identity}</p>
            <p class="subtitle">{date} at {time}</p>
        </header>

        <section class="failure">
            <h2>{kind}</h2>
            <p class="message">{message}</p>
            {location_html}
        </section>

        {backtrace_html}

        {values_html}

        {snippet_html}

        <footer>
            <p>Generated by crashrelay v{version}</p>
        </footer>
    </div>
</body>
</html>"#,
            subject = escape_html(&self.subject()),
            css = DEFAULT_CSS,
            identity = identity,
            date = ctx.captured_at.format("%d %B %Y"),
            time = ctx.captured_at.format("%I:%M %p"),
            kind = ctx.kind,
            message = escape_html(&ctx.message),
            location_html = location_html,
            backtrace_html = backtrace_html,
            values_html = values_html,
            snippet_html = snippet_html,
            version = env!("CARGO_PKG_VERSION"),
        )
    }

    fn snippet_for(&self, ctx: &CrashContext) -> Option<String> {
        let location = ctx.location.as_ref()?;
        match source_snippet(location, self.snippet_line_limit) {
            Some(snippet) => Some(snippet),
            None => {
                debug!(file = %location.file, "source window unavailable for report");
                None
            }
        }
    }
}

/// Reads a window of up to `limit` source lines ending at the failing line,
/// marking that line. Best-effort: returns `None` when the file cannot be
/// read (stripped builds, relocated sources).
fn source_snippet(location: &SourceLocation, limit: usize) -> Option<String> {
    if location.line == 0 || limit == 0 {
        return None;
    }
    let content = std::fs::read_to_string(&location.file).ok()?;

    let line = location.line as usize;
    let start = line.saturating_sub(limit - 1).max(1);
    let mut out = String::new();
    for (idx, text) in content
        .lines()
        .enumerate()
        .skip(start - 1)
        .take(line - start + 1)
    {
        let number = idx + 1;
        let marker = if number == line { '>' } else { ' ' };
        out.push_str(&format!("{marker} {number:>5} | {text}\n"));
    }

    if out.is_empty() { None } else { Some(out) }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const DEFAULT_CSS: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: #f5f5f5;
    color: #333;
    line-height: 1.5;
    margin: 0;
}
.container { max-width: 900px; margin: 0 auto; padding: 20px; }
header {
    text-align: center;
    padding: 30px 0;
    background: #b63e3e;
    color: white;
    border-radius: 8px;
    margin-bottom: 20px;
}
header h1 { margin: 0 0 8px; }
.subtitle { margin: 2px 0; opacity: 0.9; }
section {
    background: white;
    border-radius: 8px;
    padding: 20px;
    margin-bottom: 16px;
    box-shadow: 0 2px 4px rgba(0,0,0,0.1);
}
h2 { color: #4a5568; margin-top: 0; border-bottom: 2px solid #e2e8f0; padding-bottom: 8px; }
.message { font-weight: 600; }
pre {
    background: #edf2f7;
    padding: 12px;
    border-radius: 4px;
    overflow-x: auto;
    font-size: 0.85em;
}
code { background: #edf2f7; padding: 2px 5px; border-radius: 3px; }
table.values { width: 100%; border-collapse: collapse; }
table.values th, table.values td {
    padding: 8px 12px;
    text-align: left;
    border-bottom: 1px solid #e2e8f0;
}
footer { text-align: center; color: #718096; font-size: 0.9em; padding: 16px; }
"#;
