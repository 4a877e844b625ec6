use colored::*;
use serde::Deserialize;
use std::io::Write;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::models::{StepRecommendation, ThoughtKind, ThoughtRecord};

const PREVIEW_CHARS: usize = 60;
const MIN_WIDTH: usize = 20;

/// How thoughts are drawn on the display side channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStyle {
    /// Colored rounded box with emoji header
    Rich,
    /// ASCII box, no escape codes
    Plain,
}

/// Records a thought points back at, resolved by the tracker
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderContext<'a> {
    pub revised: Option<&'a ThoughtRecord>,
    pub fork_point: Option<&'a ThoughtRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tone {
    Body,
    Context,
    Marker,
    Heading,
    Tool,
    Detail,
    Outcome,
    Condition,
}

struct Line {
    text: String,
    tone: Tone,
}

/// Thought renderer, similar in spirit to the Sequential Thinking console panels
#[derive(Debug, Clone)]
pub struct VisualOutput {
    style: DisplayStyle,
    width: usize,
}

impl VisualOutput {
    pub fn new(style: DisplayStyle, width: usize) -> Self {
        Self {
            style,
            width: width.max(MIN_WIDTH),
        }
    }

    /// Deterministic box for one record: header, thought text, context, markers, recommendation
    pub fn render(&self, record: &ThoughtRecord, context: &RenderContext<'_>) -> String {
        let wrap_width = self.width - 4;
        let header = self.header(record);
        let mut lines = Vec::new();

        for line in wrap(&record.thought, wrap_width) {
            lines.push(Line { text: line, tone: Tone::Body });
        }

        if let Some(revised) = context.revised {
            push_wrapped(&mut lines, &format!("Supersedes: {}", preview(&revised.thought)), wrap_width, Tone::Context);
        }
        if let Some(fork) = context.fork_point {
            push_wrapped(&mut lines, &format!("Forked from: {}", preview(&fork.thought)), wrap_width, Tone::Context);
        }

        if record.needs_more() {
            let marker = format!("Estimate extended: more thoughts needed beyond {}", record.total_thoughts);
            let marker = match self.style {
                DisplayStyle::Rich => format!("⏩ {}", marker),
                DisplayStyle::Plain => format!(">> {}", marker),
            };
            push_wrapped(&mut lines, &marker, wrap_width, Tone::Marker);
        }

        if let Some(step) = &record.current_step {
            lines.push(Line { text: String::new(), tone: Tone::Body });
            self.recommendation_lines(step, wrap_width, &mut lines);
        }

        self.frame(record.kind, &header, &lines)
    }

    fn header(&self, record: &ThoughtRecord) -> String {
        let context = match record.kind {
            ThoughtKind::Standard => String::new(),
            ThoughtKind::Revision => format!(
                " (revising thought {})",
                record.revises_thought.map(|n| n.to_string()).unwrap_or_default()
            ),
            ThoughtKind::Branch => format!(
                " (from thought {}, ID: {})",
                record.branch_from_thought.map(|n| n.to_string()).unwrap_or_default(),
                record.branch_id.as_deref().unwrap_or_default()
            ),
        };
        let label = format!(
            "{} {}/{}{}",
            record.kind.label(),
            record.thought_number,
            record.total_thoughts,
            context
        );
        match self.style {
            DisplayStyle::Rich => {
                let icon = match record.kind {
                    ThoughtKind::Standard => "💭",
                    ThoughtKind::Revision => "🔄",
                    ThoughtKind::Branch => "🌿",
                };
                format!("{} {}", icon, label)
            }
            DisplayStyle::Plain => label,
        }
    }

    fn recommendation_lines(&self, step: &StepRecommendation, width: usize, lines: &mut Vec<Line>) {
        push_wrapped(lines, "Recommendation:", width, Tone::Heading);
        push_wrapped(lines, &format!("Step: {}", step.step_description), width, Tone::Heading);

        if !step.recommended_tools.is_empty() {
            push_wrapped(lines, "Recommended Tools:", width, Tone::Tool);
        }
        for tool in &step.recommended_tools {
            let alternatives = match &tool.alternatives {
                Some(alts) if !alts.is_empty() => format!(" (alternatives: {})", alts.join(", ")),
                _ => String::new(),
            };
            push_wrapped(
                lines,
                &format!(
                    "  - {} (priority: {}, confidence: {:.2}){}",
                    tool.tool_name, tool.priority, tool.confidence, alternatives
                ),
                width,
                Tone::Tool,
            );
            push_wrapped(lines, &format!("    Rationale: {}", tool.rationale), width, Tone::Detail);
            if let Some(inputs) = &tool.suggested_inputs {
                let inputs = serde_json::Value::Object(inputs.clone());
                push_wrapped(lines, &format!("    Suggested inputs: {}", inputs), width, Tone::Detail);
            }
        }

        push_wrapped(lines, &format!("Expected Outcome: {}", step.expected_outcome), width, Tone::Outcome);

        if let Some(conditions) = step.next_step_conditions.as_ref().filter(|c| !c.is_empty()) {
            push_wrapped(lines, "Conditions for next step:", width, Tone::Condition);
            for condition in conditions {
                push_wrapped(lines, &format!("  - {}", condition), width, Tone::Condition);
            }
        }
    }

    fn frame(&self, kind: ThoughtKind, header: &str, lines: &[Line]) -> String {
        let header_width = header.width();
        let content_width = lines
            .iter()
            .map(|line| line.text.width())
            .max()
            .unwrap_or(0)
            .max(header_width + 1);
        // between the corners: one space of padding each side
        let span = content_width + 2;
        let fill = span - (header_width + 3);

        let (top_left, top_right, bottom_left, bottom_right, horizontal, vertical) = match self.style {
            DisplayStyle::Rich => ("╭", "╮", "╰", "╯", "─", "│"),
            DisplayStyle::Plain => ("+", "+", "+", "+", "-", "|"),
        };

        let mut out = Vec::with_capacity(lines.len() + 2);
        out.push(format!(
            "{}{} {} {}{}",
            self.border(kind, top_left),
            self.border(kind, horizontal),
            self.title(kind, header),
            self.border(kind, &horizontal.repeat(fill)),
            self.border(kind, top_right)
        ));
        for line in lines {
            let pad = " ".repeat(content_width - line.text.width());
            out.push(format!(
                "{} {}{} {}",
                self.border(kind, vertical),
                self.tone(line),
                pad,
                self.border(kind, vertical)
            ));
        }
        out.push(format!(
            "{}{}{}",
            self.border(kind, bottom_left),
            self.border(kind, &horizontal.repeat(span)),
            self.border(kind, bottom_right)
        ));
        out.join("\n")
    }

    fn kind_color(kind: ThoughtKind) -> Color {
        match kind {
            ThoughtKind::Standard => Color::Blue,
            ThoughtKind::Revision => Color::Yellow,
            ThoughtKind::Branch => Color::Green,
        }
    }

    fn border(&self, kind: ThoughtKind, text: &str) -> String {
        match self.style {
            DisplayStyle::Rich => text.color(Self::kind_color(kind)).to_string(),
            DisplayStyle::Plain => text.to_string(),
        }
    }

    fn title(&self, kind: ThoughtKind, text: &str) -> String {
        match self.style {
            DisplayStyle::Rich => text.color(Self::kind_color(kind)).bold().to_string(),
            DisplayStyle::Plain => text.to_string(),
        }
    }

    fn tone(&self, line: &Line) -> String {
        if self.style == DisplayStyle::Plain {
            return line.text.clone();
        }
        let text = line.text.as_str();
        match line.tone {
            Tone::Body => text.white().to_string(),
            Tone::Context => text.dimmed().to_string(),
            Tone::Marker => text.bright_cyan().to_string(),
            Tone::Heading => text.bright_magenta().bold().to_string(),
            Tone::Tool => text.blue().to_string(),
            Tone::Detail => text.blue().dimmed().to_string(),
            Tone::Outcome => text.green().bold().to_string(),
            Tone::Condition => text.yellow().to_string(),
        }
    }
}

fn push_wrapped(lines: &mut Vec<Line>, text: &str, width: usize, tone: Tone) {
    for line in wrap(text, width) {
        lines.push(Line { text: line, tone });
    }
}

/// First line of a thought, shortened for context lines
fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        flat
    }
}

/// Greedy word wrap by display width. Blank lines survive; words wider than
/// the box are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut wrapped = Vec::new();

    for line in text.lines() {
        let mut current = String::new();
        for word in line.split_whitespace() {
            for piece in split_long_word(word, width) {
                let needed = if current.is_empty() {
                    piece.width()
                } else {
                    current.width() + 1 + piece.width()
                };
                if needed <= width {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(&piece);
                } else {
                    wrapped.push(std::mem::take(&mut current));
                    current = piece;
                }
            }
        }
        wrapped.push(current);
    }

    if wrapped.is_empty() {
        wrapped.push(String::new());
    }
    wrapped
}

fn split_long_word(word: &str, width: usize) -> Vec<String> {
    if word.width() <= width {
        return vec![word.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        let candidate_width = current.width() + ch.width().unwrap_or(0);
        if candidate_width > width && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Out-of-band destination for rendered thoughts
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySink: Send + Sync {
    fn emit(&self, rendered: &str) -> std::io::Result<()>;
}

/// Writes to stderr so stdout stays free for the MCP transport
#[derive(Debug, Default)]
pub struct StderrSink;

impl DisplaySink for StderrSink {
    fn emit(&self, rendered: &str) -> std::io::Result<()> {
        let mut err = std::io::stderr().lock();
        writeln!(err, "{}", rendered)?;
        err.flush()
    }
}

/// Drops everything; used when display is disabled
#[derive(Debug, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn emit(&self, _rendered: &str) -> std::io::Result<()> {
        Ok(())
    }
}
