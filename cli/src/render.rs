use amie_core::{AppEvent, ContentBlock, Message, Role, ToolInput};
use std::io::Write;
use tokio::sync::mpsc;

const RESULT_PREVIEW_CHARS: usize = 200;

/// Prints conversation snapshots incrementally.
///
/// Tracks how many bytes of each block were already written so a snapshot
/// only prints what changed since the previous one.
#[derive(Debug, Default)]
pub struct Printer {
    printed: Vec<Vec<usize>>,
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the difference between `messages` and what was printed before
    pub fn render(&mut self, messages: &[Message], out: &mut impl Write) -> std::io::Result<()> {
        if messages.len() < self.printed.len() {
            self.printed.truncate(messages.len());
        }

        for (index, message) in messages.iter().enumerate() {
            if index == self.printed.len() {
                self.printed.push(Vec::new());
            }
            let printed = &mut self.printed[index];
            let blocks = message.blocks();

            for (block_index, block) in blocks.iter().enumerate() {
                if block_index == printed.len() {
                    printed.push(0);
                }
                let done = &mut printed[block_index];
                match block {
                    ContentBlock::Text { text } if message.role == Role::Assistant => {
                        if *done == 0 && !text.is_empty() {
                            write!(out, "\nAmie: ")?;
                        }
                        if let Some(fresh) = text.get(*done..) {
                            write!(out, "{}", fresh)?;
                        }
                        *done = text.len();
                    }
                    ContentBlock::ToolUse { name, input, .. } => {
                        if *done == 0 {
                            if let ToolInput::Resolved(value) = input {
                                write!(out, "\n  tool: {}({})", name, value)?;
                                *done = 1;
                            }
                        }
                    }
                    ContentBlock::ToolResult { content, is_error, .. } => {
                        if *done == 0 {
                            let label = if *is_error { "error" } else { "result" };
                            writeln!(out, "\n  {}: {}", label, preview(content))?;
                            *done = 1;
                        }
                    }
                    ContentBlock::Text { .. } => {}
                }
            }
        }

        out.flush()
    }
}

fn preview(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default();
    let mut shown: String = first_line.chars().take(RESULT_PREVIEW_CHARS).collect();
    if shown.len() < content.len() {
        shown.push_str(" ...");
    }
    shown
}

/// Consume session events until the bus closes, signalling `turn_done`
/// whenever a turn ends.
pub async fn run_printer(mut events: mpsc::UnboundedReceiver<AppEvent>, turn_done: mpsc::UnboundedSender<()>) {
    let mut printer = Printer::new();
    let mut stdout = std::io::stdout();

    while let Some(event) = events.recv().await {
        match event {
            AppEvent::Snapshot(messages) => {
                if let Err(e) = printer.render(&messages, &mut stdout) {
                    tracing::warn!(error = %e, "failed to write to stdout");
                }
            }
            AppEvent::ToolEnd { name, ok: false, duration_ms, .. } => {
                tracing::debug!(tool = %name, duration_ms, "tool reported an error");
            }
            AppEvent::TurnCompleted { .. } => {
                println!();
                let _ = turn_done.send(());
            }
            AppEvent::TurnFailed { message } => {
                println!("\nError: {}", message);
                let _ = turn_done.send(());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amie_core::ContentBlock;
    use serde_json::json;

    fn render_to_string(printer: &mut Printer, messages: &[Message]) -> String {
        let mut buf = Vec::new();
        printer.render(messages, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_is_printed_incrementally() {
        let mut printer = Printer::new();
        let user = Message::user("hi".to_string());

        let partial = Message::assistant(vec![ContentBlock::Text { text: "Hel".to_string() }]);
        let out = render_to_string(&mut printer, &[user.clone(), partial]);
        assert_eq!(out, "\nAmie: Hel");

        let full = Message::assistant(vec![ContentBlock::Text { text: "Hello".to_string() }]);
        let out = render_to_string(&mut printer, &[user, full]);
        assert_eq!(out, "lo");
    }

    #[test]
    fn test_tool_call_waits_for_resolved_input() {
        let mut printer = Printer::new();
        let pending = Message::assistant(vec![ContentBlock::ToolUse {
            id: "t1".to_string(),
            name: "read_file".to_string(),
            input: ToolInput::Pending("{\"pa".to_string()),
        }]);
        assert_eq!(render_to_string(&mut printer, &[pending]), "");

        let resolved = Message::assistant(vec![ContentBlock::ToolUse {
            id: "t1".to_string(),
            name: "read_file".to_string(),
            input: ToolInput::Resolved(json!({"path": "a.txt"})),
        }]);
        let result = Message::tool_result("t1", "contents\nmore".to_string(), false);
        let out = render_to_string(&mut printer, &[resolved, result]);
        assert_eq!(out, "\n  tool: read_file({\"path\":\"a.txt\"})\n  result: contents ...\n");
    }

    #[test]
    fn test_shorter_snapshot_resets_tracking() {
        let mut printer = Printer::new();
        let reply = Message::assistant(vec![ContentBlock::Text { text: "old".to_string() }]);
        render_to_string(&mut printer, &[reply]);

        assert_eq!(render_to_string(&mut printer, &[]), "");

        let reply = Message::assistant(vec![ContentBlock::Text { text: "new".to_string() }]);
        assert_eq!(render_to_string(&mut printer, &[reply]), "\nAmie: new");
    }
}
