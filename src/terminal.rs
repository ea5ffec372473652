use chrono::Local;
use futures::StreamExt;
use log::{ debug, info };
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use crate::controller::{ ConversationController, TurnOutcome };
use crate::error::ChatError;
use crate::locale::Locale;
use crate::models::chat::{ ChatMessage, Conversation, Role };
use crate::models::event::ChatEvent;
use crate::transport::ResponseMode;

const TYPING_INDICATOR: &str = "...";

/// Turns controller events into terminal output. Streamed updates only print
/// the text that was not printed yet.
pub struct Renderer {
    locale: Locale,
    current: Option<(String, usize)>,
}

impl Renderer {
    pub fn new(locale: Locale) -> Self {
        Self { locale, current: None }
    }

    pub fn render(&mut self, event: &ChatEvent) -> Option<String> {
        match event {
            // Streamed text is its own indicator.
            ChatEvent::TypingStarted(ResponseMode::Stream) => None,
            ChatEvent::TypingStarted(ResponseMode::Batch) => Some(format!("{}\n", TYPING_INDICATOR)),
            ChatEvent::TypingStopped => {
                self.current = None;
                Some("\n".to_string())
            }
            ChatEvent::MessageAppended(message) if message.role == Role::User => None,
            ChatEvent::MessageAppended(message) => {
                self.current = Some((message.id.clone(), message.content.len()));
                Some(format!("{}: {}", self.locale.assistant_name(), message.content))
            }
            ChatEvent::MessageUpdated(message) => {
                let (id, printed) = self.current.as_mut()?;
                if *id != message.id {
                    return None;
                }
                let delta = message.content.get(*printed..)?.to_string();
                *printed = message.content.len();
                Some(delta)
            }
            ChatEvent::Cleared => {
                self.current = None;
                Some(format!("{}\n{}\n", self.locale.greeting(), self.locale.start_hint()))
            }
        }
    }

    pub fn history(&self, conversation: &Conversation) -> String {
        if conversation.is_empty() {
            return format!("{}\n{}\n", self.locale.greeting(), self.locale.start_hint());
        }
        conversation
            .messages()
            .iter()
            .map(|message| self.line(message))
            .collect()
    }

    fn line(&self, message: &ChatMessage) -> String {
        let time = self.locale.format_time(&message.timestamp.with_timezone(&Local));
        match message.role {
            Role::User => format!("[{}] > {}\n", time, message.content),
            Role::Assistant =>
                format!("[{}] {}: {}\n", time, self.locale.assistant_name(), message.content),
        }
    }
}

fn print_flush(text: &str) {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

/// Interactive loop over stdin. Lines starting with `/` are commands:
/// `/mode stream|batch`, `/cancel`, `/clear`, `/quit`.
pub async fn run_terminal(
    controller: Arc<ConversationController>,
    events: mpsc::Receiver<ChatEvent>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let locale = controller.locale();
    let mut renderer = Renderer::new(locale);
    print_flush(&renderer.history(&controller.conversation().await));
    print_flush(&format!("({}: {})\n", locale.prompt_label(), controller.mode().await));

    let render_task = tokio::spawn(async move {
        let mut events = ReceiverStream::new(events);
        while let Some(event) = events.next().await {
            if let Some(text) = renderer.render(&event) {
                print_flush(&text);
            }
        }
        debug!("Renderer stopped");
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if let Some(command) = line.strip_prefix('/') {
            let mut parts = command.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("quit"), _) | (Some("exit"), _) => {
                    break;
                }
                (Some("cancel"), _) => {
                    if !controller.cancel().await {
                        print_flush("nothing to cancel\n");
                    }
                }
                (Some("clear"), _) => {
                    if let Err(e) = controller.clear().await {
                        print_flush(&format!("{}\n", e));
                    }
                }
                (Some("mode"), Some(mode)) =>
                    match mode.parse::<ResponseMode>() {
                        Ok(mode) =>
                            match controller.set_mode(mode).await {
                                Ok(()) => print_flush(&format!("mode: {}\n", mode)),
                                Err(_) => print_flush(&format!("{}\n", locale.busy_notice())),
                            }
                        Err(e) => print_flush(&format!("{}\n", e)),
                    }
                _ => print_flush("commands: /mode stream|batch, /cancel, /clear, /quit\n"),
            }
            continue;
        }

        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            match controller.submit(&line).await {
                Ok(TurnOutcome::Failed { reason }) => debug!("Turn failed: {}", reason),
                Ok(outcome) => debug!("Turn finished: {:?}", outcome),
                Err(ChatError::Busy) => print_flush(&format!("{}\n", locale.busy_notice())),
                Err(ChatError::Validation(_)) => {}
                Err(e) => debug!("Submission rejected: {}", e),
            }
        });
    }

    if controller.cancel().await {
        info!("Cancelled the in-flight reply on exit");
    }
    render_task.abort();
    Ok(())
}
