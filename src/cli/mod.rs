use clap::{ Parser, Subcommand };
use crate::locale::Locale;
use crate::transport::ResponseMode;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    // --- Chat Backend Args ---
    /// Base URL of the chat backend (e.g., http://127.0.0.1:3000)
    #[arg(long, env = "CHAT_BASE_URL", default_value = "http://127.0.0.1:3000")]
    pub base_url: String,

    /// Response mode: stream (incremental text) or batch (single JSON payload)
    #[arg(long, env = "CHAT_MODE", default_value = "stream")]
    pub mode: ResponseMode,

    /// Route used in stream mode.
    #[arg(long, env = "CHAT_STREAM_ROUTE", default_value = "/api/chat")]
    pub stream_route: String,

    /// Route used in batch mode.
    #[arg(long, env = "CHAT_BATCH_ROUTE", default_value = "/api/chatMock")]
    pub batch_route: String,

    // --- History Store Args ---
    /// History store type (file, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "file")]
    pub history_type: String,

    /// Directory holding the persisted conversation.
    #[arg(long, env = "HISTORY_DIR", default_value = ".chat-widget")]
    pub history_dir: String,

    /// Storage key; the conversation is written to <history-dir>/<key>.json
    #[arg(long, env = "STORAGE_KEY", default_value = "chatMessages")]
    pub storage_key: String,

    // --- General App Args ---
    /// Interface language (fa, en)
    #[arg(long, env = "CHAT_LOCALE", default_value = "fa")]
    pub locale: Locale,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a local echo backend exposing the stream and batch routes.
    Serve {
        /// Host address and port for the backend to listen on.
        #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
        addr: String,

        /// Delay between streamed chunks, in milliseconds.
        #[arg(long, env = "CHUNK_DELAY_MS", default_value = "40")]
        chunk_delay_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_widget_backend() {
        let args = Args::try_parse_from(["chat-widget"]).unwrap();
        assert_eq!(args.mode, ResponseMode::Stream);
        assert_eq!(args.locale, Locale::Fa);
        assert_eq!(args.stream_route, "/api/chat");
        assert_eq!(args.batch_route, "/api/chatMock");
        assert!(args.command.is_none());
    }

    #[test]
    fn parses_serve_subcommand() {
        let args = Args::try_parse_from([
            "chat-widget",
            "--mode",
            "batch",
            "serve",
            "--addr",
            "0.0.0.0:8080",
        ]).unwrap();
        assert_eq!(args.mode, ResponseMode::Batch);
        match args.command {
            Some(Command::Serve { addr, .. }) => assert_eq!(addr, "0.0.0.0:8080"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Args::try_parse_from(["chat-widget", "--mode", "carrier-pigeon"]).is_err());
    }
}
