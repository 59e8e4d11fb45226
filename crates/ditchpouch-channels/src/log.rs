//! Log-only channel: writes every outbound message to the tracing log.
//! Used when WhatsApp isn't configured and by the CLI.

use async_trait::async_trait;
use ditchpouch_core::error::Result;
use ditchpouch_core::traits::Channel;
use ditchpouch_core::types::Outbound;

#[derive(Debug, Default)]
pub struct LogChannel;

impl LogChannel {
    pub fn new() -> Self {
        Self
    }
}

/// Plain-text rendering of an outbound message.
pub fn render(message: &Outbound) -> String {
    match message {
        Outbound::PlainText { body } => body.clone(),
        Outbound::ChoiceList { prompt, options } => {
            let rows: Vec<String> = options.iter().map(|o| format!("  • {} [{}]", o.label, o.id)).collect();
            format!("{prompt}\n{}", rows.join("\n"))
        }
        Outbound::ButtonPrompt { prompt, buttons } => {
            let labels: Vec<String> = buttons.iter().map(|b| format!("[{}]", b.label)).collect();
            format!("{prompt}\n{}", labels.join(" "))
        }
    }
}

#[async_trait]
impl Channel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &Outbound) -> Result<()> {
        tracing::info!("📨 {}", render(message));
        Ok(())
    }
}
