use teloxide::prelude::*;
use tubecore::Transport;

use super::types::{chat_user, HandlerDeps, HandlerError};
use crate::telegram::markdown::{edit_markdown, send_markdown};
use crate::telegram::messages::{fetching_text, flow_failure_text};
use crate::telegram::transport::TelegramTransport;

/// Any non-command text is treated as a link to inspect.
pub(super) async fn handle_link_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user = chat_user(msg.from.as_ref());
    deps.flow.register_user(&user);

    let status = send_markdown(bot, msg.chat.id, fetching_text(), None).await?;

    match deps.flow.inspect(user.id, text).await {
        Ok(catalog) => {
            let transport = TelegramTransport::new(bot.clone(), msg.chat.id, status.id);
            transport.render(&catalog).await?;
        }
        Err(failure) => {
            log::info!("Link from {} rejected: {}", user.id, failure);
            edit_markdown(bot, msg.chat.id, status.id, flow_failure_text(&failure), None).await?;
        }
    }
    Ok(())
}
