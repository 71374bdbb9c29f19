use teloxide::prelude::*;
use tubecore::storage::Action;

use super::types::{chat_user, HandlerDeps, HandlerError};
use crate::telegram::markdown::send_markdown;
use crate::telegram::messages::{help_text, no_access_text, stats_text, welcome_text};

pub(super) async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = chat_user(msg.from.as_ref());
    deps.flow.register_user(&user);
    deps.flow.log_command(user.id, Action::Start);

    send_markdown(bot, msg.chat.id, welcome_text(user.first_name.as_deref()), None).await?;
    Ok(())
}

pub(super) async fn handle_help_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = chat_user(msg.from.as_ref());
    deps.flow.log_command(user.id, Action::Help);

    send_markdown(bot, msg.chat.id, help_text(), None).await?;
    Ok(())
}

/// Admin-only usage report
pub(super) async fn handle_stats_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = chat_user(msg.from.as_ref());
    if !deps.is_admin(user.id) {
        log::warn!("User {} requested /stats without admin rights", user.id);
        send_markdown(bot, msg.chat.id, no_access_text(), None).await?;
        return Ok(());
    }
    deps.flow.log_command(user.id, Action::Stats);

    let stats = deps.flow.stats()?;
    send_markdown(bot, msg.chat.id, stats_text(&stats), None).await?;
    Ok(())
}
