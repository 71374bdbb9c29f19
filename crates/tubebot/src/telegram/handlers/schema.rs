//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::callbacks::handle_callback;
use super::commands::{handle_help_command, handle_start_command, handle_stats_command};
use super::errors::notify_on_error;
use super::links::handle_link_message;
use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::markdown::send_markdown;
use crate::telegram::messages::try_later_text;

/// Creates the dispatcher schema: commands first, then plain text, then button presses.
///
/// Every branch answers a failed handler with a "try again later" message.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(message_handler(deps.clone()))
        .branch(callback_handler(deps))
}

/// Plain text that should be inspected as a link; unknown `/commands` are ignored.
fn is_link_candidate(text: &str) -> bool {
    !text.trim_start().starts_with('/')
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                let result = match cmd {
                    Command::Start => handle_start_command(&bot, &msg, &deps).await,
                    Command::Help => handle_help_command(&bot, &msg, &deps).await,
                    Command::Stats => handle_stats_command(&bot, &msg, &deps).await,
                };
                notify_on_error(result, || send_markdown(&bot, msg.chat.id, try_later_text(), None)).await
            }
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some_and(is_link_candidate))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let result = handle_link_message(&bot, &msg, &deps).await;
                notify_on_error(result, || send_markdown(&bot, msg.chat.id, try_later_text(), None)).await
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let result = handle_callback(&bot, &q, &deps).await;
            // Button presses come from private chats, so the sender id is the chat id
            let chat_id = q
                .message
                .as_ref()
                .map(|m| m.chat().id)
                .unwrap_or_else(|| ChatId::from(q.from.id));
            notify_on_error(result, || send_markdown(&bot, chat_id, try_later_text(), None)).await
        }
    })
}
