use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};

fn is_markdown_parse_error(err: &RequestError) -> bool {
    err.to_string().to_lowercase().contains("can't parse entities")
}

/// Send a MarkdownV2 message, falling back to plain text on parse errors.
pub async fn send_markdown(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> ResponseResult<Message> {
    let text = text.into();
    let mut req = bot.send_message(chat_id, text.clone()).parse_mode(ParseMode::MarkdownV2);
    if let Some(kb) = keyboard.clone() {
        req = req.reply_markup(kb);
    }

    match req.await {
        Ok(msg) => Ok(msg),
        Err(e) if is_markdown_parse_error(&e) => {
            log::warn!("MarkdownV2 rejected, sending plain text: {}", e);
            let mut retry = bot.send_message(chat_id, text);
            if let Some(kb) = keyboard {
                retry = retry.reply_markup(kb);
            }
            retry.await
        }
        Err(e) => Err(e),
    }
}

/// Replace the text (and keyboard) of a bot message.
///
/// Without a keyboard the old one is removed. "Message is not modified" is not an error.
pub async fn edit_markdown(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> ResponseResult<()> {
    let text = text.into();
    let keyboard = keyboard.unwrap_or_default();

    let result = bot
        .edit_message_text(chat_id, message_id, text.clone())
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboard.clone())
        .await;

    match result {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) if is_markdown_parse_error(&e) => {
            log::warn!("MarkdownV2 rejected, editing with plain text: {}", e);
            bot.edit_message_text(chat_id, message_id, text)
                .reply_markup(keyboard)
                .await
                .map(|_| ())
        }
        Err(e) => Err(e),
    }
}
