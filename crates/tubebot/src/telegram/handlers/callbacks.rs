use teloxide::prelude::*;
use tubecore::DownloadJob;

use super::types::{chat_user, HandlerDeps, HandlerError};
use crate::telegram::callback::CallbackAction;
use crate::telegram::keyboard::options_keyboard;
use crate::telegram::markdown::edit_markdown;
use crate::telegram::messages::{
    cancelled_text, download_failure_text, downloading_text, expired_text, options_text, sent_text,
};
use crate::telegram::transport::TelegramTransport;

pub(super) async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let (chat_id, message_id) = (message.chat().id, message.id());

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        log::warn!("Unknown callback data: {:?}", q.data);
        edit_markdown(bot, chat_id, message_id, expired_text(), None).await?;
        return Ok(());
    };

    match &action {
        CallbackAction::Cancel => {
            edit_markdown(bot, chat_id, message_id, cancelled_text(), None).await?;
        }
        CallbackAction::ShowOptions { video_id, kind } => match deps.flow.options(video_id).await {
            Ok(catalog) => {
                edit_markdown(
                    bot,
                    chat_id,
                    message_id,
                    options_text(&catalog, *kind),
                    Some(options_keyboard(&catalog, *kind)),
                )
                .await?;
            }
            Err(e) => {
                log::warn!("Could not rebuild catalog for {}: {}", video_id, e);
                edit_markdown(bot, chat_id, message_id, download_failure_text(&e), None).await?;
            }
        },
        CallbackAction::Download { video_id, .. } => {
            let Some(option) = action.stream_option() else {
                return Ok(());
            };
            let user = chat_user(Some(&q.from));
            edit_markdown(bot, chat_id, message_id, downloading_text(&option), None).await?;

            let job = DownloadJob::new(video_id.clone(), option, user.id);
            let transport = TelegramTransport::new(bot.clone(), chat_id, message_id);
            // Failures were already rendered into the status message by the flow
            if deps.flow.download(&transport, &job).await.is_ok() {
                edit_markdown(bot, chat_id, message_id, sent_text(), None).await?;
            }
        }
    }
    Ok(())
}
