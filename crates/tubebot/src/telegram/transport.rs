//! Telegram implementation of the flow's [`Transport`]
//!
//! One transport per status message: catalogs and failures replace its text,
//! finished files go to the same chat as new audio/video messages.

use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};
use tubecore::{DownloadError, MediaKind, StreamOption, Transport, VideoCatalog};

use crate::telegram::keyboard::kind_keyboard;
use crate::telegram::markdown::edit_markdown;
use crate::telegram::messages::{catalog_text, delivery_caption, download_failure_text};

pub struct TelegramTransport {
    bot: Bot,
    chat_id: ChatId,
    status_message: MessageId,
}

impl TelegramTransport {
    pub fn new(bot: Bot, chat_id: ChatId, status_message: MessageId) -> Self {
        Self {
            bot,
            chat_id,
            status_message,
        }
    }
}

fn delivery_error(e: teloxide::RequestError) -> DownloadError {
    DownloadError::DeliveryFailed(e.to_string())
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn render(&self, catalog: &VideoCatalog) -> Result<(), DownloadError> {
        edit_markdown(
            &self.bot,
            self.chat_id,
            self.status_message,
            catalog_text(catalog),
            Some(kind_keyboard(&catalog.video_id)),
        )
        .await
        .map_err(delivery_error)
    }

    async fn render_failure(&self, error: &DownloadError) -> Result<(), DownloadError> {
        edit_markdown(
            &self.bot,
            self.chat_id,
            self.status_message,
            download_failure_text(error),
            None,
        )
        .await
        .map_err(delivery_error)
    }

    async fn deliver_file(&self, path: &Path, title: &str, option: &StreamOption) -> Result<(), DownloadError> {
        let caption = delivery_caption(title, option);
        let file = InputFile::file(path.to_path_buf());
        log::info!("Uploading {} to chat {}", path.display(), self.chat_id);

        match option.kind {
            MediaKind::Audio => self
                .bot
                .send_audio(self.chat_id, file)
                .caption(caption)
                .title(title.to_string())
                .await
                .map(|_| ())
                .map_err(delivery_error),
            MediaKind::Video => self
                .bot
                .send_video(self.chat_id, file)
                .caption(caption)
                .supports_streaming(true)
                .await
                .map(|_| ())
                .map_err(delivery_error),
        }
    }
}
