use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tubecore::{MediaKind, VideoCatalog};

use crate::telegram::callback::CallbackAction;
use crate::telegram::messages::option_label;

fn cb(text: impl Into<String>, action: &CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_string())
}

fn cancel_row() -> Vec<InlineKeyboardButton> {
    vec![cb("❌ Cancel", &CallbackAction::Cancel)]
}

/// Audio / Video choice under a freshly built catalog
pub fn kind_keyboard(video_id: &str) -> InlineKeyboardMarkup {
    let show = |kind| CallbackAction::ShowOptions {
        video_id: video_id.to_string(),
        kind,
    };
    InlineKeyboardMarkup::new(vec![
        vec![
            cb("🎵 Audio", &show(MediaKind::Audio)),
            cb("🎬 Video", &show(MediaKind::Video)),
        ],
        cancel_row(),
    ])
}

/// One button per option of `kind`, in catalog order, plus Cancel
pub fn options_keyboard(catalog: &VideoCatalog, kind: MediaKind) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = catalog
        .options(kind)
        .iter()
        .map(|option| vec![cb(option_label(option), &CallbackAction::download(&catalog.video_id, option))])
        .collect();
    rows.push(cancel_row());
    InlineKeyboardMarkup::new(rows)
}
