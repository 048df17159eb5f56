// User-facing reply texts

pub const GREETING: &str = "Hello! Send me a photo or a video and I will add your watermark to it.";

pub const HELP: &str = "How to use this bot:\n\
    1. Send a photo or a video.\n\
    2. Adjust the watermark from the menu if you like.\n\
    3. Press Confirm to get the watermarked file back.\n\n\
    Commands:\n\
    /settings - show your current watermark settings\n\
    /reset - restore the default settings\n\
    /help - show this message";

pub const PHOTO_RECEIVED: &str = "Photo received. Press Confirm to apply the watermark.";

pub const VIDEO_RECEIVED: &str =
    "Video received. Press Confirm to apply the watermark. Large videos can take a few minutes.";

pub const SEND_NEW_TEXT: &str = "Send the new watermark text (up to 50 characters).";

pub const FINISH_TEXT_FIRST: &str = "Please send the new watermark text first.";

pub const NOTHING_PENDING: &str = "Nothing to process. Send a photo or a video first.";

pub const CANCELLED: &str = "Cancelled.";

pub const SETTINGS_RESET: &str = "Settings restored to defaults.";

pub const UNKNOWN_ACTION: &str = "Unknown action.";

pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /help to see what I can do.";

pub const TEXT_HINT: &str =
    "Send a photo or a video to watermark it, or use /settings to see your watermark style.";

pub const PHOTO_CAPTION: &str = "Here is your watermarked photo.";

pub const VIDEO_CAPTION: &str = "Here is your watermarked video.";

pub fn text_updated(text: &str) -> String {
    format!("Watermark text set to \"{text}\".")
}

pub fn setting_updated(summary: &str) -> String {
    format!("Updated.\n\n{summary}")
}
