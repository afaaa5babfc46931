use rfd::{MessageButtons, MessageDialog, MessageLevel};

/// Modal dialogs the orchestrator needs from the UI.
pub trait Surface {
    fn show_error(&mut self, title: &str, message: &str);
    fn show_info(&mut self, title: &str, message: &str);
    /// Returns true when the user chose to retry.
    fn ask_retry(&mut self, title: &str, message: &str) -> bool;
}

/// Native message boxes. They block the UI thread until dismissed.
pub struct NativeDialogs;

impl Surface for NativeDialogs {
    fn show_error(&mut self, title: &str, message: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn show_info(&mut self, title: &str, message: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn ask_retry(&mut self, title: &str, message: &str) -> bool {
        // OK stands in for "Retry".
        MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::OkCancel)
            .show()
    }
}
