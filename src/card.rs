use eframe::egui::{self, Color32, RichText};

use crate::model::{DownloadRecord, DownloadStatus};

const PROCESSING_BLUE: Color32 = Color32::from_rgb(96, 165, 250);
const READY_TEAL: Color32 = Color32::from_rgb(45, 212, 191);
const ERROR_RED: Color32 = Color32::from_rgb(248, 113, 113);
const CANCELLED_GRAY: Color32 = Color32::from_rgb(156, 163, 175);

/// Status text and colour shown on a card
pub fn status_line(status: &DownloadStatus) -> (&'static str, Color32) {
    match status {
        DownloadStatus::Processing => ("Processing...", PROCESSING_BLUE),
        DownloadStatus::Ready { .. } => ("Ready to Download", READY_TEAL),
        DownloadStatus::Error { .. } => ("Error", ERROR_RED),
        DownloadStatus::Cancelled => ("Cancelled", CANCELLED_GRAY),
    }
}

/// Draws one download. Returns true when its cancel button was clicked.
pub fn download_card(ui: &mut egui::Ui, record: &DownloadRecord) -> bool {
    let mut cancel = false;
    ui.group(|ui| {
        ui.set_width(ui.available_width());
        ui.label(RichText::new(record.title()).strong())
            .on_hover_text(record.source_url());

        ui.horizontal(|ui| {
            let (text, color) = status_line(record.status());
            if record.status().is_processing() {
                ui.spinner();
            }
            ui.label(RichText::new(text).color(color));
        });

        if let Some(message) = record.error_message() {
            ui.label(RichText::new(message).small().color(ERROR_RED));
        }

        ui.horizontal(|ui| {
            ui.monospace(record.format().label());
            if let Some(location) = record.result_location() {
                ui.hyperlink_to("⬇ Download Now", location);
            }
            if ui
                .add(egui::Button::new("❌").fill(Color32::RED))
                .on_hover_text("Cancel")
                .clicked()
            {
                cancel = true;
            }
        });
    });
    cancel
}
