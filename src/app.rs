//! Main window: URL form, format picker, downloads list and toasts.

use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{self, RichText, Visuals};
use eframe::{App, Frame};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::debug;

use crate::card::download_card;
use crate::config::AppConfig;
use crate::model::DownloadFormat;
use crate::notify::Notification;
use crate::orchestrator::{Orchestrator, Submission};
use crate::registry::{DownloadRegistry, RegistryEvent};
use crate::service::PrepareService;
use crate::toast::Toasts;
use crate::video_url::is_valid_url;

/// Application state for the GUI
pub struct EchoApp {
    /// Input field for the video URL
    url_input: String,
    /// Selected output format
    format: DownloadFormat,
    dark_mode: bool,
    /// Every download of this session
    registry: DownloadRegistry,
    orchestrator: Orchestrator,
    registry_events: broadcast::Receiver<RegistryEvent>,
    notifications: UnboundedReceiver<Notification>,
    toasts: Toasts,
}

impl EchoApp {
    pub fn new(config: &AppConfig, service: Arc<dyn PrepareService>, runtime: Handle) -> Self {
        let registry = DownloadRegistry::new();
        let registry_events = registry.subscribe();
        let (notify_tx, notifications) = unbounded_channel();
        let orchestrator = Orchestrator::new(service, runtime, config.orchestrator_options(), notify_tx);

        Self {
            url_input: String::new(),
            format: config.default_format,
            dark_mode: config.dark_mode,
            registry,
            orchestrator,
            registry_events,
            notifications,
            toasts: Toasts::new(config.toast_duration()),
        }
    }

    fn submit(&mut self) {
        match self.orchestrator.submit(&mut self.registry, &self.url_input, self.format) {
            // Cleared right away; the record keeps the URL
            Ok(Submission::Started(_)) => self.url_input.clear(),
            Ok(Submission::Busy) => {}
            // Already reported through a toast
            Err(_) => {}
        }
    }

    fn header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("EchoDownloader");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let icon = if self.dark_mode { "☀" } else { "🌙" };
                    if ui.button(icon).on_hover_text("Toggle theme").clicked() {
                        self.dark_mode = !self.dark_mode;
                        let visuals = if self.dark_mode { Visuals::dark() } else { Visuals::light() };
                        ctx.set_visuals(visuals);
                    }
                });
            });
            ui.label("Paste a YouTube link, choose MP4 or MP3, and get a file ready to download.");
        });
    }

    fn form(&mut self, ui: &mut egui::Ui) {
        let busy = self.orchestrator.is_busy();

        let response = ui.add(
            egui::TextEdit::singleline(&mut self.url_input)
                .hint_text("Paste your YouTube URL here...")
                .desired_width(f32::INFINITY),
        );
        let pressed_enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        let mut clicked = false;
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.format, DownloadFormat::Video, "🎬 MP4");
            ui.selectable_value(&mut self.format, DownloadFormat::Audio, "🎵 MP3");

            let label = if busy { "Processing..." } else { "⬇ Download" };
            let enabled = is_valid_url(&self.url_input) && !busy;
            clicked = ui.add_enabled(enabled, egui::Button::new(label)).clicked();
        });

        if clicked || pressed_enter {
            self.submit();
        }
    }

    fn downloads(&mut self, ui: &mut egui::Ui) {
        if self.registry.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.label(RichText::new("No active downloads").strong());
                ui.label("Your downloads will appear here once you start them.");
            });
            return;
        }

        ui.heading(format!("Downloads ({})", self.registry.len()));
        let mut to_cancel = vec![];
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for record in self.registry.list() {
                    if download_card(ui, record) {
                        to_cancel.push(record.id());
                    }
                    ui.add_space(8.0);
                }
            });

        // Applied after drawing so the list is not borrowed
        for id in to_cancel {
            self.orchestrator.cancel(&mut self.registry, id);
        }
    }
}

/// Logs pending registry changes and returns how many arrived.
fn drain_registry_events(events: &mut broadcast::Receiver<RegistryEvent>) -> usize {
    let mut changed = 0;
    loop {
        match events.try_recv() {
            Ok(event) => {
                debug!(?event, "registry changed");
                changed += 1;
            }
            // Missed events still mean the list changed
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => changed += skipped as usize,
            Err(_) => break,
        }
    }
    changed
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for EchoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 1️⃣ Apply finished requests
        self.orchestrator.poll(&mut self.registry);

        // 2️⃣ Collect toasts and registry changes
        while let Ok(notification) = self.notifications.try_recv() {
            self.toasts.push(notification);
        }
        if drain_registry_events(&mut self.registry_events) > 0 {
            ctx.request_repaint();
        }

        // 3️⃣ Header with theme toggle
        self.header(ctx);

        // 4️⃣ Main panel: form and downloads list
        egui::CentralPanel::default().show(ctx, |ui| {
            self.form(ui);
            ui.separator();
            self.downloads(ui);
        });

        self.toasts.show(ctx);

        // Request periodic repaint so responses show up without input
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
