use std::collections::VecDeque;
use std::time::{Duration, Instant};

use eframe::egui::{self, Align2, Color32, RichText};

use crate::notify::{Notification, NotificationLevel};

const MAX_VISIBLE: usize = 5;

struct Toast {
    id: u64,
    notification: Notification,
    shown_at: Instant,
}

/// Transient notifications stacked in the bottom-right corner
pub struct Toasts {
    entries: VecDeque<Toast>,
    lifetime: Duration,
    next_id: u64,
}

impl Toasts {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            lifetime,
            next_id: 0,
        }
    }

    /// Oldest toasts make room once more than a handful are showing.
    pub fn push(&mut self, notification: Notification) {
        self.next_id += 1;
        self.entries.push_back(Toast {
            id: self.next_id,
            notification,
            shown_at: Instant::now(),
        });
        while self.entries.len() > MAX_VISIBLE {
            self.entries.pop_front();
        }
    }

    fn expire(&mut self, now: Instant) {
        let lifetime = self.lifetime;
        self.entries
            .retain(|toast| now.saturating_duration_since(toast.shown_at) < lifetime);
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        self.expire(Instant::now());
        if self.entries.is_empty() {
            return;
        }

        let mut dismissed = None;
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(Align2::RIGHT_BOTTOM, [-12.0, -12.0])
            .show(ctx, |ui| {
                for toast in &self.entries {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_max_width(320.0);
                        ui.horizontal(|ui| {
                            ui.vertical(|ui| {
                                let title = RichText::new(&toast.notification.title)
                                    .strong()
                                    .color(level_color(toast.notification.level));
                                ui.label(title);
                                ui.label(&toast.notification.description);
                            });
                            if ui.small_button("✖").clicked() {
                                dismissed = Some(toast.id);
                            }
                        });
                    });
                    ui.add_space(6.0);
                }
            });

        if let Some(id) = dismissed {
            self.entries.retain(|toast| toast.id != id);
        }
    }
}

fn level_color(level: NotificationLevel) -> Color32 {
    match level {
        NotificationLevel::Info => Color32::from_rgb(96, 165, 250),
        NotificationLevel::Success => Color32::from_rgb(45, 212, 191),
        NotificationLevel::Error => Color32::from_rgb(248, 113, 113),
    }
}
