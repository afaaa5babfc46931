//! Desktop front end that turns a video link into an MP3 or MP4 with yt-dlp

// Engine parameter set built from the user's choices
mod config;
// Native modal dialogs
mod dialogs;
// External downloader spawning logic (yt-dlp)
mod downloader;
// Validation and engine error types
mod error;
// Subscriber setup for tracing
mod logging;
// Session state and the enums behind it
mod model;
// Single-flight start, outcome handling and reset
mod orchestrator;
// Progress parsing and relay
mod progress;

use dialogs::NativeDialogs;
use downloader::YtDlp;
use model::{FormatKind, Resolution, Session, StatusTone};
use orchestrator::{DownloadHandle, Orchestrator};

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{Color32, RichText, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use std::{sync::Arc, time::Duration};
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info};

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: initializes logging and the runtime, then launches the GUI
fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let rt = RUNTIME.get_or_try_init(|| Runtime::new().map(Arc::new))?;
    let handle = rt.handle().clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([600.0, 550.0])
            .with_resizable(false),
        ..Default::default()
    };

    eframe::run_native(
        "Modern YouTube Downloader",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(ConverterApp::new(YtDlp::locate(), handle))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to open the window: {err}"))
}

/// Application state for the GUI
struct ConverterApp {
    /// Everything the widgets show and edit
    session: Session,
    /// Starts downloads and applies their reports
    orchestrator: Orchestrator<YtDlp>,
    /// Modal dialogs
    dialogs: NativeDialogs,
    /// Background task of the running download, if any
    current: Option<DownloadHandle>,
}

impl ConverterApp {
    fn new(engine: YtDlp, runtime: Handle) -> Self {
        Self {
            session: Session::default(),
            orchestrator: Orchestrator::new(engine, runtime),
            dialogs: NativeDialogs,
            current: None,
        }
    }
}

fn tone_color(tone: StatusTone) -> Color32 {
    match tone {
        StatusTone::Neutral => Color32::WHITE,
        StatusTone::Working => Color32::from_rgb(255, 165, 0),
        StatusTone::Success => Color32::from_rgb(0x2C, 0xC9, 0x85),
        StatusTone::Error => Color32::RED,
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 1. Apply worker reports. A finished task has already posted its outcome.
        let finished = self.current.as_ref().is_some_and(DownloadHandle::is_finished);
        if let Some(outcome) = self.orchestrator.pump(&mut self.session, &mut self.dialogs) {
            debug!(?outcome, "run ended");
        }
        if finished {
            self.current = None;
        }

        let running = self.session.in_progress();
        let video = self.session.format_kind == FormatKind::Video;

        // 2. Single panel: link, format, resolution, folder, progress and actions
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(20.0);
                ui.label(RichText::new("YouTube to MP3/MP4").size(24.0).strong());
                ui.add_space(10.0);

                ui.add(
                    egui::TextEdit::singleline(&mut self.session.url)
                        .hint_text("Paste YouTube Link Here...")
                        .desired_width(450.0),
                );
                ui.add_space(10.0);

                ui.label(RichText::new("Select Format:").size(14.0));
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.session.format_kind, FormatKind::Video, "MP4 (Video)");
                    ui.radio_value(&mut self.session.format_kind, FormatKind::Audio, "MP3 (Audio)");
                });
                ui.add_space(10.0);

                // Resolution only matters for video
                ui.add_enabled_ui(video, |ui| {
                    egui::ComboBox::from_id_source("resolution")
                        .selected_text(self.session.resolution.to_string())
                        .show_ui(ui, |ui| {
                            for r in Resolution::ALL {
                                ui.selectable_value(&mut self.session.resolution, r, r.to_string());
                            }
                        });
                });
                ui.add_space(10.0);

                if ui
                    .add(egui::Button::new("Choose Save Folder").fill(Color32::from_gray(0x55)))
                    .clicked()
                {
                    let mut dialog = FileDialog::new();
                    if let Some(current) = &self.session.destination {
                        dialog = dialog.set_directory(current);
                    }
                    if let Some(folder) = dialog.pick_folder() {
                        info!(folder = %folder.display(), "destination chosen");
                        self.session.destination = Some(folder);
                    }
                }
                let folder_color = if self.session.destination.is_some() {
                    Color32::WHITE
                } else {
                    Color32::GRAY
                };
                ui.label(
                    RichText::new(self.session.destination_label())
                        .size(12.0)
                        .color(folder_color),
                );
                ui.add_space(20.0);

                ui.add(egui::ProgressBar::new(self.session.progress).desired_width(400.0));
                ui.label(
                    RichText::new(&self.session.status)
                        .size(12.0)
                        .color(tone_color(self.session.tone)),
                );
                ui.add_space(20.0);

                ui.horizontal(|ui| {
                    let download = egui::Button::new(
                        RichText::new(&self.session.action_label).size(16.0).strong(),
                    )
                    .min_size(egui::vec2(150.0, 40.0));
                    if ui.add_enabled(self.session.action_enabled(), download).clicked() {
                        if let Ok(handle) = self.orchestrator.start(&mut self.session, &mut self.dialogs) {
                            self.current = Some(handle);
                        }
                    }

                    let next = egui::Button::new("Next Convert")
                        .fill(Color32::from_rgb(0xDB, 0x3E, 0x39))
                        .min_size(egui::vec2(150.0, 40.0));
                    if ui.add_enabled(!running, next).clicked() {
                        orchestrator::reset(&mut self.session);
                    }
                });
            });
        });

        // Keep repainting while the worker may post progress
        if self.current.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
