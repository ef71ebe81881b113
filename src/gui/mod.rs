//! Windowed form.
//!
//! Buttons and global hotkeys post to the same event queue. A worker thread
//! runs each event through the `App` and sends the reports back; the form
//! polls for them on every frame.

pub mod render;
pub mod state;

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use eframe::egui::{self, Vec2};

use crate::app::{App, Channel};
use crate::config::SettingsInput;
use crate::events::{self, Event, EventReceiver, EventSender};
use crate::hotkeys::{self, HotkeyListener};

use render::PresetAction;
use state::{Finished, GuiState};

/// Frame interval while idle; picks up hotkey results without input.
const POLL_INTERVAL: Duration = Duration::from_millis(40);

pub struct GuiApp {
    app: Arc<App>,
    sender: EventSender,
    results: Receiver<Finished>,
    state: GuiState,
    _hotkeys: Option<HotkeyListener>,
}

/// Handles queued events one at a time until every sender is gone.
fn spawn_worker(app: Arc<App>, events: EventReceiver) -> Result<Receiver<Finished>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("worker".to_string())
        .spawn(move || {
            while let Some(event) = events.recv() {
                let outcome = app.handle(event);
                let finished = Finished {
                    reports: outcome.reports(),
                    recommendation: outcome.recommendation(),
                };
                if tx.send(finished).is_err() {
                    break;
                }
            }
            tracing::debug!("worker stopped");
        })?;
    Ok(rx)
}

impl GuiApp {
    pub fn new(app: Arc<App>) -> Result<Self> {
        let (sender, receiver) = events::event_queue(events::DEFAULT_CAPACITY);
        let results = spawn_worker(Arc::clone(&app), receiver)?;

        let table = hotkeys::bindings(false);
        let mut state = GuiState::new(
            SettingsInput::from_config(&app.config()),
            app.preset_names(),
            hotkeys::describe(&table),
        );

        let listener = match hotkeys::spawn_listener(sender.clone(), table) {
            Ok(listener) => {
                state.push(Channel::Info, "Hotkeys active");
                Some(listener)
            }
            Err(e) => {
                tracing::error!("Hotkeys unavailable: {:#}", e);
                state.push(Channel::Error, format!("Hotkeys unavailable: {:#}", e));
                None
            }
        };

        state.push(
            Channel::Info,
            format!("Ready. {} of 3 lots calibrated.", app.calibrated_count()),
        );

        Ok(Self {
            app,
            sender,
            results,
            state,
            _hotkeys: listener,
        })
    }

    fn post(&mut self, event: Event) {
        if self.sender.post(event) {
            self.state.pending += 1;
        } else {
            self.state.push(Channel::Info, format!("Busy, ignored {}", event));
        }
    }

    fn poll_results(&mut self) {
        while let Ok(finished) = self.results.try_recv() {
            self.state.finish(finished);
        }
    }

    fn handle_save_settings(&mut self) {
        match self.app.apply_settings(&self.state.settings) {
            Ok(()) => {
                self.state.settings = SettingsInput::from_config(&self.app.config());
                self.state.push(Channel::Info, "Settings saved");
            }
            Err(e) => self
                .state
                .push(Channel::Error, format!("Settings not saved: {:#}", e)),
        }
    }

    fn handle_auto_paste(&mut self) {
        let enabled = self.state.settings.auto_paste;
        self.app.set_auto_paste(enabled);
        let text = if enabled { "on" } else { "off (copy only)" };
        self.state.push(Channel::Info, format!("Auto-paste {}", text));
    }

    fn handle_preset(&mut self, action: PresetAction) {
        let result = match &action {
            PresetAction::Save(name) => self
                .app
                .save_preset(name)
                .map(|()| format!("Preset '{}' saved", name.trim())),
            PresetAction::Apply(name) => self.app.apply_preset(name).map(|_| {
                format!(
                    "Preset '{}' applied ({} of 3 lots)",
                    name.trim(),
                    self.app.calibrated_count()
                )
            }),
            PresetAction::Delete(name) => self
                .app
                .delete_preset(name)
                .map(|()| format!("Preset '{}' deleted", name.trim())),
        };

        match result {
            Ok(message) => self.state.push(Channel::Info, message),
            Err(e) => self.state.push(Channel::Error, format!("{:#}", e)),
        }
        self.state.presets = self.app.preset_names();
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_results();
        ctx.request_repaint_after(POLL_INTERVAL);

        egui::TopBottomPanel::bottom("hotkeys").show(ctx, |ui| {
            render::render_footer(ui, &self.state);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let settings = render::render_settings(ui, &mut self.state);
            if settings.auto_paste_changed {
                self.handle_auto_paste();
            }
            if settings.save {
                self.handle_save_settings();
            }

            if let Some(event) = render::render_lots(ui, &self.state) {
                self.post(event);
            }

            if let Some(action) = render::render_presets(ui, &mut self.state) {
                self.handle_preset(action);
            }

            if render::render_log(ui, &self.state) {
                self.state.clear_log();
            }
        });
    }
}

/// Runs the form. Blocks until the window is closed.
pub fn run_gui(app: Arc<App>) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(560.0, 640.0))
            .with_min_inner_size(Vec2::new(420.0, 480.0))
            .with_title("Undercut Helper"),
        ..Default::default()
    };

    let gui = GuiApp::new(app)?;
    tracing::info!("Opening window");

    eframe::run_native(
        "Undercut Helper",
        options,
        Box::new(move |_cc| Ok(Box::new(gui))),
    )
    .map_err(|e| anyhow!("GUI failed: {}", e))
}
