//! Form layout.

use eframe::egui::{self, Color32, RichText};

use super::state::GuiState;
use crate::app::Channel;
use crate::events::Event;
use crate::pricing::{Rounding, Tier, UndercutMode};

const TIME_COLOR: Color32 = Color32::from_rgb(0x7f, 0x8c, 0x8d);

/// Color of each log channel.
pub fn channel_color(channel: Channel) -> Color32 {
    match channel {
        Channel::Lot(Tier::One) => Color32::from_rgb(0x66, 0xd9, 0xef),
        Channel::Lot(Tier::Ten) => Color32::from_rgb(0xa6, 0xe2, 0x2e),
        Channel::Lot(Tier::Hundred) => Color32::from_rgb(0xfd, 0x97, 0x1f),
        Channel::Optimize => Color32::from_rgb(0xae, 0x81, 0xff),
        Channel::Info => Color32::from_rgb(0xbd, 0xc3, 0xc7),
        Channel::Error => Color32::from_rgb(0xff, 0x6b, 0x6b),
    }
}

fn mode_label(mode: &str) -> &'static str {
    match mode.parse::<UndercutMode>() {
        Ok(UndercutMode::Fixed) => "Fixed amount",
        Ok(UndercutMode::Percent) => "Percent",
        Err(_) => "?",
    }
}

fn rounding_label(rounding: &str) -> &'static str {
    match rounding.parse::<Rounding>() {
        Ok(Rounding::None) => "None",
        Ok(Rounding::RoundDownTens) => "Round down to 10",
        Ok(Rounding::RoundDownHundreds) => "Round down to 100",
        Ok(Rounding::EndInNine) => "End in 9",
        Err(_) => "?",
    }
}

fn small_field(ui: &mut egui::Ui, label: &str, text: &mut String) {
    ui.label(label);
    ui.add(egui::TextEdit::singleline(text).desired_width(70.0));
}

/// What the settings section asked for.
#[derive(Default)]
pub struct SettingsActions {
    pub save: bool,
    pub auto_paste_changed: bool,
}

/// Undercut mode, value, rounding, floor, box size and toggles.
pub fn render_settings(ui: &mut egui::Ui, state: &mut GuiState) -> SettingsActions {
    let mut actions = SettingsActions::default();
    let settings = &mut state.settings;

    ui.heading("Pricing");
    ui.add_space(4.0);

    ui.horizontal(|ui| {
        egui::ComboBox::from_label("Mode")
            .selected_text(mode_label(&settings.mode))
            .show_ui(ui, |ui| {
                for mode in [UndercutMode::Fixed, UndercutMode::Percent] {
                    ui.selectable_value(&mut settings.mode, mode.key().to_string(), mode_label(mode.key()));
                }
            });
        small_field(ui, "Value:", &mut settings.value);
    });

    ui.horizontal(|ui| {
        egui::ComboBox::from_label("Rounding")
            .selected_text(rounding_label(&settings.rounding))
            .show_ui(ui, |ui| {
                for rounding in Rounding::ALL {
                    ui.selectable_value(
                        &mut settings.rounding,
                        rounding.key().to_string(),
                        rounding_label(rounding.key()),
                    );
                }
            });
        small_field(ui, "Min price:", &mut settings.min_price);
    });

    ui.horizontal(|ui| {
        small_field(ui, "Box width:", &mut settings.box_width);
        small_field(ui, "Box height:", &mut settings.box_height);
    });

    ui.horizontal(|ui| {
        if ui.checkbox(&mut settings.auto_paste, "Auto-paste (Ctrl+V)").changed() {
            actions.auto_paste_changed = true;
        }
        ui.checkbox(&mut settings.record_history, "Record history");
        ui.add_space(12.0);
        if ui.button("Save settings").clicked() {
            actions.save = true;
        }
    });

    actions
}

/// Read/calibrate buttons per lot plus the whole-market actions.
/// Returns the event to post, if a button was clicked.
pub fn render_lots(ui: &mut egui::Ui, state: &GuiState) -> Option<Event> {
    let mut event = None;

    ui.add_space(8.0);
    ui.separator();
    ui.heading("Lots");
    ui.add_space(4.0);

    for tier in Tier::ALL {
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Lot {:>3}", tier)).color(channel_color(Channel::Lot(tier))).monospace());
            if ui.button("Read + paste").clicked() {
                event = Some(Event::ReadPaste(tier));
            }
            if ui.button("Calibrate").clicked() {
                event = Some(Event::Calibrate(tier));
            }
        });
    }

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        if ui.button(RichText::new("Optimize").strong()).clicked() {
            event = Some(Event::Optimize);
        }
        if ui.button("Print all").clicked() {
            event = Some(Event::PrintAll);
        }
        if ui.button("Show pointer").clicked() {
            event = Some(Event::ShowPointer);
        }
        if state.pending > 0 {
            ui.spinner();
        }
    });

    ui.add_space(4.0);
    ui.label(
        RichText::new(state.recommendation_text())
            .color(channel_color(Channel::Optimize))
            .strong(),
    );

    event
}

pub enum PresetAction {
    Save(String),
    Apply(String),
    Delete(String),
}

pub fn render_presets(ui: &mut egui::Ui, state: &mut GuiState) -> Option<PresetAction> {
    let mut action = None;

    ui.add_space(8.0);
    ui.separator();
    ui.heading("Presets");
    ui.add_space(4.0);

    ui.horizontal(|ui| {
        egui::ComboBox::from_id_salt("preset_list")
            .selected_text("Saved...")
            .show_ui(ui, |ui| {
                for name in &state.presets {
                    if ui.selectable_label(*name == state.preset_name, name).clicked() {
                        state.preset_name = name.clone();
                    }
                }
            });
        ui.add(egui::TextEdit::singleline(&mut state.preset_name).desired_width(140.0));

        let name = state.preset_name.clone();
        if ui.button("Save").clicked() {
            action = Some(PresetAction::Save(name.clone()));
        }
        if ui.button("Apply").clicked() {
            action = Some(PresetAction::Apply(name.clone()));
        }
        if ui.button("Delete").clicked() {
            action = Some(PresetAction::Delete(name));
        }
    });

    action
}

/// Returns true when "Clear" was clicked.
pub fn render_log(ui: &mut egui::Ui, state: &GuiState) -> bool {
    ui.add_space(8.0);
    ui.separator();
    let clear = ui
        .horizontal(|ui| {
            ui.heading("Log");
            ui.button("Clear").clicked()
        })
        .inner;

    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for line in &state.log {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(&line.time).color(TIME_COLOR).monospace());
                    ui.label(
                        RichText::new(&line.message)
                            .color(channel_color(line.channel))
                            .monospace(),
                    );
                });
            }
        });

    clear
}

pub fn render_footer(ui: &mut egui::Ui, state: &GuiState) {
    ui.label(RichText::new(&state.hotkeys_text).small().color(TIME_COLOR));
}
