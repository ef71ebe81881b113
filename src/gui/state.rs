//! Form state: editable settings, the recommendation and the colored log.

use std::collections::VecDeque;

use crate::app::{Channel, Report};
use crate::config::SettingsInput;
use crate::pricing::Tier;

/// Oldest lines are dropped past this many.
pub const MAX_LOG_LINES: usize = 500;

/// One entry of the on-screen log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    /// `HH:MM:SS`
    pub time: String,
    pub channel: Channel,
    pub message: String,
}

/// Result of one event handled by the worker thread.
#[derive(Clone, Debug)]
pub struct Finished {
    pub reports: Vec<Report>,
    pub recommendation: Option<Option<Tier>>,
}

#[derive(Debug)]
pub struct GuiState {
    /// Settings as typed; converted to numbers only on save.
    pub settings: SettingsInput,
    pub preset_name: String,
    pub presets: Vec<String>,
    /// Last optimize result: `None` before the first run.
    pub recommendation: Option<Option<Tier>>,
    pub log: VecDeque<LogLine>,
    /// Events posted but not yet reported back.
    pub pending: usize,
    pub hotkeys_text: String,
}

impl GuiState {
    pub fn new(settings: SettingsInput, presets: Vec<String>, hotkeys_text: String) -> Self {
        Self {
            settings,
            preset_name: String::new(),
            presets,
            recommendation: None,
            log: VecDeque::new(),
            pending: 0,
            hotkeys_text,
        }
    }

    pub fn push(&mut self, channel: Channel, message: impl Into<String>) {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        self.push_at(time, channel, message.into());
    }

    fn push_at(&mut self, time: String, channel: Channel, message: String) {
        self.log.push_back(LogLine {
            time,
            channel,
            message,
        });
        while self.log.len() > MAX_LOG_LINES {
            self.log.pop_front();
        }
    }

    /// Folds a worker result into the log and the recommendation.
    pub fn finish(&mut self, finished: Finished) {
        self.pending = self.pending.saturating_sub(1);
        if let Some(recommendation) = finished.recommendation {
            self.recommendation = Some(recommendation);
        }
        for report in finished.reports {
            self.push(report.channel, report.message);
        }
    }

    pub fn recommendation_text(&self) -> String {
        match self.recommendation {
            None => "Recommended lot: (run Optimize)".to_string(),
            Some(None) => "Recommended lot: -".to_string(),
            Some(Some(tier)) => format!("Recommended lot: {}", tier),
        }
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn state() -> GuiState {
        GuiState::new(
            SettingsInput::from_config(&AppConfig::default()),
            Vec::new(),
            String::new(),
        )
    }

    #[test]
    fn test_log_is_bounded() {
        let mut state = state();
        for i in 0..MAX_LOG_LINES + 10 {
            state.push_at("12:00:00".to_string(), Channel::Info, i.to_string());
        }
        assert_eq!(state.log.len(), MAX_LOG_LINES);
        assert_eq!(state.log.front().unwrap().message, "10");
    }

    #[test]
    fn test_finish_updates_recommendation_only_on_optimize() {
        let mut state = state();
        state.pending = 2;
        state.finish(Finished {
            reports: vec![Report {
                channel: Channel::Optimize,
                message: "[OPT] Recommended lot: 10".to_string(),
            }],
            recommendation: Some(Some(Tier::Ten)),
        });
        assert_eq!(state.recommendation_text(), "Recommended lot: 10");

        state.finish(Finished {
            reports: Vec::new(),
            recommendation: None,
        });
        assert_eq!(state.recommendation, Some(Some(Tier::Ten)));
        assert_eq!(state.pending, 0);
        assert_eq!(state.log.len(), 1);
    }

    #[test]
    fn test_nothing_recommended() {
        let mut state = state();
        assert_eq!(state.recommendation_text(), "Recommended lot: (run Optimize)");
        state.finish(Finished {
            reports: Vec::new(),
            recommendation: Some(None),
        });
        assert_eq!(state.recommendation_text(), "Recommended lot: -");
    }
}
