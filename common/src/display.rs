use chrono::NaiveDateTime;

use crate::{config::ThermostatConfig, types::ThermostatMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    pub line1: String,
    pub line2: String,
}

impl DisplayFrame {
    pub fn new(line1: impl Into<String>, line2: impl Into<String>, width: usize) -> Self {
        Self {
            line1: truncate(&line1.into(), width),
            line2: truncate(&line2.into(), width),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPage {
    Temperature,
    Status,
}

impl DisplayPage {
    fn flipped(self) -> Self {
        match self {
            Self::Temperature => Self::Status,
            Self::Status => Self::Temperature,
        }
    }
}

/// Builds the two display lines and flips the second line between the
/// temperature and status pages.
#[derive(Debug, Clone)]
pub struct DisplayMultiplexer {
    width: usize,
    toggle_ms: u64,
    page: DisplayPage,
    last_toggle_ms: Option<u64>,
}

impl DisplayMultiplexer {
    pub fn new(width: usize, toggle_ms: u64) -> Self {
        Self {
            width,
            toggle_ms,
            page: DisplayPage::Temperature,
            last_toggle_ms: None,
        }
    }

    pub fn from_config(config: &ThermostatConfig) -> Self {
        Self::new(config.display_width, config.display_toggle_ms)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn page(&self) -> DisplayPage {
        self.page
    }

    /// Advances the page timer to `now_ms` and returns the lines to show.
    /// The first frame counts as a toggle, so the status page comes up first.
    /// The toggle interval is measured from the previous toggle, so late ticks
    /// shift every later toggle.
    pub fn frame(
        &mut self,
        now_ms: u64,
        local_now: NaiveDateTime,
        temp_f: f64,
        mode: ThermostatMode,
        set_point_f: f64,
    ) -> DisplayFrame {
        let due = self
            .last_toggle_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.toggle_ms);
        if due {
            self.page = self.page.flipped();
            self.last_toggle_ms = Some(now_ms);
        }

        let line1 = local_now.format("%m/%d %H:%M:%S").to_string();
        let line2 = match self.page {
            DisplayPage::Temperature => temperature_line(temp_f),
            DisplayPage::Status => status_line(mode, set_point_f),
        };

        DisplayFrame::new(line1, line2, self.width)
    }
}

pub fn temperature_line(temp_f: f64) -> String {
    format!("Temp {temp_f:5.1}F")
}

pub fn status_line(mode: ThermostatMode, set_point_f: f64) -> String {
    format!("{} {set_point_f:4.0}F", mode.as_str())
}

fn truncate(line: &str, width: usize) -> String {
    line.chars().take(width).collect()
}
