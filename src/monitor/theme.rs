//! Display themes for monitor output.

use super::event::{EventInfo, MonitorEvent};
use console::Style;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Classic,
    Matrix,
    Monochrome,
    Dimmed,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Matrix => "matrix",
            Self::Monochrome => "monochrome",
            Self::Dimmed => "dimmed",
        }
    }

    /// Style applied to the event tag.
    fn tag_style(&self, event: MonitorEvent) -> Style {
        let style = Style::new();
        match (self, event) {
            (_, MonitorEvent::Error) if *self != Self::Monochrome => style.red().bold(),
            (Self::Classic, MonitorEvent::Connect | MonitorEvent::Disconnect) => style.yellow(),
            (Self::Classic, MonitorEvent::Task | MonitorEvent::Transact) => style.cyan(),
            (Self::Classic, _) => style.white().bold(),
            (Self::Matrix, _) => style.green().bold(),
            (Self::Monochrome, _) => style.bold(),
            (Self::Dimmed, _) => style.dim(),
        }
    }

    /// Style applied to the event text.
    fn text_style(&self) -> Style {
        match self {
            Self::Classic => Style::new().green(),
            Self::Matrix => Style::new().green(),
            Self::Monochrome => Style::new(),
            Self::Dimmed => Style::new().dim(),
        }
    }

    /// Render one event as a single display line.
    pub fn render(&self, info: &EventInfo) -> String {
        format!(
            "{}: {}",
            self.tag_style(info.event).apply_to(info.event.as_str()),
            self.text_style().apply_to(&info.text)
        )
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "matrix" => Ok(Self::Matrix),
            "monochrome" => Ok(Self::Monochrome),
            "dimmed" => Ok(Self::Dimmed),
            other => Err(format!("Unknown monitor theme '{}'", other)),
        }
    }
}
