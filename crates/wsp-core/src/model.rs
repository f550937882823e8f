use serde::{Deserialize, Serialize};

/// Progress of the workspace sync engine. `Synced` is the only terminal step.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncEngineStep {
    #[default]
    Stopped,
    Syncing,
    Synced,
}

impl SyncEngineStep {
    pub fn is_synced(self) -> bool {
        matches!(self, SyncEngineStep::Synced)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncEngineStep::Stopped => "stopped",
            SyncEngineStep::Syncing => "syncing",
            SyncEngineStep::Synced => "synced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "stopped" => Some(SyncEngineStep::Stopped),
            "syncing" => Some(SyncEngineStep::Syncing),
            "synced" => Some(SyncEngineStep::Synced),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncEngineStatus {
    pub step: SyncEngineStep,
    #[serde(default)]
    pub retrying: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl SyncEngineStatus {
    pub fn at(step: SyncEngineStep) -> Self {
        Self { step, retrying: false, error: None }
    }
}

/// How a page is presented in the editor. Kept per page in local state.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    #[default]
    Document,
    Canvas,
}

impl PageMode {
    pub fn toggled(self) -> Self {
        match self {
            PageMode::Document => PageMode::Canvas,
            PageMode::Canvas => PageMode::Document,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageMode::Document => "document",
            PageMode::Canvas => "canvas",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "document" => Some(PageMode::Document),
            "canvas" => Some(PageMode::Canvas),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_synced_is_synced() {
        assert!(SyncEngineStep::Synced.is_synced());
        assert!(!SyncEngineStep::Syncing.is_synced());
        assert!(!SyncEngineStep::Stopped.is_synced());
    }

    #[test]
    fn step_names_round_trip_through_parse() {
        for step in [SyncEngineStep::Stopped, SyncEngineStep::Syncing, SyncEngineStep::Synced] {
            assert_eq!(SyncEngineStep::parse(step.as_str()), Some(step));
        }
        assert_eq!(SyncEngineStep::parse("Synced"), None);
    }

    #[test]
    fn toggling_mode_twice_is_identity() {
        assert_eq!(PageMode::Document.toggled(), PageMode::Canvas);
        assert_eq!(PageMode::Document.toggled().toggled(), PageMode::Document);
    }
}
