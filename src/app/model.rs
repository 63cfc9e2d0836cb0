// Defines the core data structures for the application.

/// The two booleans the launcher reports about a unit, queried fresh on
/// every interaction and never cached across them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStatus {
    pub active: bool,
    pub enabled: bool,
}

impl UnitStatus {
    /// "active" or "off", nothing else.
    pub fn run_state(&self) -> &'static str {
        if self.active { "active" } else { "off" }
    }

    /// "enabled" or "disabled", nothing else.
    pub fn enablement(&self) -> &'static str {
        if self.enabled { "enabled" } else { "disabled" }
    }
}

/// One mountpoint managed through a templated systemd unit.
#[derive(Debug, Clone)]
pub struct Mountpoint {
    pub path: String,
    pub unit: String,
    /// None until a status query completes; a failed query leaves it None
    /// rather than pretending the unit is off/disabled.
    pub status: Option<UnitStatus>,
}

/// Launcher configuration, passed into the app at construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Instantiable unit template, e.g. "onedriver@.service".
    pub template: String,
    /// Talk to the system manager instead of the user manager.
    pub system: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template: "onedriver@.service".to_string(),
            system: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UnitStatus;

    #[test]
    fn status_vocabulary_is_fixed() {
        let on = UnitStatus {
            active: true,
            enabled: true,
        };
        let off = UnitStatus {
            active: false,
            enabled: false,
        };
        assert_eq!(on.run_state(), "active");
        assert_eq!(off.run_state(), "off");
        assert_eq!(on.enablement(), "enabled");
        assert_eq!(off.enablement(), "disabled");
    }
}
