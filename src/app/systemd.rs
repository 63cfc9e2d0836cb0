// Handles all interactions with the service manager via `systemctl`.

use anyhow::{Context, Result, bail};
use std::process::Command;

#[derive(Debug, Clone, Copy)]
pub enum UnitAction {
    Start,
    Stop,
    Enable,
    Disable,
}

impl UnitAction {
    pub fn verb(self) -> &'static str {
        match self {
            UnitAction::Start => "start",
            UnitAction::Stop => "stop",
            UnitAction::Enable => "enable",
            UnitAction::Disable => "disable",
        }
    }
}

/// The seam to the service manager. The production implementation shells out
/// to `systemctl`; tests substitute a fake.
///
/// The two status queries return `Ok(false)` for units the manager knows to
/// be off/disabled/absent, and `Err` only when the question itself could not
/// be answered (manager unreachable, permission denied). Callers rely on
/// that distinction.
pub trait UnitManager {
    fn is_active(&self, unit: &str) -> Result<bool>;
    fn is_enabled(&self, unit: &str) -> Result<bool>;
    fn control(&self, unit: &str, action: UnitAction) -> Result<()>;
    fn list_units(&self, pattern: &str) -> Result<Vec<String>>;
}

/// `systemctl`-backed manager. Targets the user manager unless `system` is
/// set, matching how the onedriver units are installed.
pub struct Systemctl {
    system: bool,
}

impl Systemctl {
    pub fn new(system: bool) -> Self {
        Self { system }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("systemctl");
        if !self.system {
            cmd.arg("--user");
        }
        cmd
    }
}

/// Folds a reported ActiveState word to the boolean the launcher cares
/// about. Anything that is not "active" (inactive, failed, activating,
/// deactivating, unknown) counts as not active.
fn active_from_state(state: &str) -> bool {
    state == "active"
}

/// Folds a reported enablement word. "enabled-runtime" counts as enabled per
/// systemctl's own classification; disabled/static/masked/etc. do not.
fn enabled_from_state(state: &str) -> bool {
    matches!(state, "enabled" | "enabled-runtime")
}

impl UnitManager for Systemctl {
    fn is_active(&self, unit: &str) -> Result<bool> {
        let output = self
            .command()
            .args(["is-active", unit])
            .output()
            .context("Failed to execute systemctl")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let state = stdout.trim();
        if state.is_empty() {
            // is-active always prints a state word when it reached the
            // manager, so an empty answer means the call itself failed.
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("systemctl is-active {unit} failed: {}", stderr.trim());
        }
        Ok(active_from_state(state))
    }

    fn is_enabled(&self, unit: &str) -> Result<bool> {
        let output = self
            .command()
            .args(["is-enabled", unit])
            .output()
            .context("Failed to execute systemctl")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let state = stdout.trim();
        if state.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // A unit file the manager has never heard of is "not enabled",
            // not a failed query.
            if stderr.contains("No such file or directory") {
                return Ok(false);
            }
            bail!("systemctl is-enabled {unit} failed: {}", stderr.trim());
        }
        Ok(enabled_from_state(state))
    }

    fn control(&self, unit: &str, action: UnitAction) -> Result<()> {
        let verb = action.verb();
        tracing::info!(unit, verb, "controlling unit");

        let output = self
            .command()
            .args([verb, unit])
            .output()
            .context(format!("Failed to {verb} unit {unit}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("systemctl {verb} {unit} failed: {}", stderr.trim());
        }
        Ok(())
    }

    fn list_units(&self, pattern: &str) -> Result<Vec<String>> {
        // --all to see inactive instances, no-legend/no-pager/plain for
        // parsing safety.
        let output = self
            .command()
            .args(["list-units", "--all", "--plain", "--no-pager", "--no-legend"])
            .arg(pattern)
            .output()
            .context("Failed to execute systemctl")?;

        if !output.status.success() {
            bail!("systemctl list-units returned non-zero status");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut units = Vec::new();

        // Expected format approx: unit_name loaded active sub description...
        for line in stdout.lines() {
            if let Some(name) = line.split_whitespace().next() {
                units.push(name.to_string());
            }
        }

        Ok(units)
    }
}
