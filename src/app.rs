// The central application controller and event loop.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use ratatui::{Terminal, backend::Backend, widgets::ListState};
use std::time::{Duration, Instant};

pub mod model;
pub mod systemd;
pub mod ui;
pub mod unit;

use model::{Config, Mountpoint, UnitStatus};
use systemd::{Systemctl, UnitAction, UnitManager};

/// What the keyboard currently controls: the mountpoint list, or the
/// path-entry prompt opened by "new mountpoint".
pub enum Mode {
    Normal,
    ChoosePath { input: String },
}

pub struct App {
    config: Config,
    manager: Box<dyn UnitManager>,
    mounts: Vec<Mountpoint>,
    list_state: ListState,
    mode: Mode,
    message: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let manager = Box::new(Systemctl::new(config.system));
        Self::with_manager(config, manager)
    }

    /// Constructor with an explicit manager, the seam tests use.
    pub fn with_manager(config: Config, manager: Box<dyn UnitManager>) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            config,
            manager,
            mounts: Vec::new(),
            list_state,
            mode: Mode::Normal,
            message: None,
            should_quit: false,
        }
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        // Initial discovery; an unreachable manager is shown, not fatal.
        if let Err(err) = self.refresh_mounts() {
            self.message = Some(format!("{err:#}"));
        }

        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_secs(2);

        loop {
            terminal.draw(|f| {
                ui::render(
                    f,
                    &self.mounts,
                    &mut self.list_state,
                    &self.mode,
                    self.message.as_deref(),
                )
            })?;

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            if crossterm::event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key.code);
                }
            }

            if last_tick.elapsed() >= tick_rate {
                self.refresh_statuses();
                last_tick = Instant::now();
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match &mut self.mode {
            Mode::Normal => match code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Char('n') => {
                    self.message = None;
                    self.mode = Mode::ChoosePath {
                        input: String::new(),
                    };
                }
                KeyCode::Char('s') => self.perform_action(UnitAction::Start),
                KeyCode::Char('x') => self.perform_action(UnitAction::Stop),
                KeyCode::Char('e') => self.perform_action(UnitAction::Enable),
                KeyCode::Char('d') => self.perform_action(UnitAction::Disable),
                KeyCode::Char('r') => {
                    if let Err(err) = self.refresh_mounts() {
                        self.message = Some(format!("{err:#}"));
                    }
                }
                _ => {}
            },
            Mode::ChoosePath { input } => match code {
                KeyCode::Esc => {
                    // User cancelled the chooser; nothing else runs.
                    tracing::debug!("mountpoint selection cancelled");
                    self.mode = Mode::Normal;
                }
                KeyCode::Enter => {
                    let path = std::mem::take(input);
                    self.mode = Mode::Normal;
                    self.submit_path(&path);
                }
                KeyCode::Char(c) => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                _ => {}
            },
        }
    }

    /// Completes the "new mountpoint" interaction once the chooser has
    /// produced a path.
    fn submit_path(&mut self, path: &str) {
        let path = path.trim();
        if path.is_empty() {
            return;
        }
        if !mountpoint_is_valid(path) {
            tracing::error!(mountpoint = path, "mountpoint is not an empty directory");
            self.message = Some(format!("{path}: mountpoint must be an empty directory"));
            return;
        }

        match self.create_mountpoint(path) {
            Ok(mount) => {
                self.message = Some(describe(&mount));
                self.insert_mount(mount);
            }
            Err(err) => {
                tracing::error!(mountpoint = path, "failed to create mountpoint: {err:#}");
                self.message = Some(format!("{err:#}"));
            }
        }
    }

    /// escape -> build unit name -> query both status booleans.
    fn create_mountpoint(&self, path: &str) -> Result<Mountpoint> {
        let escaped = unit::path_escape(path);
        let unit_name = unit::template_unit(&self.config.template, &escaped)?;
        tracing::info!(mountpoint = path, unit = %unit_name, "creating mountpoint");

        let status = self.query_status(&unit_name)?;
        Ok(Mountpoint {
            path: path.to_string(),
            unit: unit_name,
            status: Some(status),
        })
    }

    fn query_status(&self, unit_name: &str) -> Result<UnitStatus> {
        Ok(UnitStatus {
            active: self.manager.is_active(unit_name)?,
            enabled: self.manager.is_enabled(unit_name)?,
        })
    }

    fn insert_mount(&mut self, mount: Mountpoint) {
        match self.mounts.iter().position(|m| m.unit == mount.unit) {
            Some(i) => {
                self.mounts[i] = mount;
                self.list_state.select(Some(i));
            }
            None => {
                self.mounts.push(mount);
                self.list_state.select(Some(self.mounts.len() - 1));
            }
        }
    }

    /// Rebuilds the mountpoint list from the instances the manager knows.
    fn refresh_mounts(&mut self) -> Result<()> {
        let pattern = unit::template_unit(&self.config.template, "*")?;
        let units = self.manager.list_units(&pattern)?;

        self.mounts = units
            .into_iter()
            .filter_map(|unit_name| {
                let instance = unit::unit_instance(&unit_name, &self.config.template)?;
                Some(Mountpoint {
                    path: unit::path_unescape(&instance),
                    unit: unit_name,
                    status: None,
                })
            })
            .collect();

        if let Some(selected) = self.list_state.selected() {
            if selected >= self.mounts.len() {
                self.list_state
                    .select(Some(self.mounts.len().saturating_sub(1)));
            }
        }

        self.refresh_statuses();
        Ok(())
    }

    /// Re-queries every listed unit. A failed query leaves that entry's
    /// status unknown instead of rendering it as off/disabled.
    fn refresh_statuses(&mut self) {
        let mut failure = None;
        for i in 0..self.mounts.len() {
            match self.query_status(&self.mounts[i].unit) {
                Ok(status) => self.mounts[i].status = Some(status),
                Err(err) => {
                    self.mounts[i].status = None;
                    failure.get_or_insert_with(|| format!("{err:#}"));
                }
            }
        }
        if let Some(failure) = failure {
            self.message = Some(failure);
        }
    }

    fn next(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= self.mounts.len().saturating_sub(1) {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.mounts.len().saturating_sub(1)
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn perform_action(&mut self, action: UnitAction) {
        let Some(unit_name) = self
            .list_state
            .selected()
            .and_then(|i| self.mounts.get(i))
            .map(|m| m.unit.clone())
        else {
            return;
        };

        if let Err(err) = self.manager.control(&unit_name, action) {
            self.message = Some(format!("{err:#}"));
        }
        self.refresh_statuses();
    }
}

/// A usable mountpoint is an existing, empty directory.
fn mountpoint_is_valid(path: &str) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}

fn describe(mount: &Mountpoint) -> String {
    match mount.status {
        Some(status) => format!(
            "{}: {} / {}",
            mount.unit,
            status.run_state(),
            status.enablement()
        ),
        None => format!("{}: status unknown", mount.unit),
    }
}

#[cfg(test)]
mod tests {
    use super::systemd::testing::FakeManager;
    use super::*;
    use std::rc::Rc;

    fn app_with(manager: Rc<FakeManager>) -> App {
        App::with_manager(Config::default(), Box::new(manager))
    }

    #[test]
    fn choosing_a_path_builds_the_templated_unit_name() {
        let mgr = Rc::new(
            FakeManager::new().with_unit("onedriver@home-user-OneDrive.service", true, true),
        );
        let mut app = app_with(Rc::clone(&mgr));

        app.handle_key(KeyCode::Char('n'));
        for c in "/home/user/OneDrive".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        match &app.mode {
            Mode::ChoosePath { input } => assert_eq!(input, "/home/user/OneDrive"),
            Mode::Normal => panic!("expected the path prompt to be open"),
        }

        let mount = app.create_mountpoint("/home/user/OneDrive").unwrap();
        assert_eq!(mount.unit, "onedriver@home-user-OneDrive.service");

        let status = mount.status.unwrap();
        assert_eq!(status.run_state(), "active");
        assert_eq!(status.enablement(), "enabled");
    }

    #[test]
    fn display_strings_come_from_the_fixed_vocabulary() {
        let mgr = Rc::new(
            FakeManager::new().with_unit("onedriver@home-user-OneDrive.service", false, true),
        );
        let app = app_with(Rc::clone(&mgr));

        let mount = app.create_mountpoint("/home/user/OneDrive").unwrap();
        assert_eq!(
            describe(&mount),
            "onedriver@home-user-OneDrive.service: off / enabled"
        );
    }

    #[test]
    fn cancelling_the_chooser_invokes_nothing() {
        let mgr = Rc::new(FakeManager::new());
        let mut app = app_with(Rc::clone(&mgr));

        app.handle_key(KeyCode::Char('n'));
        for c in "/tmp".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Esc);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(*mgr.calls.borrow(), 0);
        assert!(app.message.is_none());
    }

    #[test]
    fn malformed_template_aborts_before_any_manager_call() {
        let mgr = Rc::new(FakeManager::new());
        let app = App::with_manager(
            Config {
                template: "onedriver.service".to_string(),
                system: false,
            },
            Box::new(Rc::clone(&mgr)),
        );

        assert!(app.create_mountpoint("/mnt/x").is_err());
        assert_eq!(*mgr.calls.borrow(), 0);
    }

    #[test]
    fn unreachable_manager_surfaces_as_an_error() {
        let mgr = Rc::new(FakeManager::unreachable());
        let app = app_with(mgr);

        let err = app.create_mountpoint("/mnt/x").unwrap_err();
        assert!(err.to_string().contains("bus"));
    }

    #[test]
    fn refresh_discovers_existing_instances_as_paths() {
        let mgr = Rc::new(
            FakeManager::new()
                .with_unit("onedriver@home-user-OneDrive.service", true, false)
                .with_unit(r"onedriver@mnt-my\x20drive.service", false, false)
                .with_unit("unrelated.service", true, true),
        );
        let mut app = app_with(mgr);

        app.refresh_mounts().unwrap();
        let paths: Vec<&str> = app.mounts.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/home/user/OneDrive", "/mnt/my drive"]);

        let status = app.mounts[0].status.unwrap();
        assert_eq!(status.run_state(), "active");
        assert_eq!(status.enablement(), "disabled");
    }

    #[test]
    fn stop_action_updates_run_state_only() {
        let mgr =
            Rc::new(FakeManager::new().with_unit("onedriver@mnt-x.service", true, true));
        let mut app = app_with(mgr);

        app.refresh_mounts().unwrap();
        app.handle_key(KeyCode::Char('x'));

        let status = app.mounts[0].status.unwrap();
        assert_eq!(status.run_state(), "off");
        assert_eq!(status.enablement(), "enabled");
    }
}
