use lazy_static::lazy_static;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;

use crate::config::SceneConfig;
use crate::dataset::{LoadReport, MapDataset};
use crate::error::Result;
use crate::models::SessionStatus;
use crate::scene::{build_scene, Scene, ViewMode};

/// What the map front end currently shows: the last loaded data, the view
/// mode and the scene settings. The projector and converter never read it.
pub struct ModuleState {
    pub dataset: Option<MapDataset>,
    pub view_mode: ViewMode,
    pub config: SceneConfig,
}

// Create a global static instance of the module state
lazy_static! {
    static ref MODULE_STATE: ReentrantMutex<RefCell<ModuleState>> =
        ReentrantMutex::new(RefCell::new(ModuleState::new()));
}

impl Default for ModuleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleState {
    pub fn new() -> Self {
        ModuleState {
            dataset: None,
            view_mode: ViewMode::ThreeD,
            config: SceneConfig::default(),
        }
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let mut borrow = guard.borrow_mut();
        f(&mut borrow)
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let borrow = guard.borrow();
        f(&borrow)
    }

    /// Replace the dataset; on a schema error the previous data is kept
    pub fn load(&mut self, buildings_json: &str, points_json: &str) -> Result<LoadReport> {
        let (dataset, report) = MapDataset::load(buildings_json, points_json)?;
        self.dataset = Some(dataset);
        Ok(report)
    }

    pub fn set_config(&mut self, config_json: &str) -> Result<()> {
        self.config = SceneConfig::from_json(config_json)?;
        Ok(())
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.toggle();
        self.view_mode
    }

    /// Scene for the current mode; an empty scene before anything is loaded
    pub fn scene(&self) -> Result<Scene> {
        match &self.dataset {
            Some(dataset) => build_scene(dataset, self.view_mode, &self.config),
            None => build_scene(&MapDataset::default(), self.view_mode, &self.config),
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            loaded: self.dataset.is_some(),
            view_mode: self.view_mode,
            summary: self
                .dataset
                .as_ref()
                .map(MapDataset::summary)
                .unwrap_or_else(|| MapDataset::default().summary()),
        }
    }

    pub fn clear(&mut self) {
        self.dataset = None;
    }
}
