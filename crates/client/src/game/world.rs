// World state: latest snapshot, the one before it, and the map assets of the session
use glam::Vec2;
use protocol::RadarData;

use crate::camera::projection::MapDefinition;

/// Map lifecycle change caused by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapTransition {
    None,
    /// First in-match snapshot naming a map: fetch its assets.
    Load(String),
    /// Match over: drop the map and everything keyed to it.
    Unload,
    /// Map name changed mid-session.
    Reload(String),
}

/// Assets of the current map, filled in asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub struct MapAssets {
    pub name: String,
    pub definition: Option<MapDefinition>,
    pub image_size: Option<Vec2>,
}

impl MapAssets {
    fn new(name: String) -> Self {
        Self {
            name,
            definition: None,
            image_size: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.definition.is_some() && self.image_size.is_some()
    }
}

#[derive(Debug, Default)]
pub struct WorldState {
    current: Option<RadarData>,
    previous: Option<RadarData>,
    map: Option<MapAssets>,
    money_reveal: Option<bool>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&RadarData> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&RadarData> {
        self.previous.as_ref()
    }

    pub fn map(&self) -> Option<&MapAssets> {
        self.map.as_ref()
    }

    /// Feed frequency of the latest snapshot, in Hz.
    pub fn freq(&self) -> u32 {
        self.current.as_ref().map_or(0, |data| data.freq)
    }

    pub fn money_reveal(&self) -> Option<bool> {
        self.money_reveal
    }

    pub fn set_money_reveal(&mut self, enabled: bool) {
        self.money_reveal = Some(enabled);
    }

    /// Replace the current snapshot and work out what happens to the map.
    pub fn apply_snapshot(&mut self, data: RadarData) -> MapTransition {
        if let Some(enabled) = data.money_reveal_enabled {
            self.money_reveal = Some(enabled);
        }

        let was_in_match = self.current.as_ref().is_some_and(|d| d.in_match);
        if data.in_match && !was_in_match {
            log::info!("Match started on {}", data.map().unwrap_or("<unknown map>"));
        }

        let transition = match (data.in_match, data.map(), self.map.as_ref()) {
            (false, _, Some(_)) => MapTransition::Unload,
            (true, Some(name), None) => MapTransition::Load(name.to_string()),
            (true, Some(name), Some(assets)) if assets.name != name => MapTransition::Reload(name.to_string()),
            _ => MapTransition::None,
        };

        match &transition {
            MapTransition::Load(name) | MapTransition::Reload(name) => {
                log::info!("Loading map \"{name}\"");
                self.map = Some(MapAssets::new(name.clone()));
            }
            MapTransition::Unload => self.unload_map(),
            MapTransition::None => {}
        }

        self.previous = self.current.replace(data);
        transition
    }

    pub fn unload_map(&mut self) {
        if let Some(assets) = self.map.take() {
            log::info!("Unloading map \"{}\"", assets.name);
        }
    }

    /// Install a fetched map definition. Completions for a map that is no longer current are ignored.
    pub fn set_map_definition(&mut self, name: &str, definition: MapDefinition) -> bool {
        match self.map.as_mut() {
            Some(assets) if assets.name == name => {
                assets.definition = Some(definition);
                true
            }
            _ => false,
        }
    }

    /// Record the loaded radar image's pixel size; stale completions are ignored.
    pub fn set_map_image_size(&mut self, name: &str, size: Vec2) -> bool {
        match self.map.as_mut() {
            Some(assets) if assets.name == name => {
                assets.image_size = Some(size);
                true
            }
            _ => false,
        }
    }

    /// The snapshot to render, if the current one is an in-match snapshot.
    pub fn in_match(&self) -> Option<&RadarData> {
        self.current.as_ref().filter(|d| d.in_match)
    }
}
