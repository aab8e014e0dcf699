// Radar client core: owns connection, world, interpolation and focus state
//
// Browser callbacks turn into `handle(NetEvent)` calls; the animation frame calls `tick`.
// Both return the side effects for the glue to perform. Nothing here needs a browser.
pub mod world;

use glam::Vec2;
use protocol::packets::server::{self, ControlMessage, Frame, ServerMessage};
use protocol::{EntityData, RadarData};

use crate::camera::projection::{Anchor, MapDefinition, Projection, ViewParams, ViewportMode};
use crate::camera::{FocusController, FocusTarget};
use crate::config::RadarConfig;
use crate::interpolation::{EntityKey, Interpolator};
use crate::network::session::{Action, ConnectionManager, Incoming, NetEvent};
use crate::render::scene::{
    self, ActiveScene, BombMarker, FrameStats, Marker, PlayerMarker, Scene, SceneState,
};
use world::{MapTransition, WorldState};

const STATUS_NOT_ON_SERVER: &str = "Not on server";
const STATUS_DISCONNECTED: &str = "Disconnected";

/// Output of one animation frame.
#[derive(Debug)]
pub struct Tick {
    pub scene: Scene,
    pub actions: Vec<Action>,
}

pub struct RadarClient {
    config: RadarConfig,
    conn: ConnectionManager,
    world: WorldState,
    interpolator: Interpolator,
    focus: FocusController,
    stats: FrameStats,
}

impl RadarClient {
    pub fn new(config: RadarConfig) -> Self {
        Self {
            conn: ConnectionManager::new(config.network),
            interpolator: Interpolator::new(config.network.interpolation_strength),
            world: WorldState::new(),
            focus: FocusController::new(),
            stats: FrameStats::new(),
            config,
        }
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.conn
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn focus(&self) -> &FocusController {
        &self.focus
    }

    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    /// Open the channel.
    pub fn start(&mut self) -> Vec<Action> {
        self.conn.connect()
    }

    pub fn handle(&mut self, event: NetEvent, now: f64) -> Vec<Action> {
        match event {
            NetEvent::Opened => self.conn.on_open(),
            NetEvent::Message(frame) => self.on_frame(&frame, now),
            NetEvent::Closed => {
                let actions = self.conn.on_close();
                if actions.contains(&Action::UnloadMap) {
                    self.end_session();
                }
                actions
            }
            NetEvent::Error(message) => {
                log::error!("WebSocket error: {message}");
                Vec::new()
            }
            NetEvent::RequestTimeout { generation } => self.conn.on_timeout(generation, now),
            NetEvent::ReconnectTimer => self.conn.on_reconnect_timer(),
            NetEvent::PingTimer { epoch } => self.conn.on_ping_timer(epoch),
        }
    }

    fn on_frame(&mut self, frame: &Incoming, now: f64) -> Vec<Action> {
        let decoded = match frame {
            Incoming::Text(text) => server::decode_frame(Frame::Text(text)),
            Incoming::Binary(bytes) => server::decode_frame(Frame::Binary(bytes)),
        };

        match decoded {
            Ok(ServerMessage::Snapshot(data)) => {
                let mut actions = self.conn.on_response(now);
                actions.extend(self.apply_snapshot(*data, now));
                actions
            }
            Ok(ServerMessage::Pong) => {
                log::debug!("pong");
                Vec::new()
            }
            Ok(ServerMessage::Error) => {
                log::warn!("Server reported an error for the pending request");
                self.conn.on_server_error()
            }
            Ok(ServerMessage::Control(ControlMessage::MoneyReveal { enabled })) => {
                log::info!("Money reveal {}", if enabled { "enabled" } else { "disabled" });
                self.world.set_money_reveal(enabled);
                Vec::new()
            }
            Err(e) => {
                log::warn!("Dropping frame: {e}");
                self.conn.on_decode_failure()
            }
        }
    }

    fn apply_snapshot(&mut self, data: RadarData, now: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.world.apply_snapshot(data) {
            MapTransition::None => {}
            MapTransition::Load(name) => actions.push(Action::LoadMap(name)),
            MapTransition::Unload => {
                self.reset_tracking();
                actions.push(Action::UnloadMap);
            }
            MapTransition::Reload(name) => {
                self.reset_tracking();
                actions.push(Action::UnloadMap);
                actions.push(Action::LoadMap(name));
            }
        }

        if let Some(data) = self.world.in_match() {
            if self.config.network.use_interpolation {
                self.interpolator.observe_snapshot(&data.entities, now);
            }
            self.focus.observe(data);
        }
        actions
    }

    fn reset_tracking(&mut self) {
        self.interpolator.clear();
        self.focus.reset_session();
    }

    fn end_session(&mut self) {
        self.world.unload_map();
        self.reset_tracking();
    }

    /// One animation frame: request pacing plus the scene to draw.
    pub fn tick(&mut self, now: f64, canvas: Vec2) -> Tick {
        self.stats.frame(now);
        let actions = self.conn.on_tick(now);
        Tick {
            scene: self.build_scene(now, canvas),
            actions,
        }
    }

    fn build_scene(&self, now: f64, canvas: Vec2) -> Scene {
        let stats = self.config.render.show_stats.then(|| {
            scene::stats_line(
                self.stats.fps(),
                self.world.freq(),
                self.conn.average_rtt(),
                self.focus.rotation_status().label(),
            )
        });

        let state = match (self.world.in_match(), self.world.map()) {
            (Some(data), Some(assets)) => match (assets.definition, assets.image_size) {
                (Some(definition), Some(image_size)) => SceneState::Active(Box::new(
                    self.active_scene(data, &assets.name, definition, image_size, now, canvas),
                )),
                _ => SceneState::Loading,
            },
            _ => SceneState::NoData {
                message: if self.conn.is_open() {
                    STATUS_NOT_ON_SERVER
                } else {
                    STATUS_DISCONNECTED
                },
            },
        };

        Scene { state, stats }
    }

    fn blended(&self, slot: usize, entity: &EntityData, now: f64) -> EntityData {
        if !self.config.network.use_interpolation {
            return entity.clone();
        }
        self.interpolator
            .sample(EntityKey::of(slot, entity), now, self.conn.average_rtt())
            .unwrap_or_else(|| entity.clone())
    }

    fn active_scene(
        &self,
        data: &RadarData,
        map_name: &str,
        map: MapDefinition,
        image_size: Vec2,
        now: f64,
        canvas: Vec2,
    ) -> ActiveScene {
        let render = &self.config.render;
        let entities: Vec<EntityData> = data
            .entities
            .iter()
            .enumerate()
            .map(|(slot, entity)| self.blended(slot, entity, now))
            .collect();

        let focused = self.focus.current();
        // Camera follows the blended pose of the focused slot
        let anchor = focused.map(|m| match entities.get(m.slot).and_then(EntityData::as_player) {
            Some(player) => Anchor { pos: player.pos.xy(), yaw: player.yaw },
            None => Anchor { pos: m.pos, yaw: m.yaw },
        });

        let params = ViewParams {
            map,
            image_size,
            canvas_size: canvas,
            mode: render.viewport,
            centered_zoom: render.centered_zoom,
            bbox_margin: render.bbox_margin,
            anchor,
            rotate: self.focus.rotation_active(render.rotate),
        };
        let live_positions = entities
            .iter()
            .filter(|e| !e.as_player().is_some_and(|p| p.is_dormant))
            .map(|e| e.pos().xy());
        let projection = Projection::new(&params, live_positions);
        let size = projection.size_scale();

        let mut markers = Vec::with_capacity(entities.len());
        for (slot, entity) in entities.iter().enumerate() {
            let pos = projection.project(entity.pos().xy());
            if !scene::is_visible(pos, canvas, render.cull_margin) {
                continue;
            }
            markers.push(match entity {
                EntityData::Bomb(bomb) => Marker::Bomb(BombMarker {
                    pos,
                    radius: size * 0.7,
                    planted: bomb.is_planted,
                    blink: bomb.is_planted && (now / 1000.0).fract() > 0.5,
                }),
                EntityData::Player(player) => Marker::Player(PlayerMarker {
                    pos,
                    color: scene::team_color(player.team),
                    radius: size * 0.6,
                    heading: projection.heading(player.yaw),
                    focused: focused.is_some_and(|m| m.slot == slot),
                    dormant: player.is_dormant,
                    has_awp: player.has_awp,
                    scoped: player.is_scoped,
                    annotations: if player.is_dormant {
                        Vec::new()
                    } else {
                        scene::annotations(player, render, size)
                    },
                }),
            });
        }

        ActiveScene {
            map_name: map_name.to_string(),
            source: projection.source_rect(),
            rotation: projection.rotation(),
            markers,
            bomb_timer: scene::bomb_timer(&data.bomb, canvas.x),
        }
    }

    /// Flip the server-side money reveal option.
    pub fn toggle_money_reveal(&self) -> Vec<Action> {
        self.conn.toggle_money_reveal()
    }

    pub fn money_reveal_enabled(&self) -> Option<bool> {
        self.world.money_reveal()
    }

    /// Player names for the focus picker (`YOU` for the local player).
    pub fn players(&self) -> &[String] {
        self.focus.roster()
    }

    // Map assets

    /// Install a fetched map definition. An unusable calibration is reported like a failed fetch.
    pub fn set_map_definition(&mut self, name: &str, definition: MapDefinition) -> bool {
        if !definition.is_valid() {
            self.map_asset_failed(name, &format!("unusable map definition {definition:?}"));
            return false;
        }
        let accepted = self.world.set_map_definition(name, definition);
        if accepted {
            log::info!("Map data loaded for {name}");
        }
        accepted
    }

    pub fn set_map_image_size(&mut self, name: &str, size: Vec2) -> bool {
        let accepted = self.world.set_map_image_size(name, size);
        if accepted {
            log::info!("Map image loaded for {name} ({}x{})", size.x, size.y);
        }
        accepted
    }

    pub fn map_asset_failed(&self, name: &str, reason: &str) {
        log::error!("Error loading assets for map {name}: {reason}");
    }

    // Settings

    pub fn set_config(&mut self, config: RadarConfig) {
        self.conn.set_settings(config.network);
        self.interpolator.set_strength(config.network.interpolation_strength);
        self.config = config;
    }

    pub fn set_focus(&mut self, name: &str) {
        self.focus.set_target(FocusTarget::from_name(name));
        if let Some(data) = self.world.in_match() {
            self.focus.observe(data);
        }
    }

    pub fn set_viewport(&mut self, mode: ViewportMode) {
        self.config.render.viewport = mode;
    }

    pub fn set_rotate(&mut self, rotate: bool) {
        self.config.render.rotate = rotate;
    }

    pub fn set_rotation_paused(&mut self, paused: bool) {
        self.focus.set_paused(paused);
    }

    pub fn set_show_names(&mut self, show: bool) {
        self.config.render.show_names = show;
    }

    pub fn set_show_weapons(&mut self, show: bool) {
        self.config.render.show_weapons = show;
    }

    pub fn set_show_money(&mut self, show: bool) {
        self.config.render.show_money = show;
    }

    pub fn set_show_health(&mut self, show: bool) {
        self.config.render.show_health = show;
    }

    pub fn set_show_stats(&mut self, show: bool) {
        self.config.render.show_stats = show;
    }

    pub fn set_performance_mode(&mut self, enabled: bool) {
        self.config.set_performance_mode(enabled);
        self.interpolator.set_strength(self.config.network.interpolation_strength);
        self.conn.set_settings(self.config.network);
    }

    pub fn set_interpolation_strength(&mut self, strength: f32) {
        self.interpolator.set_strength(strength);
        self.config.network.interpolation_strength = self.interpolator.strength();
        self.conn.set_settings(self.config.network);
    }

    pub fn set_use_interpolation(&mut self, enabled: bool) {
        if !enabled {
            self.interpolator.clear();
        }
        self.config.network.use_interpolation = enabled;
        self.conn.set_settings(self.config.network);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::projection::Rect;
    use protocol::packets::ClientCommand;
    use protocol::{BombStatus, CompressionLevel, FrameFlag, PlayerData, Team, Vec3, build_frame, deflate};

    const CANVAS: Vec2 = Vec2::new(1024.0, 1024.0);

    fn local_player(x: f32, y: f32, yaw: f32) -> EntityData {
        EntityData::Player(PlayerData {
            pos: Vec3::new(x, y, 0.0),
            yaw,
            team: Team::Local,
            has_bomb: false,
            has_awp: false,
            is_scoped: false,
            is_dormant: false,
            name: "me".into(),
            weapon_id: 7,
            money: Some(800),
            health: Some(100),
        })
    }

    fn snapshot(entities: Vec<EntityData>) -> RadarData {
        RadarData {
            freq: 64,
            in_match: true,
            map_name: Some("de_test".into()),
            money_reveal_enabled: None,
            entities,
            bomb: BombStatus::default(),
        }
    }

    fn binary(data: &RadarData) -> NetEvent {
        let json = serde_json::to_vec(data).unwrap();
        NetEvent::Message(Incoming::Binary(build_frame(FrameFlag::Raw, &json).to_vec()))
    }

    fn open_client(config: RadarConfig) -> RadarClient {
        let mut client = RadarClient::new(config);
        assert_eq!(client.start(), vec![Action::Connect]);
        client.handle(NetEvent::Opened, 0.0);
        client
    }

    fn ready_client(config: RadarConfig) -> RadarClient {
        let mut client = open_client(config);
        client.tick(0.0, CANVAS);
        let actions = client.handle(binary(&snapshot(vec![local_player(0.0, 0.0, 0.0)])), 10.0);
        assert!(actions.contains(&Action::LoadMap("de_test".into())));
        client.set_map_definition("de_test", MapDefinition { pos_x: 0.0, pos_y: 0.0, scale: 1.0 });
        client.set_map_image_size("de_test", Vec2::splat(1024.0));
        client
    }

    fn flat_config() -> RadarConfig {
        let mut config = RadarConfig::default();
        config.render.viewport = ViewportMode::Full;
        config.render.rotate = false;
        config
    }

    fn active(scene: &Scene) -> &ActiveScene {
        match &scene.state {
            SceneState::Active(active) => active,
            other => panic!("expected active scene, got {other:?}"),
        }
    }

    #[test]
    fn test_status_messages() {
        let mut client = RadarClient::new(RadarConfig::default());
        let scene = client.tick(0.0, CANVAS).scene;
        assert_eq!(scene.state, SceneState::NoData { message: STATUS_DISCONNECTED });

        client.start();
        client.handle(NetEvent::Opened, 0.0);
        let scene = client.tick(1.0, CANVAS).scene;
        assert_eq!(scene.state, SceneState::NoData { message: STATUS_NOT_ON_SERVER });
    }

    #[test]
    fn test_loading_until_assets_arrive() {
        let mut client = open_client(RadarConfig::default());
        client.tick(0.0, CANVAS);
        client.handle(binary(&snapshot(vec![local_player(0.0, 0.0, 0.0)])), 10.0);
        assert_eq!(client.tick(20.0, CANVAS).scene.state, SceneState::Loading);

        // Stale completion for another map changes nothing
        assert!(!client.set_map_definition("de_other", MapDefinition { pos_x: 0.0, pos_y: 0.0, scale: 1.0 }));
        client.set_map_definition("de_test", MapDefinition { pos_x: 0.0, pos_y: 0.0, scale: 1.0 });
        assert_eq!(client.tick(30.0, CANVAS).scene.state, SceneState::Loading);
        client.set_map_image_size("de_test", Vec2::splat(1024.0));
        assert!(matches!(client.tick(40.0, CANVAS).scene.state, SceneState::Active(_)));
    }

    #[test]
    fn test_local_player_at_origin_lands_on_canvas_origin() {
        let mut client = ready_client(flat_config());
        let tick = client.tick(1_000.0, CANVAS);
        let scene = active(&tick.scene);
        assert_eq!(scene.rotation, None);
        let Marker::Player(marker) = &scene.markers[0] else {
            panic!("expected a player marker")
        };
        assert_eq!(marker.pos, Vec2::ZERO);
        assert!(marker.focused);
        assert_eq!(marker.heading, 0.0);
    }

    #[test]
    fn test_unknown_flag_leaves_world_untouched() {
        let mut client = ready_client(flat_config());
        client.tick(20.0, CANVAS);
        assert!(client.connection().is_pending());
        let before = client.world().current().cloned();

        let actions = client.handle(NetEvent::Message(Incoming::Binary(vec![0x07, b'{', b'}'])), 30.0);
        assert_eq!(actions, vec![Action::ClearTimeout]);
        assert!(!client.connection().is_pending());
        assert_eq!(client.world().current().cloned(), before);
    }

    #[test]
    fn test_compressed_and_raw_snapshots_render_the_same() {
        let data = snapshot(vec![local_player(100.0, -200.0, 45.0)]);
        let json = serde_json::to_vec(&data).unwrap();
        let gz = build_frame(FrameFlag::Compressed, &deflate(&json, CompressionLevel::Fast).unwrap());

        let mut a = ready_client(flat_config());
        let mut b = ready_client(flat_config());
        a.tick(20.0, CANVAS);
        b.tick(20.0, CANVAS);
        a.handle(binary(&data), 30.0);
        b.handle(NetEvent::Message(Incoming::Binary(gz.to_vec())), 30.0);

        assert_eq!(a.world().current(), b.world().current());
        assert_eq!(a.tick(500.0, CANVAS).scene, b.tick(500.0, CANVAS).scene);
    }

    #[test]
    fn test_match_end_unloads_and_clears_records() {
        let mut client = ready_client(RadarConfig::default());
        assert!(!client.interpolator().is_empty());

        client.tick(20.0, CANVAS);
        let actions = client.handle(binary(&RadarData::empty(64)), 30.0);
        assert!(actions.contains(&Action::UnloadMap));
        assert!(client.interpolator().is_empty());
        assert!(client.world().map().is_none());
        assert!(matches!(client.tick(40.0, CANVAS).scene.state, SceneState::NoData { .. }));
    }

    #[test]
    fn test_remote_close_ends_session() {
        let mut client = ready_client(RadarConfig::default());
        let actions = client.handle(NetEvent::Closed, 50.0);
        assert!(actions.contains(&Action::UnloadMap));
        assert!(actions.contains(&Action::ScheduleReconnect { delay_ms: 1000 }));
        assert!(client.interpolator().is_empty());
        assert_eq!(
            client.tick(60.0, CANVAS).scene.state,
            SceneState::NoData { message: STATUS_DISCONNECTED }
        );
    }

    #[test]
    fn test_control_message_and_money_toggle() {
        let mut client = open_client(RadarConfig::default());
        assert_eq!(client.toggle_money_reveal(), vec![Action::Send(ClientCommand::ToggleMoneyReveal)]);
        client.handle(
            NetEvent::Message(Incoming::Text(
                r#"{"action":"toggleMoneyReveal","status":"success","enabled":true}"#.into(),
            )),
            5.0,
        );
        assert_eq!(client.money_reveal_enabled(), Some(true));
        assert!(!client.connection().is_pending());
    }

    #[test]
    fn test_server_error_releases_request() {
        let mut client = open_client(RadarConfig::default());
        let tick = client.tick(0.0, CANVAS);
        assert!(tick.actions.contains(&Action::Send(ClientCommand::RequestInfo)));
        client.handle(NetEvent::Message(Incoming::Text("error".into())), 10.0);
        assert!(!client.connection().is_pending());
        assert!(client.tick(16.0, CANVAS).actions.contains(&Action::Send(ClientCommand::RequestInfo)));
    }

    #[test]
    fn test_rotation_uses_focused_heading() {
        let mut config = flat_config();
        config.render.rotate = true;
        let mut client = open_client(config);
        client.tick(0.0, CANVAS);
        // Both near the canvas center so the rotation keeps them on screen
        let mut other = local_player(522.0, -522.0, 135.0);
        if let EntityData::Player(p) = &mut other {
            p.team = Team::Enemy;
            p.name = "them".into();
        }
        client.handle(binary(&snapshot(vec![local_player(512.0, -512.0, 45.0), other])), 10.0);
        client.set_map_definition("de_test", MapDefinition { pos_x: 0.0, pos_y: 0.0, scale: 1.0 });
        client.set_map_image_size("de_test", Vec2::splat(1024.0));

        let scene = client.tick(100.0, CANVAS).scene;
        let scene = active(&scene);
        assert_eq!(scene.rotation, Some(315.0));
        let headings: Vec<f32> = scene
            .markers
            .iter()
            .filter_map(|m| match m {
                Marker::Player(p) => Some(p.heading),
                Marker::Bomb(_) => None,
            })
            .collect();
        assert_eq!(headings, [90.0, 180.0]);

        client.set_rotation_paused(true);
        let scene = client.tick(200.0, CANVAS).scene;
        assert_eq!(active(&scene).rotation, None);
        assert!(scene.stats.unwrap().ends_with("Rotation: Manually Disabled"));
    }

    #[test]
    fn test_performance_mode_hides_annotations() {
        let mut client = ready_client(flat_config());
        client.set_performance_mode(true);
        assert_eq!(client.interpolator().strength(), 0.85);
        let scene = client.tick(100.0, CANVAS).scene;
        let Marker::Player(marker) = &active(&scene).markers[0] else {
            panic!("expected a player marker")
        };
        assert!(marker.annotations.is_empty());
    }

    fn player(name: &str, team: Team, x: f32, y: f32, dormant: bool) -> EntityData {
        let mut entity = local_player(x, y, 0.0);
        if let EntityData::Player(p) = &mut entity {
            p.name = name.into();
            p.team = team;
            p.is_dormant = dormant;
        }
        entity
    }

    fn loaded_client(config: RadarConfig, entities: Vec<EntityData>) -> RadarClient {
        let mut client = open_client(config);
        client.tick(0.0, CANVAS);
        client.handle(binary(&snapshot(entities)), 10.0);
        client.set_map_definition("de_test", MapDefinition { pos_x: 0.0, pos_y: 0.0, scale: 1.0 });
        client.set_map_image_size("de_test", Vec2::splat(1024.0));
        client
    }

    #[test]
    fn test_unusable_map_definition_keeps_loading() {
        let mut client = open_client(RadarConfig::default());
        client.tick(0.0, CANVAS);
        client.handle(binary(&snapshot(vec![local_player(0.0, 0.0, 0.0)])), 10.0);
        client.set_map_image_size("de_test", Vec2::splat(1024.0));

        assert!(!client.set_map_definition("de_test", MapDefinition { pos_x: 0.0, pos_y: 0.0, scale: 0.0 }));
        assert!(!client.set_map_definition("de_test", MapDefinition { pos_x: 0.0, pos_y: 0.0, scale: -2.0 }));
        assert_eq!(client.tick(20.0, CANVAS).scene.state, SceneState::Loading);
    }

    #[test]
    fn test_zero_centered_zoom_draws_full_map() {
        let mut config = RadarConfig::default();
        config.render.rotate = false;
        config.render.centered_zoom = 0.0;
        let mut client = loaded_client(config, vec![local_player(100.0, -100.0, 0.0)]);

        let scene = client.tick(1_000.0, CANVAS).scene;
        let scene = active(&scene);
        assert_eq!(scene.source, Rect::new(Vec2::ZERO, Vec2::splat(1024.0)));
        let Marker::Player(marker) = &scene.markers[0] else {
            panic!("expected a player marker")
        };
        assert_eq!(marker.pos, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_dormant_player_does_not_stretch_bounding_box() {
        let mut config = flat_config();
        config.render.viewport = ViewportMode::BoundingBox;
        let live = vec![local_player(100.0, -100.0, 0.0), player("them", Team::Enemy, 300.0, -200.0, false)];
        let mut with_dormant = live.clone();
        with_dormant.push(player("gone", Team::Enemy, 4000.0, -4000.0, true));

        let mut a = loaded_client(config.clone(), live);
        let mut b = loaded_client(config, with_dormant);
        let scene_a = a.tick(500.0, CANVAS).scene;
        let scene_b = b.tick(500.0, CANVAS).scene;
        let (source_a, source_b) = (active(&scene_a).source, active(&scene_b).source);

        assert_eq!(source_a, source_b);
        // Live players plus the 50 px margin, squared up for the canvas
        assert_eq!(source_a.min, Vec2::new(50.0, 0.0));
        assert_eq!(source_a.size, Vec2::splat(300.0));
    }

    #[test]
    fn test_text_snapshot_answers_pending_request() {
        let mut client = open_client(flat_config());
        let tick = client.tick(0.0, CANVAS);
        let generation = tick
            .actions
            .iter()
            .find_map(|a| match a {
                Action::ArmTimeout { generation, .. } => Some(*generation),
                _ => None,
            })
            .unwrap();

        // First attempt times out and is retried
        let retry = client.handle(NetEvent::RequestTimeout { generation }, 5_000.0);
        assert!(retry.contains(&Action::Send(ClientCommand::RequestInfo)));
        assert_eq!(client.connection().retry_count(), 1);

        let json = serde_json::to_string(&snapshot(vec![local_player(0.0, 0.0, 0.0)])).unwrap();
        let actions = client.handle(NetEvent::Message(Incoming::Text(json)), 5_040.0);
        assert!(actions.contains(&Action::ClearTimeout));
        assert!(actions.contains(&Action::LoadMap("de_test".into())));
        assert!(!client.connection().is_pending());
        assert_eq!(client.connection().retry_count(), 0);
        assert_eq!(client.connection().rtt().len(), 1);
        assert_eq!(client.connection().average_rtt(), 40.0);
        assert!(client.tick(5_050.0, CANVAS).actions.contains(&Action::Send(ClientCommand::RequestInfo)));
    }

    #[test]
    fn test_centered_view_follows_blended_anchor() {
        let mut config = RadarConfig::default();
        config.render.rotate = false;
        assert_eq!(config.render.viewport, ViewportMode::Centered);
        assert!(config.network.use_interpolation);
        let mut client = loaded_client(config, vec![local_player(0.0, 0.0, 0.0)]);

        client.tick(20.0, CANVAS);
        client.handle(binary(&snapshot(vec![local_player(100.0, 0.0, 0.0)])), 30.0);

        // Halfway through the 50 ms blend window
        let scene = client.tick(55.0, CANVAS).scene;
        let source = active(&scene).source;
        let center = source.min + source.size * 0.5;
        let expected = 100.0 * crate::interpolation::blend_factor(25.0, client.connection().average_rtt(), 0.6);
        assert!((center.x - expected).abs() < 1e-3, "center {center:?}, expected x {expected}");
        assert!(center.y.abs() < 1e-3);
        assert!(center.x < 100.0);
        assert_eq!(source.size, Vec2::splat(512.0));
    }
}
