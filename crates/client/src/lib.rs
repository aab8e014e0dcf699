// WASM client entry point for the web radar
// The browser glue lives here; everything it drives is plain Rust in the modules below.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::Vec2;
use js_sys::{ArrayBuffer, Uint8Array};
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, CloseEvent, HtmlCanvasElement, HtmlImageElement, MessageEvent, Response, WebSocket};

// Module structure - each module handles a specific concern
pub mod camera; // Focus target, map projection and viewport modes
pub mod config; // Render / network settings
pub mod game; // Radar state machine: snapshots, map lifecycle, scene building
pub mod interpolation; // Smoothing between snapshots
pub mod network; // WebSocket transport and request pacing
pub mod render; // Canvas drawing of a built scene
pub mod utils; // LERP, angles, timing

pub use game::RadarClient;

use camera::projection::{MapDefinition, ViewportMode};
use config::RadarConfig;
use network::session::{Action, EventQueue, Incoming, NetEvent};
use network::Connection;
use render::scene::{Scene, SceneState};
use render::Renderer;

/// Initialize panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // A second call only reports that the logger is already installed
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Browser-side state shared by socket handlers, timers and the animation loop.
struct Shared {
    client: RadarClient,
    renderer: Renderer,
    url: String,
    connection: Option<Connection>,
    timeout_handle: Option<i32>,
    map_image: Option<(String, HtmlImageElement)>,
    render_loop: bool,
}

/// Shared state plus what callbacks need without borrowing it.
struct Glue {
    state: RefCell<Shared>,
    /// Events that arrived while `state` was borrowed.
    events: EventQueue,
    /// Bumped on every connect; handlers of older sockets compare against it and go quiet.
    conn_id: Cell<u64>,
}

type Handle = Rc<Glue>;

#[wasm_bindgen]
pub struct RadarClientWrapper {
    shared: Handle,
}

#[wasm_bindgen]
impl RadarClientWrapper {
    /// Create the radar on the canvas with id `canvas_id`.
    /// `config` is an optional settings object (camelCase keys), defaults apply when omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, config: JsValue) -> Result<RadarClientWrapper, JsValue> {
        init();

        let config: RadarConfig = if config.is_undefined() || config.is_null() {
            RadarConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };

        let document = window().ok_or("No window")?.document().ok_or("No document")?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or("Canvas not found")?
            .dyn_into::<HtmlCanvasElement>()?;
        let renderer = Renderer::new(canvas)?;

        // Nothing is drawn until the channel opens; show the idle status meanwhile
        renderer.draw(
            &Scene {
                state: SceneState::NoData { message: "Disconnected" },
                stats: None,
            },
            None,
        )?;

        let shared = Rc::new(Glue {
            state: RefCell::new(Shared {
                client: RadarClient::new(config),
                renderer,
                url: network::page_endpoint()?,
                connection: None,
                timeout_handle: None,
                map_image: None,
                render_loop: false,
            }),
            events: EventQueue::new(),
            conn_id: Cell::new(0),
        });

        let actions = shared.state.borrow_mut().client.start();
        execute(&shared, actions);

        Ok(RadarClientWrapper { shared })
    }

    /// Focus a player by name; `YOU` (or an empty name) selects the local player.
    pub fn set_focus(&self, name: &str) {
        self.shared.state.borrow_mut().client.set_focus(name);
    }

    /// `full`, `centered` or `bbox`.
    pub fn set_viewport(&self, mode: &str) -> Result<(), JsValue> {
        let mode = mode.parse::<ViewportMode>().map_err(|e| JsValue::from_str(&e))?;
        self.shared.state.borrow_mut().client.set_viewport(mode);
        Ok(())
    }

    pub fn set_rotate(&self, rotate: bool) {
        self.shared.state.borrow_mut().client.set_rotate(rotate);
    }

    pub fn set_rotation_paused(&self, paused: bool) {
        self.shared.state.borrow_mut().client.set_rotation_paused(paused);
    }

    pub fn set_show_names(&self, show: bool) {
        self.shared.state.borrow_mut().client.set_show_names(show);
    }

    pub fn set_show_weapons(&self, show: bool) {
        self.shared.state.borrow_mut().client.set_show_weapons(show);
    }

    pub fn set_show_money(&self, show: bool) {
        self.shared.state.borrow_mut().client.set_show_money(show);
    }

    pub fn set_show_health(&self, show: bool) {
        self.shared.state.borrow_mut().client.set_show_health(show);
    }

    pub fn set_show_stats(&self, show: bool) {
        self.shared.state.borrow_mut().client.set_show_stats(show);
    }

    pub fn set_performance_mode(&self, enabled: bool) {
        self.shared.state.borrow_mut().client.set_performance_mode(enabled);
    }

    pub fn set_use_interpolation(&self, enabled: bool) {
        self.shared.state.borrow_mut().client.set_use_interpolation(enabled);
    }

    pub fn set_interpolation_strength(&self, strength: f32) {
        self.shared.state.borrow_mut().client.set_interpolation_strength(strength);
    }

    /// Ask the server to flip money reveal; the answer arrives as a control message.
    pub fn toggle_money_reveal(&self) {
        let actions = self.shared.state.borrow().client.toggle_money_reveal();
        execute(&self.shared, actions);
    }

    /// Last known server-side money reveal state, `undefined` until the server tells us.
    pub fn money_reveal_enabled(&self) -> Option<bool> {
        self.shared.state.borrow().client.money_reveal_enabled()
    }

    /// Names for the focus picker, as a JS array of strings.
    pub fn players(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(self.shared.state.borrow().client.players())?)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state.borrow().client.connection().is_open()
    }

    /// Average round trip time in milliseconds.
    pub fn rtt(&self) -> f64 {
        self.shared.state.borrow().client.connection().average_rtt()
    }
}

/// Feed one event to the radar state machine and carry out what it asks for.
///
/// While the client is borrowed the event waits in the queue; the borrower drains it.
fn dispatch(shared: &Handle, event: NetEvent) {
    shared.events.push(event);
    drain_events(shared);
}

fn drain_events(shared: &Handle) {
    let handled = shared.events.drain(
        &shared.state,
        |state, event| state.client.handle(event, utils::now()),
        |actions| execute(shared, actions),
    );
    if handled > 1 {
        log::debug!("Handled {handled} queued events");
    }
}

fn execute(shared: &Handle, actions: Vec<Action>) {
    for action in actions {
        if let Err(e) = execute_one(shared, action) {
            log::error!("Action failed: {e:?}");
        }
    }
}

fn execute_one(shared: &Handle, action: Action) -> Result<(), JsValue> {
    match action {
        Action::Connect => connect(shared),
        Action::Send(command) => {
            let state = shared.state.borrow();
            match &state.connection {
                Some(connection) => connection.send(command),
                None => Err(JsValue::from_str("No connection")),
            }
        }
        Action::ArmTimeout { generation, delay_ms } => {
            clear_request_timeout(shared)?;
            let handle = schedule(shared, delay_ms, NetEvent::RequestTimeout { generation })?;
            shared.state.borrow_mut().timeout_handle = Some(handle);
            Ok(())
        }
        Action::ClearTimeout => clear_request_timeout(shared),
        Action::Close => {
            if let Some(connection) = &shared.state.borrow().connection {
                connection.close();
            }
            Ok(())
        }
        Action::ScheduleReconnect { delay_ms } => {
            log::info!("Reconnecting in {delay_ms} ms");
            schedule(shared, delay_ms, NetEvent::ReconnectTimer).map(drop)
        }
        Action::SchedulePing { epoch, delay_ms } => {
            schedule(shared, delay_ms, NetEvent::PingTimer { epoch }).map(drop)
        }
        Action::StartRenderLoop => {
            if !shared.state.borrow().render_loop {
                setup_animation_loop(shared.clone())?;
                shared.state.borrow_mut().render_loop = true;
            }
            Ok(())
        }
        Action::LoadMap(name) => {
            load_map_image(shared, &name)?;
            wasm_bindgen_futures::spawn_local(load_map_definition(Rc::downgrade(shared), name));
            Ok(())
        }
        Action::UnloadMap => {
            shared.state.borrow_mut().map_image = None;
            Ok(())
        }
    }
}

fn connect(shared: &Handle) -> Result<(), JsValue> {
    let url = {
        let mut state = shared.state.borrow_mut();
        if let Some(old) = state.connection.take() {
            old.detach();
            old.close();
        }
        state.url.clone()
    };
    let id = shared.conn_id.get() + 1;
    shared.conn_id.set(id);

    match Connection::open(&url) {
        Ok(connection) => {
            attach_websocket_handlers(shared, connection.websocket(), id);
            shared.state.borrow_mut().connection = Some(connection);
            Ok(())
        }
        Err(e) => {
            // Treated like a close so the usual reconnect applies
            log::error!("Failed to open {url}: {e:?}");
            dispatch(shared, NetEvent::Closed);
            Ok(())
        }
    }
}

fn attach_websocket_handlers(shared: &Handle, ws: &WebSocket, id: u64) {
    // Events from a socket that has since been replaced are dropped
    let current = move |weak: &Weak<Glue>| weak.upgrade().filter(|glue| glue.conn_id.get() == id);

    let weak = Rc::downgrade(shared);
    let onopen = Closure::wrap(Box::new(move |_event: JsValue| {
        if let Some(shared) = current(&weak) {
            log::info!("WebSocket connected");
            dispatch(&shared, NetEvent::Opened);
        }
    }) as Box<dyn FnMut(JsValue)>);
    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    onopen.forget();

    let weak = Rc::downgrade(shared);
    let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
        let Some(shared) = current(&weak) else { return };
        let data = event.data();
        let frame = if let Ok(buffer) = data.dyn_into::<ArrayBuffer>() {
            Incoming::Binary(Uint8Array::new(&buffer).to_vec())
        } else if let Some(text) = event.data().as_string() {
            Incoming::Text(text)
        } else {
            log::warn!("Ignoring message of unexpected type");
            return;
        };
        dispatch(&shared, NetEvent::Message(frame));
    }) as Box<dyn FnMut(MessageEvent)>);
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    let weak = Rc::downgrade(shared);
    let onerror = Closure::wrap(Box::new(move |e: JsValue| {
        if let Some(shared) = current(&weak) {
            dispatch(&shared, NetEvent::Error(format!("{e:?}")));
        }
    }) as Box<dyn FnMut(JsValue)>);
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    let weak = Rc::downgrade(shared);
    let onclose = Closure::wrap(Box::new(move |event: CloseEvent| {
        if let Some(shared) = current(&weak) {
            log::info!("WebSocket closed: {}", event.code());
            dispatch(&shared, NetEvent::Closed);
        }
    }) as Box<dyn FnMut(CloseEvent)>);
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();
}

/// One-shot timer that delivers `event` after `delay_ms`.
fn schedule(shared: &Handle, delay_ms: u32, event: NetEvent) -> Result<i32, JsValue> {
    let window = window().ok_or("No window")?;
    let weak = Rc::downgrade(shared);
    let callback = Closure::once_into_js(move || {
        if let Some(shared) = weak.upgrade() {
            dispatch(&shared, event);
        }
    });
    window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay_ms.min(i32::MAX as u32) as i32,
    )
}

fn clear_request_timeout(shared: &Handle) -> Result<(), JsValue> {
    if let Some(handle) = shared.state.borrow_mut().timeout_handle.take() {
        window().ok_or("No window")?.clear_timeout_with_handle(handle);
    }
    Ok(())
}

fn setup_animation_loop(shared: Handle) -> Result<(), JsValue> {
    let window = window().ok_or("No window")?;

    // Create animation frame closure
    let f: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        let actions = match shared.state.try_borrow_mut() {
            Ok(mut state) => {
                let size = state.renderer.size();
                let tick = state.client.tick(utils::now(), size);
                let image = state.map_image.as_ref().map(|(_, image)| image);
                if let Err(e) = state.renderer.draw(&tick.scene, image) {
                    log::error!("Render error: {e:?}");
                }
                tick.actions
            }
            Err(_) => Vec::new(),
        };
        execute(&shared, actions);
        // Anything that arrived during the frame
        drain_events(&shared);

        // Request next frame
        if let (Some(win), Some(callback)) = (web_sys::window(), f.borrow().as_ref()) {
            win.request_animation_frame(callback.as_ref().unchecked_ref()).ok();
        }
    }) as Box<dyn FnMut()>));

    // Start the loop
    if let Some(callback) = g.borrow().as_ref() {
        window.request_animation_frame(callback.as_ref().unchecked_ref())?;
    }

    Ok(())
}

fn load_map_image(shared: &Handle, name: &str) -> Result<(), JsValue> {
    let image = HtmlImageElement::new()?;

    let weak = Rc::downgrade(shared);
    let loaded = image.clone();
    let map = name.to_string();
    let onload = Closure::once_into_js(move || {
        let Some(shared) = weak.upgrade() else { return };
        let mut state = shared.state.borrow_mut();
        let size = Vec2::new(loaded.natural_width() as f32, loaded.natural_height() as f32);
        if state.client.set_map_image_size(&map, size) {
            state.map_image = Some((map, loaded));
        }
    });
    image.set_onload(Some(onload.unchecked_ref()));

    let weak = Rc::downgrade(shared);
    let map = name.to_string();
    let onerror = Closure::once_into_js(move || {
        if let Some(shared) = weak.upgrade() {
            shared.state.borrow().client.map_asset_failed(&map, "radar image failed to load");
        }
    });
    image.set_onerror(Some(onerror.unchecked_ref()));

    image.set_src(&format!("assets/image/{name}_radar_psd.png"));
    Ok(())
}

async fn load_map_definition(shared: Weak<Glue>, name: String) {
    let result = fetch_json::<MapDefinition>(&format!("assets/json/{name}.json")).await;
    let Some(shared) = shared.upgrade() else { return };
    match result {
        Ok(definition) => {
            shared.state.borrow_mut().client.set_map_definition(&name, definition);
        }
        Err(e) => shared.state.borrow().client.map_asset_failed(&name, &format!("{e:?}")),
    }
}

async fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<T, JsValue> {
    let window = window().ok_or("No window")?;
    let response: Response = JsFuture::from(window.fetch_with_str(url)).await?.dyn_into()?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!("{url}: HTTP {}", response.status())));
    }
    let json = JsFuture::from(response.json()?).await?;
    Ok(serde_wasm_bindgen::from_value(json)?)
}
