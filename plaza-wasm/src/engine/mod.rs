use crate::host::{JsAssetLoader, JsObserver, JsSceneFactory, WsSink};
use crate::logger::Logger;
use crate::media::RtcPeerFactory;
use plaza_client::{
    ClientConfig, ClientError, ClientHost, ClientSessionController, ConnectionState, SocketSink,
};
use plaza_core::{ProximityThresholds, RoomId, UserId};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

mod ws_setup_impl;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

/// Options object passed from the page. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    pub required_assets: Vec<String>,
    pub avatar_base_url: String,
    pub ice_servers: Option<Vec<IceServerConfig>>,
    pub near: u32,
    pub far: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let config = ClientConfig::default();
        Self {
            required_assets: config.required_assets,
            avatar_base_url: config.avatar_base_url,
            ice_servers: None,
            near: config.thresholds.near,
            far: config.thresholds.far,
        }
    }
}

/// Everything the page hears about, as `{ kind: ..., ... }` objects.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub(crate) enum ClientEvent {
    UserIdAssigned {
        user_id: String,
    },
    StateChanged {
        state: String,
    },
    Readiness {
        ready: bool,
        outstanding: Vec<String>,
    },
    MovementCorrected {
        x: i32,
        y: i32,
    },
    Chat {
        user_id: String,
        message: String,
        private: bool,
    },
    RemoteMedia {
        user_id: String,
        is_audio_muted: bool,
        is_video_off: bool,
    },
    Negotiation {
        user_id: String,
        status: String,
    },
    RenderLoop {
        running: bool,
    },
    PlaceLocal {
        x: i32,
        y: i32,
    },
    SpawnRemote {
        user_id: String,
        x: i32,
        y: i32,
        avatar: Option<String>,
    },
    MoveRemote {
        user_id: String,
        x: i32,
        y: i32,
    },
    DespawnRemote {
        user_id: String,
    },
    SceneDestroyed,
}

/// The page's `onEvent` callback.
#[derive(Clone)]
pub(crate) struct EventSink {
    callback: js_sys::Function,
}

impl EventSink {
    fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        match serde_wasm_bindgen::to_value(&event) {
            Ok(value) => self.emit_value(&value),
            Err(e) => Logger::warn(&format!("Failed to encode event {:?}: {}", event, e)),
        }
    }

    /// For payloads serde cannot carry, such as DOM elements.
    pub(crate) fn emit_value(&self, value: &JsValue) {
        if let Err(e) = self.callback.call1(&JsValue::NULL, value) {
            Logger::error("onEvent threw", &e);
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WeightView {
    user_id: String,
    proximity: f32,
    gain: f32,
    opacity: f32,
}

/// A room visit driven from JavaScript.
///
/// `host` must provide `onEvent(event)`, `buildScene()` and
/// `loadAsset(url)`; `isWalkable(x, y)` is optional.
#[wasm_bindgen]
pub struct PlazaClient {
    controller: ClientSessionController,
    socket: Rc<WsSink>,
    local_stream: Rc<RefCell<Option<web_sys::MediaStream>>>,
}

#[wasm_bindgen]
impl PlazaClient {
    #[wasm_bindgen(constructor)]
    pub fn new(url: String, options: JsValue, host: JsValue) -> Result<PlazaClient, JsValue> {
        let options: ClientOptions = if options.is_undefined() || options.is_null() {
            ClientOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };

        let events = EventSink::new(host_fn(&host, "onEvent")?);
        let socket = Rc::new(WsSink::new(web_sys::WebSocket::new(&url)?));
        let local_stream = Rc::new(RefCell::new(None));

        let config = ClientConfig {
            required_assets: options.required_assets,
            avatar_base_url: options.avatar_base_url,
            thresholds: ProximityThresholds {
                near: options.near,
                far: options.far,
            },
        };
        let controller = ClientSessionController::new(
            config,
            ClientHost {
                socket: Rc::clone(&socket) as Rc<dyn SocketSink>,
                scenes: Rc::new(JsSceneFactory::new(
                    host_fn(&host, "buildScene")?,
                    optional_host_fn(&host, "isWalkable"),
                    events.clone(),
                )),
                assets: Rc::new(JsAssetLoader::new(host_fn(&host, "loadAsset")?)),
                peers: Rc::new(RtcPeerFactory::new(
                    options.ice_servers,
                    Rc::clone(&local_stream),
                    events.clone(),
                )),
                observer: Rc::new(JsObserver::new(events)),
            },
        );

        controller.connecting();
        let client = PlazaClient {
            controller,
            socket,
            local_stream,
        };
        client.ws_setup()?;
        Ok(client)
    }

    /// Resolves once the scene is up and queued messages have been replayed.
    pub fn build_scene(&self) -> js_sys::Promise {
        let controller = self.controller.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            controller
                .build_scene()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(to_js)
        })
    }

    pub fn load_assets(&self) -> js_sys::Promise {
        let controller = self.controller.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            controller
                .load_assets()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(to_js)
        })
    }

    pub fn request_join(&self, room_id: String, auth_token: String) -> Result<(), JsValue> {
        self.controller
            .request_join(RoomId::from(room_id), auth_token)
            .map_err(to_js)
    }

    pub fn move_to(&self, x: i32, y: i32) -> Result<(), JsValue> {
        self.controller.move_to(x, y).map_err(to_js)
    }

    pub fn send_chat(&self, message: String, targets: Option<Vec<String>>) -> Result<(), JsValue> {
        let targets = targets.map(|ids| ids.into_iter().map(UserId::from).collect());
        self.controller.send_chat(message, targets).map_err(to_js)
    }

    pub fn set_local_media(&self, audio_muted: bool, video_off: bool) -> Result<(), JsValue> {
        self.controller
            .set_local_media(audio_muted, video_off)
            .map_err(to_js)
    }

    /// Tracks of this stream are added to every connection created afterwards.
    pub fn set_local_stream(&self, stream: web_sys::MediaStream) {
        *self.local_stream.borrow_mut() = Some(stream);
    }

    /// Call once per animation frame. Returns the weight applied to each peer.
    pub fn frame(&self) -> Result<JsValue, JsValue> {
        let weights: Vec<WeightView> = self
            .controller
            .frame()
            .into_iter()
            .map(|(user_id, weight)| WeightView {
                user_id: user_id.to_string(),
                proximity: weight.proximity,
                gain: weight.gain,
                opacity: weight.opacity,
            })
            .collect();
        Ok(serde_wasm_bindgen::to_value(&weights)?)
    }

    pub fn user_id(&self) -> Option<String> {
        self.controller.local_user().map(|id| id.to_string())
    }

    pub fn state(&self) -> String {
        format!("{:?}", self.controller.state())
    }

    /// Tears the visit down and closes the socket. Use `reconnect` to start over.
    pub fn reset(&self) {
        self.controller.reset();
    }

    /// Opens a new socket once the old one is gone, after `reset` or a drop.
    /// Joining again still goes through `request_join`, and after `reset`
    /// the scene and assets have to be prepared again first.
    pub fn reconnect(&self, url: String) -> Result<(), JsValue> {
        if self.controller.is_destroyed() {
            return Err(to_js(ClientError::Destroyed));
        }
        let state = self.controller.state();
        if state != ConnectionState::Disconnected {
            return Err(to_js(ClientError::InvalidState {
                expected: ConnectionState::Disconnected,
                actual: state,
            }));
        }

        let fresh = web_sys::WebSocket::new(&url)?;
        let old = self.socket.replace(fresh);
        detach_handlers(&old);
        let _ = old.close();

        Logger::info(&format!("Reconnecting to {}", url));
        self.controller.connecting();
        self.ws_setup()
    }

    pub fn destroy(self) {
        detach_handlers(&self.socket.current());
        self.controller.destroy();
    }
}

/// Stale sockets must not report into the controller.
fn detach_handlers(ws: &web_sys::WebSocket) {
    ws.set_onopen(None);
    ws.set_onmessage(None);
    ws.set_onclose(None);
    ws.set_onerror(None);
}

fn to_js(e: ClientError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn host_fn(host: &JsValue, name: &str) -> Result<js_sys::Function, JsValue> {
    optional_host_fn(host, name)
        .ok_or_else(|| JsValue::from_str(&format!("host.{} must be a function", name)))
}

fn optional_host_fn(host: &JsValue, name: &str) -> Option<js_sys::Function> {
    js_sys::Reflect::get(host, &JsValue::from_str(name))
        .ok()
        .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
}
