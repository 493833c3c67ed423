use crate::engine::{ClientEvent, EventSink};
use async_trait::async_trait;
use plaza_client::{
    AssetError, AssetId, AssetLoader, ClientError, ClientObserver, ConnectionState,
    NegotiationStatus, ReadinessGate, SocketSink,
};
use plaza_core::{ClientMessage, GridPosition, UserId};
use std::cell::RefCell;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

mod scene;

pub(crate) use scene::JsSceneFactory;

/// The page's current socket. `reconnect` swaps in a new one.
pub(crate) struct WsSink {
    ws: RefCell<web_sys::WebSocket>,
}

impl WsSink {
    pub(crate) fn new(ws: web_sys::WebSocket) -> Self {
        Self {
            ws: RefCell::new(ws),
        }
    }

    pub(crate) fn current(&self) -> web_sys::WebSocket {
        self.ws.borrow().clone()
    }

    pub(crate) fn replace(&self, ws: web_sys::WebSocket) -> web_sys::WebSocket {
        self.ws.replace(ws)
    }
}

impl SocketSink for WsSink {
    fn send(&self, msg: &ClientMessage) -> Result<(), ClientError> {
        let json = serde_json::to_string(msg).map_err(|e| ClientError::Socket(e.to_string()))?;
        self.ws
            .borrow()
            .send_with_str(&json)
            .map_err(|e| ClientError::Socket(format!("{:?}", e)))
    }

    fn close(&self) {
        let _ = self.ws.borrow().close();
    }
}

/// Calls the page's `loadAsset(url)`, which may return a value or a promise.
pub(crate) struct JsAssetLoader {
    load: js_sys::Function,
}

impl JsAssetLoader {
    pub(crate) fn new(load: js_sys::Function) -> Self {
        Self { load }
    }
}

#[async_trait(?Send)]
impl AssetLoader for JsAssetLoader {
    async fn load(&self, url: &str) -> Result<AssetId, AssetError> {
        let failed = |e: JsValue| AssetError {
            url: url.to_string(),
            reason: format!("{:?}", e),
        };

        let value = self
            .load
            .call1(&JsValue::NULL, &JsValue::from_str(url))
            .map_err(failed)?;
        let loaded = JsFuture::from(js_sys::Promise::resolve(&value))
            .await
            .map_err(failed)?;

        Ok(AssetId(loaded.as_string().unwrap_or_else(|| url.to_string())))
    }
}

pub(crate) struct JsObserver {
    events: EventSink,
}

impl JsObserver {
    pub(crate) fn new(events: EventSink) -> Self {
        Self { events }
    }
}

impl ClientObserver for JsObserver {
    fn user_id_assigned(&self, user_id: &UserId) {
        self.events.emit(ClientEvent::UserIdAssigned {
            user_id: user_id.to_string(),
        });
    }

    fn state_changed(&self, state: ConnectionState) {
        self.events.emit(ClientEvent::StateChanged {
            state: format!("{:?}", state),
        });
    }

    fn readiness_changed(&self, gate: &ReadinessGate) {
        self.events.emit(ClientEvent::Readiness {
            ready: gate.is_ready(),
            outstanding: gate
                .outstanding()
                .iter()
                .map(|step| format!("{:?}", step))
                .collect(),
        });
    }

    fn movement_corrected(&self, at: GridPosition) {
        self.events
            .emit(ClientEvent::MovementCorrected { x: at.x, y: at.y });
    }

    fn chat_received(&self, from: &UserId, message: &str, private: bool) {
        self.events.emit(ClientEvent::Chat {
            user_id: from.to_string(),
            message: message.to_string(),
            private,
        });
    }

    fn remote_media_changed(&self, user_id: &UserId, audio_muted: bool, video_off: bool) {
        self.events.emit(ClientEvent::RemoteMedia {
            user_id: user_id.to_string(),
            is_audio_muted: audio_muted,
            is_video_off: video_off,
        });
    }

    fn negotiation_status(&self, user_id: &UserId, status: NegotiationStatus) {
        self.events.emit(ClientEvent::Negotiation {
            user_id: user_id.to_string(),
            status: format!("{:?}", status),
        });
    }
}
