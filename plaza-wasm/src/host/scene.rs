use crate::engine::{ClientEvent, EventSink};
use crate::logger::Logger;
use async_trait::async_trait;
use plaza_client::{AssetId, ClientError, Scene, SceneFactory};
use plaza_core::{GridPosition, UserId};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

/// Rendering is owned by the page; the scene forwards every change as an event.
pub(crate) struct JsSceneFactory {
    build: js_sys::Function,
    is_walkable: Option<js_sys::Function>,
    events: EventSink,
}

impl JsSceneFactory {
    pub(crate) fn new(
        build: js_sys::Function,
        is_walkable: Option<js_sys::Function>,
        events: EventSink,
    ) -> Self {
        Self {
            build,
            is_walkable,
            events,
        }
    }
}

#[async_trait(?Send)]
impl SceneFactory for JsSceneFactory {
    async fn build(&self) -> Result<Box<dyn Scene>, ClientError> {
        let failed = |e: JsValue| ClientError::Scene(format!("{:?}", e));

        let value = self.build.call0(&JsValue::NULL).map_err(failed)?;
        JsFuture::from(js_sys::Promise::resolve(&value))
            .await
            .map_err(failed)?;

        Ok(Box::new(JsScene {
            is_walkable: self.is_walkable.clone(),
            events: self.events.clone(),
        }))
    }
}

struct JsScene {
    is_walkable: Option<js_sys::Function>,
    events: EventSink,
}

impl Scene for JsScene {
    fn start_render_loop(&mut self) {
        self.events.emit(ClientEvent::RenderLoop { running: true });
    }

    fn stop_render_loop(&mut self) {
        self.events.emit(ClientEvent::RenderLoop { running: false });
    }

    fn place_local_avatar(&mut self, at: GridPosition) {
        self.events.emit(ClientEvent::PlaceLocal { x: at.x, y: at.y });
    }

    fn spawn_remote(&mut self, user_id: &UserId, at: GridPosition, avatar: Option<&AssetId>) {
        self.events.emit(ClientEvent::SpawnRemote {
            user_id: user_id.to_string(),
            x: at.x,
            y: at.y,
            avatar: avatar.map(|asset| asset.0.clone()),
        });
    }

    fn move_remote(&mut self, user_id: &UserId, to: GridPosition) {
        self.events.emit(ClientEvent::MoveRemote {
            user_id: user_id.to_string(),
            x: to.x,
            y: to.y,
        });
    }

    fn despawn_remote(&mut self, user_id: &UserId) {
        self.events.emit(ClientEvent::DespawnRemote {
            user_id: user_id.to_string(),
        });
    }

    /// Without an `isWalkable` hook every tile is open.
    fn is_walkable(&self, at: GridPosition) -> bool {
        let Some(check) = &self.is_walkable else {
            return true;
        };
        match check.call2(&JsValue::NULL, &JsValue::from(at.x), &JsValue::from(at.y)) {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                Logger::error("isWalkable threw", &e);
                false
            }
        }
    }

    fn destroy(&mut self) {
        self.events.emit(ClientEvent::SceneDestroyed);
    }
}
