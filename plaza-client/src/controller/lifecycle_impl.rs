use crate::controller::ClientSessionController;
use crate::error::ClientError;
use crate::readiness::{ReadinessStep, StepStatus};
use crate::state::ConnectionState;
use plaza_core::{ClientMessage, RoomId};
use tracing::{debug, info, warn};

impl ClientSessionController {
    /// The platform started opening the socket.
    pub fn connecting(&self) {
        if self.state() == ConnectionState::Disconnected {
            self.set_state(ConnectionState::Connecting);
        }
    }

    /// The socket is open. Joining still needs an explicit `request_join`.
    ///
    /// Repeated open events for a socket that is already up are ignored.
    pub fn on_socket_open(&self) {
        {
            let inner = self.inner.borrow();
            if inner.destroyed {
                return;
            }
            if !matches!(
                inner.state,
                ConnectionState::Disconnected | ConnectionState::Connecting
            ) {
                debug!("Ignoring socket open while {:?}", inner.state);
                return;
            }
        }
        info!("Socket open");
        self.set_state(ConnectionState::Connected);
        self.set_step(ReadinessStep::Connected, StepStatus::Ready);
    }

    /// The server has dropped us from the room; remote peers are gone with it.
    /// The scene survives, so a later join starts from an empty room.
    pub fn on_socket_closed(&self) {
        if self.inner.borrow().destroyed {
            return;
        }
        info!("Socket closed");
        self.inner.borrow_mut().pending.clear();
        self.clear_remotes();
        self.services.media.close_all();
        self.set_state(ConnectionState::Disconnected);
        self.set_step(ReadinessStep::Connected, StepStatus::Pending);
    }

    /// Builds the render scene, then replays whatever arrived in the meantime.
    pub async fn build_scene(&self) -> Result<(), ClientError> {
        let epoch = {
            let inner = self.inner.borrow();
            if inner.destroyed {
                return Err(ClientError::Destroyed);
            }
            if inner.scene.is_some() {
                return Ok(());
            }
            inner.epoch
        };

        let built = self.services.scenes.build().await;

        let mut scene = match built {
            Ok(scene) => scene,
            Err(e) => {
                if self.is_current(epoch) {
                    warn!("Scene build failed: {}", e);
                    self.set_step(ReadinessStep::SceneBuilt, StepStatus::Failed(e.to_string()));
                }
                return Err(e);
            }
        };

        if !self.is_current(epoch) {
            debug!("Discarding scene built for a torn down visit");
            scene.destroy();
            return Err(ClientError::Cancelled);
        }

        scene.start_render_loop();
        self.inner.borrow_mut().scene = Some(scene);
        self.set_step(ReadinessStep::SceneBuilt, StepStatus::Ready);

        self.flush_pending(epoch).await;
        Ok(())
    }

    /// Loads every required asset into the cache. A failure only fails the
    /// `AssetsLoaded` step; calling again retries what is missing.
    pub async fn load_assets(&self) -> Result<(), ClientError> {
        let (epoch, urls) = {
            let inner = self.inner.borrow();
            if inner.destroyed {
                return Err(ClientError::Destroyed);
            }
            let missing: Vec<String> = inner
                .config
                .required_assets
                .iter()
                .filter(|url| !inner.asset_cache.contains_key(*url))
                .cloned()
                .collect();
            (inner.epoch, missing)
        };

        let retrying = matches!(
            self.readiness().status(ReadinessStep::AssetsLoaded),
            StepStatus::Failed(_)
        );
        if retrying {
            self.set_step(ReadinessStep::AssetsLoaded, StepStatus::Pending);
        }

        for url in urls {
            let loaded = self.services.assets.load(&url).await;
            if !self.is_current(epoch) {
                return Err(ClientError::Cancelled);
            }
            match loaded {
                Ok(asset) => {
                    self.inner.borrow_mut().asset_cache.insert(url, asset);
                }
                Err(e) => {
                    warn!("{}", e);
                    self.set_step(ReadinessStep::AssetsLoaded, StepStatus::Failed(e.to_string()));
                    return Err(e.into());
                }
            }
        }

        self.set_step(ReadinessStep::AssetsLoaded, StepStatus::Ready);
        Ok(())
    }

    /// Runs `callback` once every readiness step holds. Immediately if they
    /// already do. Cleared by `reset`.
    pub fn on_ready(&self, callback: impl FnOnce() + 'static) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return;
            }
            if !inner.gate.is_ready() {
                inner.ready_callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Sends the join request. Never sent automatically.
    pub fn request_join(&self, room_id: RoomId, auth_token: String) -> Result<(), ClientError> {
        {
            let inner = self.inner.borrow();
            if inner.destroyed {
                return Err(ClientError::Destroyed);
            }
            if inner.state != ConnectionState::Connected {
                return Err(ClientError::InvalidState {
                    expected: ConnectionState::Connected,
                    actual: inner.state,
                });
            }
            if !inner.gate.is_ready() {
                return Err(ClientError::NotReady(inner.gate.outstanding()));
            }
        }

        info!("Joining room {}", room_id);
        self.services.socket.send(&ClientMessage::Join {
            room_id,
            auth_token,
        })?;
        self.set_state(ConnectionState::Joining);
        Ok(())
    }

    /// Tears the visit down but keeps the controller usable.
    ///
    /// Stops rendering, destroys the scene with every entity, clears the
    /// pending queue and ready callbacks, closes media links and the socket.
    /// Async work still in flight finds a new epoch and does nothing.
    pub fn reset(&self) {
        let (scene, previous) = {
            let mut inner = self.inner.borrow_mut();
            inner.epoch += 1;
            inner.pending.clear();
            inner.flushing = false;
            inner.ready_callbacks.clear();
            inner.entities.clear();
            inner.spawning.clear();
            inner.local_user = None;
            inner.local_position = Default::default();
            inner.gate.reset();
            let previous = std::mem::replace(&mut inner.state, ConnectionState::Disconnected);
            (inner.scene.take(), previous)
        };

        if let Some(mut scene) = scene {
            debug!("Destroying scene");
            scene.stop_render_loop();
            scene.destroy();
        }
        self.services.media.close_all();

        if previous != ConnectionState::Disconnected {
            self.services.socket.close();
            self.services
                .observer
                .state_changed(ConnectionState::Disconnected);
        }
    }

    /// `reset` and release this handle. Later calls through other clones are no-ops.
    pub fn destroy(self) {
        if self.inner.borrow().destroyed {
            return;
        }
        self.reset();
        self.inner.borrow_mut().destroyed = true;
        info!("Controller destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    pub(crate) fn set_step(&self, step: ReadinessStep, status: StepStatus) {
        let (gate, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.gate.set(step, status) {
                return;
            }
            let callbacks = if inner.gate.is_ready() {
                std::mem::take(&mut inner.ready_callbacks)
            } else {
                Vec::new()
            };
            (inner.gate.clone(), callbacks)
        };

        self.services.observer.readiness_changed(&gate);
        for callback in callbacks {
            callback();
        }
    }
}
