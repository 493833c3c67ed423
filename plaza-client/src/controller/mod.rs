//! One room visit: connection state, readiness, pending queue and remote entities.

mod dispatch_impl;
mod entities_impl;
mod lifecycle_impl;


use crate::host::{AssetId, AssetLoader, ClientObserver, Scene, SceneFactory, SocketSink};
use crate::media::{MediaPeerFactory, ProximityMediaController};
use crate::readiness::ReadinessGate;
use crate::state::ConnectionState;
use plaza_core::{GridPosition, ProximityThresholds, ServerMessage, UserId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Assets that must load before a join request may be sent.
    pub required_assets: Vec<String>,
    /// Remote avatars are fetched from `{avatar_base_url}/{userId}.png`.
    pub avatar_base_url: String,
    pub thresholds: ProximityThresholds,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            required_assets: Vec::new(),
            avatar_base_url: "/avatars".to_string(),
            thresholds: ProximityThresholds::default(),
        }
    }
}

/// Platform collaborators, injected once when the controller is built.
pub struct ClientHost {
    pub socket: Rc<dyn SocketSink>,
    pub scenes: Rc<dyn SceneFactory>,
    pub assets: Rc<dyn AssetLoader>,
    pub peers: Rc<dyn MediaPeerFactory>,
    pub observer: Rc<dyn ClientObserver>,
}

struct Services {
    socket: Rc<dyn SocketSink>,
    scenes: Rc<dyn SceneFactory>,
    assets: Rc<dyn AssetLoader>,
    observer: Rc<dyn ClientObserver>,
    media: ProximityMediaController,
}

struct ControllerInner {
    config: ClientConfig,
    state: ConnectionState,
    /// Bumped by every reset. Async work captures it and bails out on mismatch.
    epoch: u64,
    destroyed: bool,
    gate: ReadinessGate,
    scene: Option<Box<dyn Scene>>,
    asset_cache: HashMap<String, AssetId>,
    pending: VecDeque<ServerMessage>,
    flushing: bool,
    ready_callbacks: Vec<Box<dyn FnOnce()>>,
    local_user: Option<UserId>,
    local_position: GridPosition,
    /// Remote entities that exist in the scene.
    entities: HashSet<UserId>,
    /// Remote entities being created, with the latest known position.
    spawning: HashMap<UserId, GridPosition>,
}

/// Drives one room visit on the client.
///
/// The handle is cheap to clone so platform callbacks can hold one; all
/// clones share the same visit.
#[derive(Clone)]
pub struct ClientSessionController {
    inner: Rc<RefCell<ControllerInner>>,
    services: Rc<Services>,
}

impl ClientSessionController {
    pub fn new(config: ClientConfig, host: ClientHost) -> Self {
        let media = ProximityMediaController::new(
            host.peers,
            Rc::clone(&host.socket),
            Rc::clone(&host.observer),
            config.thresholds,
        );

        Self {
            inner: Rc::new(RefCell::new(ControllerInner {
                config,
                state: ConnectionState::Disconnected,
                epoch: 0,
                destroyed: false,
                gate: ReadinessGate::new(),
                scene: None,
                asset_cache: HashMap::new(),
                pending: VecDeque::new(),
                flushing: false,
                ready_callbacks: Vec::new(),
                local_user: None,
                local_position: GridPosition::default(),
                entities: HashSet::new(),
                spawning: HashMap::new(),
            })),
            services: Rc::new(Services {
                socket: host.socket,
                scenes: host.scenes,
                assets: host.assets,
                observer: host.observer,
                media,
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.borrow().state
    }

    pub fn readiness(&self) -> ReadinessGate {
        self.inner.borrow().gate.clone()
    }

    pub fn local_user(&self) -> Option<UserId> {
        self.inner.borrow().local_user.clone()
    }

    pub fn local_position(&self) -> GridPosition {
        self.inner.borrow().local_position
    }

    pub fn media(&self) -> &ProximityMediaController {
        &self.services.media
    }

    pub fn pending_len(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Remote participants that currently have an entity, sorted.
    pub fn remote_entities(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.inner.borrow().entities.iter().cloned().collect();
        ids.sort();
        ids
    }

    fn set_state(&self, state: ConnectionState) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            std::mem::replace(&mut inner.state, state) != state
        };
        if changed {
            self.services.observer.state_changed(state);
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        let inner = self.inner.borrow();
        !inner.destroyed && inner.epoch == epoch
    }
}
