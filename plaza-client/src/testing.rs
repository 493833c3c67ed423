//! In-memory stand-ins for the platform seams.

use crate::error::{AssetError, ClientError, MediaError};
use crate::host::{AssetId, AssetLoader, ClientObserver, Scene, SceneFactory, SocketSink};
use crate::media::{MediaPeer, MediaPeerFactory, PeerHandle};
use crate::readiness::ReadinessGate;
use crate::state::{ConnectionState, NegotiationStatus};
use async_trait::async_trait;
use plaza_core::{ClientMessage, GridPosition, UserId};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Suspends once so that sibling futures in a `join!` get to run.
pub fn yield_once() -> impl Future<Output = ()> {
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                return Poll::Ready(());
            }
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    YieldOnce(false)
}

#[derive(Default)]
pub struct FakeSocket {
    sent: RefCell<Vec<ClientMessage>>,
    closed: Cell<u32>,
}

impl FakeSocket {
    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent.borrow().clone()
    }

    pub fn close_count(&self) -> u32 {
        self.closed.get()
    }
}

impl SocketSink for FakeSocket {
    fn send(&self, msg: &ClientMessage) -> Result<(), ClientError> {
        self.sent.borrow_mut().push(msg.clone());
        Ok(())
    }

    fn close(&self) {
        self.closed.set(self.closed.get() + 1);
    }
}

/// What the scene saw, shared between the factory and the test.
#[derive(Default)]
pub struct SceneLog {
    pub spawn_calls: Vec<UserId>,
    pub remotes: HashMap<UserId, GridPosition>,
    pub local: Option<GridPosition>,
    pub rendering: bool,
    pub destroyed: u32,
    pub walls: HashSet<GridPosition>,
}

pub struct FakeScene {
    log: Rc<RefCell<SceneLog>>,
}

impl Scene for FakeScene {
    fn start_render_loop(&mut self) {
        self.log.borrow_mut().rendering = true;
    }

    fn stop_render_loop(&mut self) {
        self.log.borrow_mut().rendering = false;
    }

    fn place_local_avatar(&mut self, at: GridPosition) {
        self.log.borrow_mut().local = Some(at);
    }

    fn spawn_remote(&mut self, user_id: &UserId, at: GridPosition, _avatar: Option<&AssetId>) {
        let mut log = self.log.borrow_mut();
        log.spawn_calls.push(user_id.clone());
        log.remotes.insert(user_id.clone(), at);
    }

    fn move_remote(&mut self, user_id: &UserId, to: GridPosition) {
        self.log.borrow_mut().remotes.insert(user_id.clone(), to);
    }

    fn despawn_remote(&mut self, user_id: &UserId) {
        self.log.borrow_mut().remotes.remove(user_id);
    }

    fn is_walkable(&self, at: GridPosition) -> bool {
        !self.log.borrow().walls.contains(&at)
    }

    fn destroy(&mut self) {
        let mut log = self.log.borrow_mut();
        log.destroyed += 1;
        log.remotes.clear();
    }
}

#[derive(Default)]
pub struct FakeSceneFactory {
    pub log: Rc<RefCell<SceneLog>>,
    pub fail: Cell<bool>,
}

#[async_trait(?Send)]
impl SceneFactory for FakeSceneFactory {
    async fn build(&self) -> Result<Box<dyn Scene>, ClientError> {
        yield_once().await;
        if self.fail.get() {
            return Err(ClientError::Scene("no canvas".to_string()));
        }
        Ok(Box::new(FakeScene {
            log: Rc::clone(&self.log),
        }))
    }
}

#[derive(Default)]
pub struct FakeAssets {
    pub loads: RefCell<Vec<String>>,
    pub failing: RefCell<HashSet<String>>,
}

#[async_trait(?Send)]
impl AssetLoader for FakeAssets {
    async fn load(&self, url: &str) -> Result<AssetId, AssetError> {
        self.loads.borrow_mut().push(url.to_string());
        yield_once().await;
        if self.failing.borrow().contains(url) {
            return Err(AssetError {
                url: url.to_string(),
                reason: "404".to_string(),
            });
        }
        Ok(AssetId(url.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub user_ids: RefCell<Vec<UserId>>,
    pub states: RefCell<Vec<ConnectionState>>,
    pub ready_flips: Cell<u32>,
    pub corrections: RefCell<Vec<GridPosition>>,
    pub chats: RefCell<Vec<(UserId, String, bool)>>,
    pub statuses: RefCell<Vec<(UserId, NegotiationStatus)>>,
}

impl RecordingObserver {
    pub fn statuses_for(&self, user_id: &UserId) -> Vec<NegotiationStatus> {
        self.statuses
            .borrow()
            .iter()
            .filter(|(id, _)| id == user_id)
            .map(|(_, status)| *status)
            .collect()
    }
}

impl ClientObserver for RecordingObserver {
    fn user_id_assigned(&self, user_id: &UserId) {
        self.user_ids.borrow_mut().push(user_id.clone());
    }

    fn state_changed(&self, state: ConnectionState) {
        self.states.borrow_mut().push(state);
    }

    fn readiness_changed(&self, gate: &ReadinessGate) {
        if gate.is_ready() {
            self.ready_flips.set(self.ready_flips.get() + 1);
        }
    }

    fn movement_corrected(&self, at: GridPosition) {
        self.corrections.borrow_mut().push(at);
    }

    fn chat_received(&self, from: &UserId, message: &str, private: bool) {
        self.chats
            .borrow_mut()
            .push((from.clone(), message.to_string(), private));
    }

    fn negotiation_status(&self, user_id: &UserId, status: NegotiationStatus) {
        self.statuses.borrow_mut().push((user_id.clone(), status));
    }
}

#[derive(Default)]
pub struct FakePeer {
    calls: RefCell<Vec<String>>,
    gain: Cell<Option<f32>>,
    opacity: Cell<Option<f32>>,
    closed: Cell<bool>,
}

impl FakePeer {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn gain(&self) -> Option<f32> {
        self.gain.get()
    }

    pub fn opacity(&self) -> Option<f32> {
        self.opacity.get()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

#[async_trait(?Send)]
impl MediaPeer for FakePeer {
    async fn create_offer(&self) -> Result<Value, MediaError> {
        yield_once().await;
        self.calls.borrow_mut().push("offer".to_string());
        Ok(json!({ "type": "offer", "sdp": "local-offer" }))
    }

    async fn create_answer(&self) -> Result<Value, MediaError> {
        yield_once().await;
        self.calls.borrow_mut().push("answer".to_string());
        Ok(json!({ "type": "answer", "sdp": "local-answer" }))
    }

    async fn set_remote_description(&self, description: Value) -> Result<(), MediaError> {
        self.calls.borrow_mut().push(format!(
            "remote:{}",
            description["sdp"].as_str().unwrap_or_default()
        ));
        yield_once().await;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), MediaError> {
        self.calls.borrow_mut().push(format!("candidate:{}", candidate));
        yield_once().await;
        Ok(())
    }

    fn set_audio_gain(&self, gain: f32) {
        self.gain.set(Some(gain));
    }

    fn set_video_opacity(&self, opacity: f32) {
        self.opacity.set(Some(opacity));
    }

    fn close(&self) {
        self.closed.set(true);
    }
}

#[derive(Default)]
pub struct FakePeerFactory {
    created: RefCell<Vec<(PeerHandle, Rc<FakePeer>)>>,
}

impl FakePeerFactory {
    pub fn created(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn peer(&self, index: usize) -> Rc<FakePeer> {
        Rc::clone(&self.created.borrow()[index].1)
    }

    pub fn handle(&self, index: usize) -> PeerHandle {
        self.created.borrow()[index].0.clone()
    }
}

impl MediaPeerFactory for FakePeerFactory {
    fn create(&self, handle: PeerHandle) -> Result<Rc<dyn MediaPeer>, MediaError> {
        let peer = Rc::new(FakePeer::default());
        self.created.borrow_mut().push((handle, Rc::clone(&peer)));
        Ok(peer)
    }
}
