use crate::engine::{EventSink, IceServerConfig};
use crate::logger::Logger;
use plaza_client::{MediaError, MediaPeer, MediaPeerFactory, PeerHandle};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;

mod create_pc_impl;
mod rtc_peer;

use rtc_peer::RtcMediaPeer;

pub(crate) struct RtcPeerFactory {
    ice_servers: Option<Vec<IceServerConfig>>,
    local_stream: Rc<RefCell<Option<web_sys::MediaStream>>>,
    events: EventSink,
}

impl RtcPeerFactory {
    pub(crate) fn new(
        ice_servers: Option<Vec<IceServerConfig>>,
        local_stream: Rc<RefCell<Option<web_sys::MediaStream>>>,
        events: EventSink,
    ) -> Self {
        Self {
            ice_servers,
            local_stream,
            events,
        }
    }
}

impl MediaPeerFactory for RtcPeerFactory {
    fn create(&self, handle: PeerHandle) -> Result<Rc<dyn MediaPeer>, MediaError> {
        let pc = create_pc_impl::create_pc(self.ice_servers.as_deref())
            .map_err(|e| MediaError::Negotiation(format!("{:?}", e)))?;

        if let Some(stream) = self.local_stream.borrow().as_ref() {
            for track in stream.get_tracks().iter() {
                if let Ok(track) = track.dyn_into::<web_sys::MediaStreamTrack>() {
                    pc.add_track_0(&track, stream);
                }
            }
        } else {
            Logger::debug(&format!(
                "No local stream yet, connecting to {} receive-only",
                handle.remote()
            ));
        }

        Ok(Rc::new(RtcMediaPeer::new(pc, handle, self.events.clone())))
    }
}
