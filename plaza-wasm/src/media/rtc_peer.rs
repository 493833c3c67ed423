use crate::engine::EventSink;
use crate::logger::Logger;
use async_trait::async_trait;
use plaza_client::{MediaError, MediaPeer, PeerConnectionState, PeerHandle};
use serde::Deserialize;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{RtcPeerConnection, RtcSdpType, RtcSessionDescriptionInit};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateInit {
    candidate: String,
    #[serde(default)]
    sdp_mid: Option<String>,
    #[serde(default)]
    sdp_m_line_index: Option<u16>,
}

/// A browser `RTCPeerConnection` plus the `<video>` element its remote stream plays in.
pub(super) struct RtcMediaPeer {
    pc: RtcPeerConnection,
    element: Rc<RefCell<Option<web_sys::HtmlMediaElement>>>,
    _onice: Closure<dyn FnMut(web_sys::RtcPeerConnectionIceEvent)>,
    _onstate: Closure<dyn FnMut(JsValue)>,
    _ontrack: Closure<dyn FnMut(web_sys::RtcTrackEvent)>,
}

impl RtcMediaPeer {
    pub(super) fn new(pc: RtcPeerConnection, handle: PeerHandle, events: EventSink) -> Self {
        let element = Rc::new(RefCell::new(None::<web_sys::HtmlMediaElement>));

        let onice = {
            let handle = handle.clone();
            Closure::wrap(Box::new(move |ev: web_sys::RtcPeerConnectionIceEvent| {
                if let Some(candidate) = ev.candidate() {
                    handle.local_candidate(json!({
                        "candidate": candidate.candidate(),
                        "sdpMid": candidate.sdp_mid(),
                        "sdpMLineIndex": candidate.sdp_m_line_index(),
                    }));
                }
            }) as Box<dyn FnMut(web_sys::RtcPeerConnectionIceEvent)>)
        };
        pc.set_onicecandidate(Some(onice.as_ref().unchecked_ref()));

        let onstate = {
            let handle = handle.clone();
            let pc = pc.clone();
            Closure::wrap(Box::new(move |_: JsValue| {
                let state = map_state(pc.connection_state());
                let handle = handle.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    handle.state_changed(state).await;
                });
            }) as Box<dyn FnMut(JsValue)>)
        };
        pc.set_onconnectionstatechange(Some(onstate.as_ref().unchecked_ref()));

        let ontrack = {
            let element = Rc::clone(&element);
            Closure::wrap(Box::new(move |ev: web_sys::RtcTrackEvent| {
                let Ok(stream) = ev.streams().get(0).dyn_into::<web_sys::MediaStream>() else {
                    return;
                };
                if let Some(existing) = element.borrow().as_ref() {
                    existing.set_src_object(Some(&stream));
                    return;
                }
                match create_video(&stream) {
                    Ok(video) => {
                        announce_stream(&events, handle.remote().to_string(), &video);
                        *element.borrow_mut() = Some(video);
                    }
                    Err(e) => Logger::error("Failed to create remote video", &e),
                }
            }) as Box<dyn FnMut(web_sys::RtcTrackEvent)>)
        };
        pc.set_ontrack(Some(ontrack.as_ref().unchecked_ref()));

        Self {
            pc,
            element,
            _onice: onice,
            _onstate: onstate,
            _ontrack: ontrack,
        }
    }

    async fn install_local(&self, kind: RtcSdpType, description: JsValue) -> Result<Value, MediaError> {
        let sdp = js_sys::Reflect::get(&description, &"sdp".into())
            .ok()
            .and_then(|value| value.as_string())
            .ok_or_else(|| MediaError::Negotiation("description without sdp".to_string()))?;

        let init = RtcSessionDescriptionInit::new(kind);
        init.set_sdp(&sdp);
        JsFuture::from(self.pc.set_local_description(&init))
            .await
            .map_err(negotiation)?;

        let kind = if kind == RtcSdpType::Offer { "offer" } else { "answer" };
        Ok(json!({ "type": kind, "sdp": sdp }))
    }
}

#[async_trait(?Send)]
impl MediaPeer for RtcMediaPeer {
    async fn create_offer(&self) -> Result<Value, MediaError> {
        let offer = JsFuture::from(self.pc.create_offer())
            .await
            .map_err(negotiation)?;
        self.install_local(RtcSdpType::Offer, offer).await
    }

    async fn create_answer(&self) -> Result<Value, MediaError> {
        let answer = JsFuture::from(self.pc.create_answer())
            .await
            .map_err(negotiation)?;
        self.install_local(RtcSdpType::Answer, answer).await
    }

    async fn set_remote_description(&self, description: Value) -> Result<(), MediaError> {
        let kind = match description["type"].as_str() {
            Some("offer") => RtcSdpType::Offer,
            Some("answer") => RtcSdpType::Answer,
            other => {
                return Err(MediaError::Negotiation(format!(
                    "unsupported description type {:?}",
                    other
                )));
            }
        };
        let sdp = description["sdp"]
            .as_str()
            .ok_or_else(|| MediaError::Negotiation("description without sdp".to_string()))?;

        let init = RtcSessionDescriptionInit::new(kind);
        init.set_sdp(sdp);
        JsFuture::from(self.pc.set_remote_description(&init))
            .await
            .map_err(negotiation)?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), MediaError> {
        let parsed: CandidateInit = serde_json::from_value(candidate)
            .map_err(|e| MediaError::Negotiation(format!("bad candidate: {}", e)))?;

        let init = web_sys::RtcIceCandidateInit::new(&parsed.candidate);
        init.set_sdp_mid(parsed.sdp_mid.as_deref());
        init.set_sdp_m_line_index(parsed.sdp_m_line_index);
        JsFuture::from(
            self.pc
                .add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&init)),
        )
        .await
        .map_err(negotiation)?;
        Ok(())
    }

    fn set_audio_gain(&self, gain: f32) {
        if let Some(video) = self.element.borrow().as_ref() {
            video.set_volume(f64::from(gain));
        }
    }

    fn set_video_opacity(&self, opacity: f32) {
        if let Some(video) = self.element.borrow().as_ref() {
            let _ = video.style().set_property("opacity", &opacity.to_string());
        }
    }

    fn close(&self) {
        self.pc.set_onicecandidate(None);
        self.pc.set_onconnectionstatechange(None);
        self.pc.set_ontrack(None);
        self.pc.close();
        if let Some(video) = self.element.borrow_mut().take() {
            video.set_src_object(None);
            video.remove();
        }
    }
}

fn negotiation(e: JsValue) -> MediaError {
    MediaError::Negotiation(format!("{:?}", e))
}

fn map_state(state: web_sys::RtcPeerConnectionState) -> PeerConnectionState {
    use web_sys::RtcPeerConnectionState as Rtc;
    match state {
        Rtc::Connecting => PeerConnectionState::Connecting,
        Rtc::Connected => PeerConnectionState::Connected,
        Rtc::Disconnected => PeerConnectionState::Disconnected,
        Rtc::Failed => PeerConnectionState::Failed,
        Rtc::Closed => PeerConnectionState::Closed,
        _ => PeerConnectionState::New,
    }
}

fn create_video(stream: &web_sys::MediaStream) -> Result<web_sys::HtmlMediaElement, JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let video = document
        .create_element("video")?
        .dyn_into::<web_sys::HtmlMediaElement>()?;
    video.set_autoplay(true);
    video.set_src_object(Some(stream));
    Ok(video)
}

/// The element itself goes to the page, which decides where to mount it.
fn announce_stream(events: &EventSink, user_id: String, video: &web_sys::HtmlMediaElement) {
    let event = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&event, &"kind".into(), &"remoteStream".into());
    let _ = js_sys::Reflect::set(&event, &"userId".into(), &JsValue::from_str(&user_id));
    let _ = js_sys::Reflect::set(&event, &"element".into(), video);
    events.emit_value(&event);
}
