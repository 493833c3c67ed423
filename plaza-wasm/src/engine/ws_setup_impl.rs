use crate::engine::PlazaClient;
use crate::logger::Logger;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};

impl PlazaClient {
    /// Wires socket events into the controller. Joining is left to the page.
    pub(super) fn ws_setup(&self) -> Result<(), JsValue> {
        let ws = self.socket.current();

        let onopen_callback = {
            let controller = self.controller.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                Logger::info("WebSocket open");
                controller.on_socket_open();
            }))
        };
        ws.set_onopen(Some(onopen_callback.as_ref().unchecked_ref()));
        onopen_callback.forget();

        let onmessage_callback = {
            let controller = self.controller.clone();
            Closure::<dyn FnMut(web_sys::MessageEvent)>::wrap(Box::new(
                move |e: web_sys::MessageEvent| {
                    let Ok(text) = e.data().dyn_into::<js_sys::JsString>() else {
                        Logger::warn("Ignoring non-text frame");
                        return;
                    };
                    let text: String = text.into();
                    let controller = controller.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        controller.handle_text(&text).await;
                    });
                },
            ))
        };
        ws.set_onmessage(Some(onmessage_callback.as_ref().unchecked_ref()));
        onmessage_callback.forget();

        let onclose_callback = {
            let controller = self.controller.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                Logger::info("WebSocket closed");
                controller.on_socket_closed();
            }))
        };
        ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
        onclose_callback.forget();

        let onerror_callback = Closure::<dyn FnMut(web_sys::ErrorEvent)>::wrap(Box::new(
            move |e: web_sys::ErrorEvent| {
                Logger::warn(&format!("WebSocket error: {}", e.message()));
            },
        ));
        ws.set_onerror(Some(onerror_callback.as_ref().unchecked_ref()));
        onerror_callback.forget();

        Ok(())
    }
}
