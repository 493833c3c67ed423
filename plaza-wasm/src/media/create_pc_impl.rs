use crate::engine::IceServerConfig;
use wasm_bindgen::JsValue;

const DEFAULT_STUN_URLS: [&str; 4] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
];

/// Opens a peer connection against the configured ICE servers, or public STUN.
pub(super) fn create_pc(
    ice_servers: Option<&[IceServerConfig]>,
) -> Result<web_sys::RtcPeerConnection, JsValue> {
    let rtc_config = web_sys::RtcConfiguration::new();
    let ice_servers_arr = js_sys::Array::new();

    if let Some(servers) = ice_servers {
        for server_config in servers {
            let rtc_ice_server = web_sys::RtcIceServer::new();

            let urls = js_sys::Array::new();
            for url in &server_config.urls {
                urls.push(&JsValue::from_str(url));
            }
            rtc_ice_server.set_urls(&urls);

            if let Some(username) = &server_config.username {
                rtc_ice_server.set_username(username);
            }
            if let Some(credential) = &server_config.credential {
                rtc_ice_server.set_credential(credential);
            }

            ice_servers_arr.push(&rtc_ice_server);
        }
    } else {
        let stun_urls = js_sys::Array::new();
        for url in DEFAULT_STUN_URLS {
            stun_urls.push(&JsValue::from_str(url));
        }
        let stun_server = web_sys::RtcIceServer::new();
        stun_server.set_urls(&stun_urls);
        ice_servers_arr.push(&stun_server);
    }

    rtc_config.set_ice_servers(&ice_servers_arr);
    web_sys::RtcPeerConnection::new_with_configuration(&rtc_config)
}
