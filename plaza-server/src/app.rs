use crate::lobby::room_participants;
use crate::signaling::{ConnectionGateway, ws_handler};
use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

/// HTTP surface: the realtime socket plus the lobby occupancy query.
pub fn router(gateway: ConnectionGateway) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/rooms/{room_id}/participants", get(room_participants))
        .layer(cors)
        .with_state(gateway)
}
