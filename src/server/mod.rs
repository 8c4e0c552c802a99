mod auth_routes;
pub mod config;
mod http_layers;
pub mod metrics;
mod music_routes;
mod profile_routes;
mod responses;
#[allow(clippy::module_inception)]
pub mod server;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{build_state, make_app, run_server, spawn_session_pruning};
pub(self) use auth_routes::make_auth_routes;
pub(self) use music_routes::make_music_routes;
pub(self) use profile_routes::make_profile_routes;
