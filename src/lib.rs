// Library entrypoint for the server, the CLI and integration tests.
mod api;
mod core;
mod services;

pub use api::build_router;
pub use core::{config, i18n, shutdown, state};
pub use services::extract;
