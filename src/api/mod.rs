// API 路由汇总入口。
pub mod documents;
pub mod errors;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new().merge(documents::router()).with_state(state)
}
