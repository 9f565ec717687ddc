pub(crate) use crate::constants::SESSION_FLOW_KEY;
pub(crate) use crate::error::ScalpscanError;
pub(crate) use crate::flow::FlowState;
pub(crate) use crate::payload::ImagePayload;
pub(crate) use crate::web::AppState;
pub(crate) use axum::Json;
pub(crate) use axum::extract::State;
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use tower_sessions::Session;
pub(crate) use tracing::{debug, info, warn};
