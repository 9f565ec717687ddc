use axum::extract::rejection::JsonRejection;
use chrono::Utc;

use super::prelude::*;
use crate::assessment::{AssessmentResult, Language};
use crate::flow::FlowError;
use crate::gateway::{GatewayError, Operation};

#[derive(Deserialize)]
pub(crate) struct AnalyzeRequest {
    image: String,
    #[serde(default)]
    language: Language,
}

#[derive(Deserialize)]
pub(crate) struct GenerateRequest {
    image: String,
    style: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GenerateResponse {
    pub(crate) image: String,
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    credential: &'static str,
}

fn now() -> i64 {
    Utc::now().timestamp()
}

async fn load_flow(session: &Session, stale_after: i64) -> Result<FlowState, ScalpscanError> {
    let flow = session
        .get::<FlowState>(SESSION_FLOW_KEY)
        .await?
        .unwrap_or_default();
    Ok(flow.settle(now(), stale_after))
}

async fn store_flow(session: &Session, flow: &FlowState) -> Result<(), ScalpscanError> {
    session.insert(SESSION_FLOW_KEY, flow).await?;
    Ok(())
}

/// Marks the session in flight and persists it before the gateway call starts,
/// so a second request on the same session sees it.
async fn claim_flow(session: &Session, flow: &FlowState) -> Result<(), ScalpscanError> {
    store_flow(session, flow).await?;
    session.save().await?;
    Ok(())
}

/// Rejected before the flow is touched, so the session keeps what it had.
fn invalid_input(operation: Operation, message: &str) -> ScalpscanError {
    ScalpscanError::Gateway(operation, GatewayError::InvalidInput(message.to_string()))
}

fn log_discarded(result: Result<(), FlowError>) {
    if let Err(err) = result {
        warn!("Discarding late gateway result: {}", err);
    }
}

/// POST /api/analyze
pub(crate) async fn analyze_handler(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AssessmentResult>, ScalpscanError> {
    let Json(request) = payload?;
    let image = ImagePayload::from_data_uri(&request.image)?;
    if image.is_empty() {
        return Err(invalid_input(Operation::Analysis, "image is empty"));
    }

    let mut flow = load_flow(&session, state.stale_after).await?;
    flow.begin_analysis(now())?;
    claim_flow(&session, &flow).await?;
    debug!("Session moved to {}", flow.name());

    match state.gateway.analyze(&image, request.language).await {
        Ok(assessment) => {
            log_discarded(flow.finish_analysis(assessment.clone()));
            store_flow(&session, &flow).await?;
            Ok(Json(assessment))
        }
        Err(err) => {
            log_discarded(flow.fail_analysis(err.kind()));
            store_flow(&session, &flow).await?;
            Err(ScalpscanError::Gateway(Operation::Analysis, err))
        }
    }
}

/// POST /api/generate
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ScalpscanError> {
    let Json(request) = payload?;
    let image = ImagePayload::from_data_uri(&request.image)?;
    if image.is_empty() {
        return Err(invalid_input(Operation::Preview, "image is empty"));
    }
    if request.style.trim().is_empty() {
        return Err(invalid_input(Operation::Preview, "style prompt is empty"));
    }

    let mut flow = load_flow(&session, state.stale_after).await?;
    flow.begin_preview(now())?;
    claim_flow(&session, &flow).await?;
    info!("Generating preview for style {:?}", request.style.trim());

    match state.gateway.generate(&image, &request.style).await {
        Ok(image) => {
            log_discarded(flow.finish_preview());
            store_flow(&session, &flow).await?;
            Ok(Json(GenerateResponse { image }))
        }
        Err(err) => {
            log_discarded(flow.fail_preview(err.kind()));
            store_flow(&session, &flow).await?;
            Err(ScalpscanError::Gateway(Operation::Preview, err))
        }
    }
}

/// GET /api/session
pub(crate) async fn session_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<FlowState>, ScalpscanError> {
    let flow = load_flow(&session, state.stale_after).await?;
    Ok(Json(flow))
}

/// POST /api/session/reset
pub(crate) async fn reset_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<FlowState>, ScalpscanError> {
    let mut flow = load_flow(&session, state.stale_after).await?;
    if flow.is_in_flight() {
        info!("Resetting session while {}", flow.name());
    }
    flow.reset();
    store_flow(&session, &flow).await?;
    Ok(Json(flow))
}

/// GET /healthz
pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        credential: if state.gateway.has_credential() {
            "configured"
        } else {
            "missing"
        },
    })
}
