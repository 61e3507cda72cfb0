//! Axum route handlers for the collage API.

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collage::assembler::{assemble_collage, Collage, Document, Omission};
use crate::collage::render::render_pdf;
use crate::errors::AppError;
use crate::state::AppState;

const ATTACHMENT_DISPOSITION: &str = "attachment; filename=\"collage.pdf\"";
const OMITTED_HEADER: &str = "x-tiles-omitted";

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Tile collage</title>
</head>
<body>
  <h1>Tile collage</h1>
  <form method="post" action="/generate_pdf">
    <label for="rsid_code">Code</label>
    <input id="rsid_code" name="rsid_code" size="80" placeholder="a:tl1|b:tl2|c:tl3">
    <button type="submit">Generate PDF</button>
  </form>
</body>
</html>
"#;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    pub rsid_code: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub document: Document,
    pub omissions: Vec<Omission>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /
pub async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// POST /generate_pdf
///
/// Form field `rsid_code`. Returns the two-page PDF as an attachment; the number of
/// tiles left out is reported in `X-Tiles-Omitted`.
pub async fn handle_generate_pdf(
    State(state): State<AppState>,
    form: Result<Form<GenerateForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form?;
    let (pdf, omitted) = run_blocking(state.clone(), form.rsid_code, |collage| {
        let pdf = render_pdf(&collage)?;
        Ok((pdf, collage.omissions.len()))
    })
    .await?;

    let stored = state.sink.persist(Bytes::from(pdf)).await?;
    info!(
        bytes = stored.bytes.len(),
        omitted,
        archived = stored.location.is_some(),
        "collage PDF generated"
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static(ATTACHMENT_DISPOSITION),
    );
    headers.insert(
        HeaderName::from_static(OMITTED_HEADER),
        HeaderValue::from(omitted),
    );

    Ok((headers, stored.bytes).into_response())
}

/// POST /api/v1/collage/preview
///
/// Returns the computed placements and omissions without rendering a PDF.
pub async fn handle_preview(
    State(state): State<AppState>,
    request: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, AppError> {
    let Json(request) = request?;
    let response = run_blocking(state, request.code, |collage| {
        Ok(PreviewResponse {
            document: collage.document,
            omissions: collage.omissions,
        })
    })
    .await?;

    Ok(Json(response))
}

/// Assembles the collage for `code` and hands it to `finish`, all on the blocking pool.
async fn run_blocking<T, F>(state: AppState, code: String, finish: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(Collage) -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || -> Result<T, AppError> {
        let collage = assemble_collage(&code, &state.catalog, &state.layout)?;
        finish(collage)
    })
    .await
    .map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "spawn_blocking failed in collage render: {e}"
        ))
    })?
}
