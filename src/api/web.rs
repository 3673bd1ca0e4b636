//! One handler per user action on the dashboard pages.

use axum::extract::{Form, FromRequestParts, Multipart, Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::classify::Prediction;
use crate::error::Result;
use crate::pages::{InfoView, Page, PageView, PredictionView};
use crate::session::SESSION_COOKIE;

use super::AppState;
use super::upload::read_image_upload;

/// Session of the requesting browser, created on first contact.
pub struct Session {
    id: Uuid,
    is_new: bool,
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let cookie = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.to_string());

        let (id, is_new) = state.sessions.resolve(cookie.as_deref());
        Ok(Self { id, is_new })
    }
}

impl Session {
    fn respond(&self, html: String) -> Response {
        let mut response = Html(html).into_response();
        if self.is_new {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(SET_COOKIE, value);
            }
        }
        response
    }
}

#[derive(Debug, Deserialize)]
pub struct InfoForm {
    pub label: String,
}

fn prediction_view(prediction: &Prediction) -> PredictionView {
    PredictionView {
        label: prediction.label.clone(),
        summary: prediction.summary(),
    }
}

fn info_view(state: &AppState, label: &str, view: &mut PageView) {
    match state.info.lookup(label) {
        Ok(text) => {
            view.info = Some(InfoView {
                label: label.to_string(),
                text: text.to_string(),
            })
        }
        Err(e) => {
            tracing::warn!("{}", e);
            view.error = Some(e.to_string());
        }
    }
}

pub async fn index_handler() -> Redirect {
    Redirect::to("/page/home")
}

/// Sidebar selection
pub async fn page_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Response> {
    let Ok(page) = Page::from_str(&slug) else {
        return Ok((StatusCode::NOT_FOUND, Html("Page not found")).into_response());
    };

    let session_state = state.sessions.with(session.id, |s| {
        s.page = page;
        s.clone()
    });

    let mut view = state.base_view();
    match page {
        Page::Info => view.info_labels = state.info.labels(&state.labels),
        Page::DiseaseRecognition => {
            view.can_show_info = session_state.last_prediction.is_some()
        }
        Page::Home | Page::AboutUs => {}
    }

    Ok(session.respond(state.renderer.render(page, &view)?))
}

/// Upload + Predict on the recognition page
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut view = state.base_view();

    let outcome = match read_image_upload(&mut multipart).await {
        Ok(upload) => {
            view.uploaded_image = upload.data_uri();
            state.predict(upload.bytes).await
        }
        Err(e) => Err(e),
    };

    match &outcome {
        Ok(prediction) => {
            tracing::info!(
                "Predicted {} ({:.2}%)",
                prediction.label,
                prediction.confidence
            );
            view.prediction = Some(prediction_view(prediction));
            view.can_show_info = true;
        }
        Err(e) => {
            tracing::warn!("Prediction failed: {}", e);
            view.error = Some(e.to_string());
        }
    }

    state.sessions.with(session.id, |s| {
        s.page = Page::DiseaseRecognition;
        s.last_prediction = outcome.ok();
    });

    Ok(session.respond(
        state.renderer.render(Page::DiseaseRecognition, &view)?,
    ))
}

/// "Show Information" for the session's last prediction
pub async fn show_info_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response> {
    let mut view = state.base_view();

    match state.sessions.snapshot(session.id).last_prediction {
        Some(prediction) => {
            view.prediction = Some(prediction_view(&prediction));
            view.can_show_info = true;
            info_view(&state, &prediction.label, &mut view);
        }
        None => {
            view.error =
                Some("No prediction yet. Upload an image and press Predict first.".to_string());
        }
    }

    Ok(session.respond(
        state.renderer.render(Page::DiseaseRecognition, &view)?,
    ))
}

/// Class selection on the info page
pub async fn info_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<InfoForm>,
) -> Result<Response> {
    state.sessions.with(session.id, |s| s.page = Page::Info);

    let mut view = state.base_view();
    view.info_labels = state.info.labels(&state.labels);
    view.selected_label = Some(form.label.clone());
    info_view(&state, &form.label, &mut view);

    Ok(session.respond(state.renderer.render(Page::Info, &view)?))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn session_cookie(response: &axum::response::Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("new session sets a cookie")
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_index_redirects_home() {
        let response = router(acne_state())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[header::LOCATION], "/page/home");
    }

    #[tokio::test]
    async fn test_pages_render_and_unknown_is_404() {
        for slug in ["home", "info", "disease-recognition", "about-us"] {
            let response = router(acne_state())
                .oneshot(Request::get(format!("/page/{slug}")).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{slug}");
        }

        let response = router(acne_state())
            .oneshot(Request::get("/page/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_predict_acne_upload() {
        let state = acne_state();
        let response = router(state.clone())
            .oneshot(upload_request("/predict", "lesion.jpg", &jpeg_bytes(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);

        let html = body_string(response).await;
        assert!(html.contains("Acne with 82.00% confidence"));
        assert!(html.contains("data:image"));
        assert!(html.contains("Show Information"));

        // the cached prediction drives "Show Information"
        let response = router(state)
            .oneshot(
                Request::post("/show-info")
                    .header("cookie", &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains("Information about Acne"));
    }

    #[tokio::test]
    async fn test_corrupt_upload_caches_nothing() {
        let state = acne_state();

        let response = router(state.clone())
            .oneshot(upload_request("/predict", "lesion.jpg", &jpeg_bytes(), None))
            .await
            .unwrap();
        let cookie = session_cookie(&response);

        let response = router(state.clone())
            .oneshot(upload_request(
                "/predict",
                "broken.jpg",
                b"not really a jpeg",
                Some(&cookie),
            ))
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains("not a decodable image"));
        assert!(!html.contains("Model is predicting"));

        let response = router(state)
            .oneshot(
                Request::post("/show-info")
                    .header("cookie", &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains("No prediction yet"));
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let response = router(acne_state())
            .oneshot(upload_request("/predict", "notes.txt", b"hello", None))
            .await
            .unwrap();
        assert!(body_string(response).await.contains("Unsupported file type"));

        let response = router(acne_state())
            .oneshot(upload_request("/predict", "", b"", None))
            .await
            .unwrap();
        assert!(body_string(response).await.contains("No image was uploaded"));
    }

    #[tokio::test]
    async fn test_missing_model_warns_on_every_page_and_predict() {
        let state = unavailable_state();

        for slug in ["home", "info", "disease-recognition", "about-us"] {
            let response = router(state.clone())
                .oneshot(Request::get(format!("/page/{slug}")).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(body_string(response).await.contains("model-warning"), "{slug}");
        }

        for _ in 0..2 {
            let response = router(state.clone())
                .oneshot(upload_request("/predict", "lesion.png", &jpeg_bytes(), None))
                .await
                .unwrap();
            let html = body_string(response).await;
            assert!(html.contains("Model not loaded. Please check the model file."));
            assert!(!html.contains("Model is predicting"));
        }
    }

    #[tokio::test]
    async fn test_info_page_melanoma() {
        let state = acne_state();
        let expected = state.info.lookup("Melanoma").unwrap().to_string();

        let response = router(state)
            .oneshot(
                Request::post("/info")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("label=Melanoma"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains("Information about Melanoma"));
        assert!(html.contains(&expected));
    }

    #[tokio::test]
    async fn test_info_page_unmapped_label() {
        let response = router(acne_state())
            .oneshot(
                Request::post("/info")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("label=Normal"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("Information module for Normal not found."));
    }
}
