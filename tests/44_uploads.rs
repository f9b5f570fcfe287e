mod common;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use tower::ServiceExt;

use common::{lazy_app, lazy_app_with, request, send, test_config, token_for};
use wavy_api::types::Role;

const BOUNDARY: &str = "wavy-test-boundary";

fn multipart(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/pdf\r\n\r\n",
        b = BOUNDARY
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() -> Result<()> {
    let app = lazy_app();
    let (status, body) = send(&app, multipart("other", "cv.pdf", b"%PDF-1.4")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Aucun fichier");
    Ok(())
}

#[tokio::test]
async fn uploaded_cv_can_be_downloaded_by_admin() -> Result<()> {
    let app = lazy_app();
    let (status, body) = send(&app, multipart("file", "CV Jean Dupont.pdf", b"%PDF-1.4 test")).await?;
    assert_eq!(status, StatusCode::CREATED);

    let path = body["data"]["path"].as_str().unwrap().to_string();
    assert!(path.ends_with("-CV_Jean_Dupont.pdf"), "stored as {}", path);

    let uri = format!("/api/uploads/cvs/{}", path);
    let (status, _) = send(&app, request(Method::GET, &uri, Some(&token_for(&[Role::UserCra])), None)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(Method::GET, &uri, Some(&token_for(&[Role::Admin])), None))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], b"%PDF-1.4 test");
    Ok(())
}

#[tokio::test]
async fn missing_cv_is_404() -> Result<()> {
    let app = lazy_app();
    let token = token_for(&[Role::Admin]);
    let (status, body) = send(&app, request(Method::GET, "/api/uploads/cvs/nothing.pdf", Some(&token), None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Fichier introuvable");
    Ok(())
}

#[tokio::test]
async fn oversized_upload_is_413() -> Result<()> {
    let mut config = test_config();
    config.api.upload_max_bytes = 16;
    let app = lazy_app_with(config);

    let (status, _) = send(&app, multipart("file", "big.pdf", &[b'x'; 64])).await?;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}
