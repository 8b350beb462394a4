//! HTTP server for ZapLink.
//!
//! Exposes zap creation (`POST /api/zaps/upload`, multipart) and resolution
//! (`GET /api/zaps/:short_id`) on top of [`zap_core::ZapController`], with
//! backends chosen by [`ServerConfig`].

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ContentConfig, RepositoryConfig, ServerConfig};
pub use error::{ApiError, ApiResult, ServerError, ServerResult};
pub use server::ZapServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "zapboundary";

    fn test_config() -> ServerConfig {
        ServerConfig {
            hash_rounds: 8,
            ..Default::default()
        }
    }

    async fn app(config: ServerConfig) -> Router {
        router::build_router(AppState::from_config(config).await.unwrap())
    }

    fn upload(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                     Content-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/zaps/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_html(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::ACCEPT, "text/html,application/xhtml+xml")
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &Response<Body>) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    /// Create a zap and return its short-code path.
    async fn create(app: &Router, fields: &[(&str, &str)]) -> String {
        let response = app.clone().oneshot(upload(fields, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await;
        let short_url = body["data"]["shortUrl"].as_str().unwrap();
        let code = short_url.rsplit('/').next().unwrap();
        format!("/api/zaps/{code}")
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = app(test_config()).await.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let response = app(test_config()).await.oneshot(get("/api/info")).await.unwrap();
        assert_eq!(response.status(), 200);
        let body = json(response).await;
        assert_eq!(body["repository"], "memory");
        assert_eq!(body["content"], "memory");
    }

    #[tokio::test]
    async fn create_returns_envelope() {
        let app = app(test_config()).await;
        let response = app
            .clone()
            .oneshot(upload(
                &[("type", "URL"), ("name", "docs"), ("originalUrl", "https://e.com/docs")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json(response).await;
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Zap created successfully.");
        assert_eq!(body["data"]["type"], "URL");
        assert_eq!(body["data"]["name"], "docs");
        assert_eq!(body["data"]["zapId"].as_str().unwrap().len(), 6);
        assert!(body["data"]["shortUrl"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:8080/api/zaps/"));
        assert!(body["data"]["qrCode"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn resolve_redirects_to_url() {
        let app = app(test_config()).await;
        let path = create(&app, &[("originalUrl", "https://e.com/x")]).await;
        let response = app.oneshot(get(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "https://e.com/x");
    }

    #[tokio::test]
    async fn data_url_served_inline() {
        let app = app(test_config()).await;
        let path = create(&app, &[("originalUrl", "data:image/png;base64,aGVsbG8=")]).await;
        let response = app.oneshot(get(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(
            response.headers()[header::CONTENT_SECURITY_POLICY],
            handler::CONTENT_SECURITY_POLICY
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn svg_data_url_is_rejected() {
        let response = app(test_config())
            .await
            .oneshot(upload(
                &[("originalUrl", "data:image/svg+xml;base64,PHN2Zy8+")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["code"], "validation_error");
    }

    #[tokio::test]
    async fn validation_error_envelope() {
        let response = app(test_config())
            .await
            .oneshot(upload(&[("name", "nothing")], None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "validation_error");
    }

    #[tokio::test]
    async fn unknown_code_is_404() {
        let response = app(test_config())
            .await
            .oneshot(get("/api/zaps/zzzzzz"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["code"], "not_found");
    }

    #[tokio::test]
    async fn password_flow() {
        let app = app(test_config()).await;
        let path = create(&app, &[("originalUrl", "https://e.com"), ("password", "s3cret")]).await;

        let response = app.clone().oneshot(get(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["code"], "password_required");

        let response = app
            .clone()
            .oneshot(get(&format!("{path}?password=nope")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["code"], "invalid_password");

        let response = app
            .oneshot(get(&format!("{path}?password=s3cret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn view_limit_is_gone() {
        let app = app(test_config()).await;
        let path = create(&app, &[("originalUrl", "https://e.com"), ("viewLimit", "1")]).await;

        assert_eq!(app.clone().oneshot(get(&path)).await.unwrap().status(), StatusCode::FOUND);
        let response = app.oneshot(get(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(json(response).await["code"], "view_limit_exceeded");
    }

    #[tokio::test]
    async fn expired_is_gone() {
        let app = app(test_config()).await;
        let path = create(
            &app,
            &[("originalUrl", "https://e.com"), ("expiresAt", "2000-01-01T00:00:00Z")],
        )
        .await;
        let response = app.oneshot(get(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(json(response).await["code"], "expired");
    }

    #[tokio::test]
    async fn browsers_are_sent_to_the_frontend() {
        let mut config = test_config();
        config.zap.frontend_url = Some("https://app.example".into());
        let app = app(config).await;
        let path = create(&app, &[("originalUrl", "https://e.com"), ("viewLimit", "1")]).await;
        let code = path.rsplit('/').next().unwrap().to_string();

        app.clone().oneshot(get(&path)).await.unwrap();
        let response = app.clone().oneshot(get_html(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            format!("https://app.example/zaps/{code}?error=viewlimit")
        );

        let response = app.clone().oneshot(get_html("/api/zaps/zzzzzz")).await.unwrap();
        assert_eq!(
            location(&response),
            "https://app.example/zaps/zzzzzz?error=notfound"
        );

        // API clients still get JSON.
        let response = app.oneshot(get("/api/zaps/zzzzzz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn browsers_get_json_without_frontend() {
        let response = app(test_config())
            .await
            .oneshot(get_html("/api/zaps/zzzzzz"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn file_upload_is_served_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            content: ContentConfig::Filesystem {
                root: dir.path().to_path_buf(),
                public_base_url: "http://localhost:8080/files".into(),
                folder: "zaplink_folders".into(),
            },
            ..test_config()
        };
        let app = app(config).await;

        let response = app
            .clone()
            .oneshot(upload(
                &[("type", "PDF")],
                Some(("report.pdf", "application/pdf", &b"%PDF-1.7 body"[..])),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await;
        assert_eq!(body["data"]["type"], "PDF");
        let short_url = body["data"]["shortUrl"].as_str().unwrap();
        let path = format!("/api/zaps/{}", short_url.rsplit('/').next().unwrap());

        let response = app.clone().oneshot(get(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        let content_url = location(&response).to_string();
        let served = content_url
            .strip_prefix("http://localhost:8080")
            .unwrap()
            .to_string();
        assert!(served.starts_with("/files/image/zaplink_folders/report_"));
        assert!(served.ends_with(".pdf"));

        let response = app.oneshot(get(&served)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_DISPOSITION], "attachment");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn uploaded_html_is_never_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            content: ContentConfig::Filesystem {
                root: dir.path().to_path_buf(),
                public_base_url: "http://localhost:8080/files".into(),
                folder: "zaplink_folders".into(),
            },
            ..test_config()
        };
        let app = app(config).await;
        let html = &b"<script>alert(1)</script>"[..];
        let path = {
            let response = app
                .clone()
                .oneshot(upload(&[], Some(("page.html", "text/html", html))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            let body = json(response).await;
            let short_url = body["data"]["shortUrl"].as_str().unwrap().to_string();
            format!("/api/zaps/{}", short_url.rsplit('/').next().unwrap())
        };

        let response = app.clone().oneshot(get(&path)).await.unwrap();
        let served = location(&response)
            .strip_prefix("http://localhost:8080")
            .unwrap()
            .to_string();

        let response = app.oneshot(get(&served)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(
            headers[header::CONTENT_SECURITY_POLICY],
            handler::CONTENT_SECURITY_POLICY
        );
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let config = ServerConfig {
            max_upload_bytes: 64,
            ..test_config()
        };
        let big = vec![b'x'; 4096];
        let response = app(config)
            .await
            .oneshot(upload(&[], Some(("big.bin", "application/octet-stream", &big[..]))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
