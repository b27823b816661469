//! Recognition endpoint
//!
//! - `POST /api/recognize`: relay one uploaded audio file to the recognition provider

use crate::error::{AppError, AppResult, FILE_TOO_LARGE_MESSAGE, NO_AUDIO_MESSAGE};
use crate::relay::{UploadedSample, MAX_SAMPLE_BYTES};
use crate::state::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use futures_util::stream::StreamExt;
use tracing::{error, info};

/// Form field carrying the audio file.
pub const AUDIO_FIELD: &str = "audio";

/// Optional form field overriding the outbound `record_type`.
pub const RECORD_TYPE_FIELD: &str = "recordType";

/// Longest `recordType` value accepted.
const MAX_TEXT_FIELD_BYTES: usize = 1024;

/// Identify an uploaded audio sample.
///
/// ## Endpoint: `POST /api/recognize`
///
/// ## Request:
/// Multipart form data with an audio file field named "audio" (at most 5 MiB)
/// and an optional "recordType" text field.
///
/// ## Response:
/// - `200`: the provider's JSON, unchanged
/// - `400`: `{"error": "No audio file provided"}`
/// - `413`: `{"error": "File too large"}`
/// - `500`: `{"error": "<provider or transport message>"}`
pub async fn recognize(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    // Anything that is not a multipart form cannot carry the audio field.
    if !req.content_type().eq_ignore_ascii_case("multipart/form-data") {
        return Err(AppError::ValidationError(NO_AUDIO_MESSAGE.to_string()));
    }

    let mut multipart = Multipart::new(req.headers(), payload);
    let mut sample: Option<UploadedSample> = None;
    let mut record_type: Option<String> = None;

    while let Some(item) = multipart.next().await {
        let mut field: Field =
            item.map_err(|e| AppError::ValidationError(format!("Multipart error: {}", e)))?;

        let content_disposition = field.content_disposition();
        let field_name = content_disposition
            .and_then(|cd| cd.get_name())
            .map(str::to_string);
        let filename = content_disposition
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        match field_name.as_deref() {
            // Only a file part counts; a plain `audio` text field is ignored.
            Some(AUDIO_FIELD) if filename.is_some() => {
                if sample.is_some() {
                    return Err(AppError::ValidationError(format!(
                        "Unexpected field '{}': only one audio file is accepted",
                        AUDIO_FIELD
                    )));
                }
                let content_type = field.content_type().map(|mime| mime.to_string());
                let bytes = read_field(&mut field, MAX_SAMPLE_BYTES)
                    .await?
                    .ok_or_else(|| AppError::PayloadTooLarge(FILE_TOO_LARGE_MESSAGE.to_string()))?;
                sample = Some(UploadedSample::new(bytes, filename, content_type));
            }
            Some(RECORD_TYPE_FIELD) => {
                let bytes = read_field(&mut field, MAX_TEXT_FIELD_BYTES)
                    .await?
                    .ok_or_else(|| {
                        AppError::ValidationError(format!(
                            "Field '{}' is longer than {} bytes",
                            RECORD_TYPE_FIELD, MAX_TEXT_FIELD_BYTES
                        ))
                    })?;
                let value = String::from_utf8(bytes).map_err(|_| {
                    AppError::ValidationError(format!("Field '{}' is not valid UTF-8", RECORD_TYPE_FIELD))
                })?;
                record_type = Some(value);
            }
            _ => drain_field(&mut field).await?,
        }
    }

    let sample = sample.ok_or_else(|| AppError::ValidationError(NO_AUDIO_MESSAGE.to_string()))?;

    info!(
        size = sample.size(),
        mimetype = %sample.content_type(),
        filename = %sample.filename(),
        "Received audio file"
    );

    match state.relay.recognize(sample, record_type.as_deref()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(err) => {
            error!(error = %err, "Recognition error");
            Err(err)
        }
    }
}

/// Collect a field's bytes, or `None` once it grows past `limit`.
async fn read_field(field: &mut Field, limit: usize) -> AppResult<Option<Vec<u8>>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
        if bytes.len() + chunk.len() > limit {
            return Ok(None);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(Some(bytes))
}

async fn drain_field(field: &mut Field) -> AppResult<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::relay::client::tests::{form_field, ACCESS_KEY, SECRET_KEY};
    use crate::relay::SigningContext;
    use crate::routes;
    use crate::state::AppState;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, web, App};
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOUNDARY: &str = "relay-test-boundary";

    enum FormPart<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                FormPart::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                FormPart::File(name, filename, mime, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, filename, mime
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(parts: &[FormPart<'_>]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/recognize")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(parts))
    }

    fn state_for(base_url: &str) -> AppState {
        let mut config = AppConfig::default();
        config.provider.base_url = base_url.to_string();
        config.provider.access_key = ACCESS_KEY.to_string();
        config.provider.secret_key = SECRET_KEY.to_string();
        AppState::new(config)
    }

    macro_rules! init_app {
        ($base_url:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(state_for($base_url)))
                    .configure(routes::configure),
            )
            .await
        };
    }

    async fn provider_never_called() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;
        server
    }

    #[actix_web::test]
    async fn test_missing_audio_field() {
        let server = provider_never_called().await;
        let app = init_app!(&server.uri());

        let req = multipart_request(&[FormPart::Text("recordType", "audio")]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "No audio file provided" }));
    }

    #[actix_web::test]
    async fn test_text_audio_field_is_not_a_file() {
        let server = provider_never_called().await;
        let app = init_app!(&server.uri());

        let req = multipart_request(&[FormPart::Text("audio", "hello")]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "No audio file provided" }));
    }

    #[actix_web::test]
    async fn test_second_audio_file_is_rejected() {
        let server = provider_never_called().await;
        let app = init_app!(&server.uri());

        let req = multipart_request(&[
            FormPart::File("audio", "first.wav", "audio/wav", b"0123456789"),
            FormPart::File("audio", "second.wav", "audio/wav", b"9876543210"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Unexpected field 'audio'"));
    }

    #[actix_web::test]
    async fn test_non_multipart_body_has_no_audio() {
        let server = provider_never_called().await;
        let app = init_app!(&server.uri());

        let req = test::TestRequest::post()
            .uri("/api/recognize")
            .set_json(json!({ "audio": "not a file" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "No audio file provided" }));

        let req = test::TestRequest::post().uri("/api/recognize").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "No audio file provided" }));
    }

    #[actix_web::test]
    async fn test_clip_is_relayed() {
        let server = MockServer::start().await;
        let provider_body = json!({
            "status": { "msg": "Success", "code": 0, "version": "1.0" },
            "metadata": { "music": [{ "title": "Song", "artists": [{ "name": "Artist" }] }] }
        });
        Mock::given(method("POST"))
            .and(path("/v1/identify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(provider_body.clone()))
            .expect(1)
            .mount(&server)
            .await;
        let app = init_app!(&server.uri());

        let req = multipart_request(&[FormPart::File("audio", "clip.wav", "audio/wav", b"0123456789")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, provider_body);

        let requests = server.received_requests().await.unwrap();
        let sent = &requests[0].body;
        assert_eq!(form_field(sent, "record_type").as_deref(), Some("audio"));
        assert_eq!(form_field(sent, "sample_bytes").as_deref(), Some("10"));
        assert_eq!(form_field(sent, "sample").as_deref(), Some("0123456789"));
        let raw = String::from_utf8_lossy(sent);
        assert!(raw.contains("filename=\"clip.wav\""));
        assert!(raw.contains("Content-Type: audio/wav"));

        let timestamp: i64 = form_field(sent, "timestamp").unwrap().parse().unwrap();
        let signing = SigningContext::new(ACCESS_KEY, SECRET_KEY, timestamp);
        assert!(signing.string_to_sign().ends_with(&format!("\n1\n{}", timestamp)));
        assert_eq!(form_field(sent, "signature").unwrap(), signing.signature().unwrap());
    }

    #[actix_web::test]
    async fn test_record_type_override_reaches_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/identify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": { "code": 0 } })))
            .mount(&server)
            .await;
        let app = init_app!(&server.uri());

        let req = multipart_request(&[
            FormPart::Text("recordType", "fingerprint"),
            FormPart::File("audio", "clip.wav", "audio/wav", b"0123456789"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let requests = server.received_requests().await.unwrap();
        let sent = &requests[0].body;
        assert_eq!(form_field(sent, "record_type").as_deref(), Some("fingerprint"));

        let timestamp: i64 = form_field(sent, "timestamp").unwrap().parse().unwrap();
        let signing = SigningContext::new(ACCESS_KEY, SECRET_KEY, timestamp);
        assert!(signing.string_to_sign().contains("\naudio\n"));
        assert_eq!(form_field(sent, "signature").unwrap(), signing.signature().unwrap());
    }

    #[actix_web::test]
    async fn test_oversized_sample_never_reaches_provider() {
        let server = provider_never_called().await;
        let app = init_app!(&server.uri());

        let oversized = vec![0u8; 6 * 1024 * 1024];
        let req = multipart_request(&[FormPart::File("audio", "big.wav", "audio/wav", &oversized)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "File too large" }));
    }

    #[actix_web::test]
    async fn test_sample_at_limit_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": { "code": 0 } })))
            .expect(1)
            .mount(&server)
            .await;
        let app = init_app!(&server.uri());

        let at_limit = vec![7u8; crate::relay::MAX_SAMPLE_BYTES];
        let req = multipart_request(&[FormPart::File("audio", "max.wav", "audio/wav", &at_limit)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let requests = server.received_requests().await.unwrap();
        let expected = crate::relay::MAX_SAMPLE_BYTES.to_string();
        assert_eq!(form_field(&requests[0].body, "sample_bytes"), Some(expected));
    }

    #[actix_web::test]
    async fn test_provider_limit_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({ "status": { "msg": "Limit exceeded" } })),
            )
            .mount(&server)
            .await;
        let app = init_app!(&server.uri());

        let req = multipart_request(&[FormPart::File("audio", "clip.wav", "audio/wav", b"0123456789")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Limit exceeded" }));
    }

    #[actix_web::test]
    async fn test_unreachable_provider() {
        let app = init_app!("http://127.0.0.1:1");

        let req = multipart_request(&[FormPart::File("audio", "clip.wav", "audio/wav", b"0123456789")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        let message = body["error"].as_str().unwrap();
        assert!(!message.is_empty());
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    /// Requests share nothing mutable, so a failure leaves the next one untouched.
    #[actix_web::test]
    async fn test_failure_does_not_affect_next_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": { "code": 0 } })))
            .expect(1)
            .mount(&server)
            .await;
        let app = init_app!(&server.uri());

        let req = multipart_request(&[FormPart::Text("recordType", "audio")]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = multipart_request(&[FormPart::File("audio", "clip.wav", "audio/wav", b"0123456789")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
