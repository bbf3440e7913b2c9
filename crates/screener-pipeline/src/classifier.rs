//! 远程分类客户端
//!
//! 把编码后的影像提交给托管的分类服务。请求不做自动重试，
//! 默认也不设置客户端超时，失败一律以分析错误返回给调用方。

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use screener_core::{
    AnalysisFailureKind, ClassificationResponse, EncodedImage, Result, ScreenerError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

/// 默认的分类服务地址
pub const DEFAULT_ENDPOINT: &str = "https://serverless.roboflow.com/diabetic-retinopathy-gmqiq/2";

/// 分类客户端接口
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    /// 提交影像并等待分类结果
    async fn classify(&self, image: &EncodedImage) -> Result<ClassificationResponse>;
}

/// Roboflow 托管推理服务客户端
pub struct RoboflowClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl RoboflowClient {
    /// 创建客户端
    ///
    /// `timeout` 为 `None` 时沿用传输层默认行为。
    pub fn new(endpoint: &str, api_key: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ScreenerError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self::with_client(client, endpoint, api_key))
    }

    /// 使用已配置好的 HTTP 客户端
    pub fn with_client(client: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 构建分类请求：原始 Base64 文本作为请求体，API Key 放在查询参数中
    fn build_request(&self, image: &EncodedImage) -> reqwest::RequestBuilder {
        self.client
            .post(&self.endpoint)
            .query(&[("api_key", self.api_key.as_str())])
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(image.as_str().to_owned())
    }
}

#[async_trait]
impl ClassifierClient for RoboflowClient {
    async fn classify(&self, image: &EncodedImage) -> Result<ClassificationResponse> {
        info!("Calling classifier at {}", self.endpoint);

        let response = self.build_request(image).send().await.map_err(|e| {
            error!("No response from classifier: {}", e);
            ScreenerError::analysis(AnalysisFailureKind::Network, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Classifier returned {}: {}", status, body);
            return Err(ScreenerError::analysis(
                AnalysisFailureKind::HttpStatus(status.as_u16()),
                format!("Request failed with status code {}: {}", status.as_u16(), body),
            ));
        }

        let body = response.text().await.map_err(|e| {
            ScreenerError::analysis(AnalysisFailureKind::Network, e.to_string())
        })?;
        let parsed = parse_response(&body)?;
        debug!(
            "Classifier response: top={} confidence={} ({} predictions)",
            parsed.top,
            parsed.confidence,
            parsed.predictions.len()
        );
        Ok(parsed)
    }
}

/// 解析分类服务的响应体
pub fn parse_response(body: &str) -> Result<ClassificationResponse> {
    let response: ClassificationResponse = serde_json::from_str(body).map_err(|e| {
        error!("Malformed classifier response: {}", e);
        ScreenerError::analysis(AnalysisFailureKind::MalformedResponse, e.to_string())
    })?;
    validate_response(&response)?;
    Ok(response)
}

/// 检查响应的置信度是否为 [0, 1] 内的有限值
pub fn validate_response(response: &ClassificationResponse) -> Result<()> {
    if response.confidence.is_finite() && (0.0..=1.0).contains(&response.confidence) {
        return Ok(());
    }
    error!(
        "Classifier confidence {} outside [0, 1] for label {}",
        response.confidence, response.top
    );
    Err(ScreenerError::analysis(
        AnalysisFailureKind::MalformedResponse,
        format!("confidence {} is outside [0, 1]", response.confidence),
    ))
}

/// 可编排的模拟分类客户端
pub struct MockClassifier {
    outcome: MockOutcome,
    calls: AtomicUsize,
}

enum MockOutcome {
    Respond(ClassificationResponse),
    Fail(AnalysisFailureKind, String),
}

impl MockClassifier {
    /// 始终返回给定的类别和置信度
    pub fn responding(top: &str, confidence: f64) -> Self {
        Self::with_response(ClassificationResponse::new(top, confidence))
    }

    pub fn with_response(response: ClassificationResponse) -> Self {
        Self {
            outcome: MockOutcome::Respond(response),
            calls: AtomicUsize::new(0),
        }
    }

    /// 始终以网络错误失败
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: MockOutcome::Fail(AnalysisFailureKind::Network, message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 已收到的调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassifierClient for MockClassifier {
    async fn classify(&self, _image: &EncodedImage) -> Result<ClassificationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            MockOutcome::Respond(response) => Ok(response.clone()),
            MockOutcome::Fail(kind, message) => {
                Err(ScreenerError::analysis(kind.clone(), message.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_bytes;

    const SAMPLE_RESPONSE: &str = r#"{
        "inference_id": "5f1c0b8e-2a7d-4f43-9b53-3c1e0f6a9d21",
        "time": 0.0831,
        "image": {"width": 640, "height": 480},
        "predictions": [
            {"class": "Moderate", "class_id": 2, "confidence": 0.7412},
            {"class": "Mild", "class_id": 1, "confidence": 0.1803},
            {"class": "No_DR", "class_id": 0, "confidence": 0.0785}
        ],
        "top": "Moderate",
        "confidence": 0.7412
    }"#;

    #[test]
    fn test_request_shape() {
        let client = RoboflowClient::new(DEFAULT_ENDPOINT, "test-key", None).unwrap();
        let request = client.build_request(&encode_bytes(b"retina")).build().unwrap();

        assert_eq!(request.method(), &reqwest::Method::POST);
        assert_eq!(request.url().host_str(), Some("serverless.roboflow.com"));
        assert_eq!(request.url().path(), "/diabetic-retinopathy-gmqiq/2");
        assert_eq!(request.url().query(), Some("api_key=test-key"));
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            request.body().and_then(|b| b.as_bytes()),
            Some("cmV0aW5h".as_bytes())
        );
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = RoboflowClient::new("http://localhost:9001/model/1/", "k", None).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9001/model/1");
    }

    #[test]
    fn test_parse_full_response() {
        let parsed = parse_response(SAMPLE_RESPONSE).unwrap();
        assert_eq!(parsed.top, "Moderate");
        assert_eq!(parsed.confidence, 0.7412);
        assert_eq!(parsed.predictions.len(), 3);
        assert_eq!(parsed.predictions[2].class_name, "No_DR");
        assert_eq!(parsed.image.unwrap().width, 640);
    }

    #[test]
    fn test_parse_minimal_response() {
        let parsed = parse_response(r#"{"top": "Mild", "confidence": 0.623}"#).unwrap();
        assert_eq!(parsed.top, "Mild");
        assert!(parsed.predictions.is_empty());
    }

    #[test]
    fn test_parse_malformed_response() {
        let err = parse_response(r#"{"message": "Unauthorized"}"#).unwrap_err();
        match err {
            ScreenerError::Analysis { kind, .. } => {
                assert_eq!(kind, AnalysisFailureKind::MalformedResponse)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range_confidence() {
        for body in [
            r#"{"top": "Mild", "confidence": 1e307}"#,
            r#"{"top": "Mild", "confidence": 1.2}"#,
            r#"{"top": "Mild", "confidence": -0.1}"#,
        ] {
            match parse_response(body).unwrap_err() {
                ScreenerError::Analysis { kind, .. } => {
                    assert_eq!(kind, AnalysisFailureKind::MalformedResponse)
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        assert!(parse_response(r#"{"top": "No_DR", "confidence": 1.0}"#).is_ok());
        assert!(parse_response(r#"{"top": "No_DR", "confidence": 0}"#).is_ok());
    }

    /// 直连本机的客户端，不经过环境变量中的代理
    fn local_client(endpoint: &str, api_key: &str) -> RoboflowClient {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        RoboflowClient::with_client(client, endpoint, api_key)
    }

    /// 本地单次应答服务器，返回收到的原始请求
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&received).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(received).unwrap()
        });

        (format!("http://{}/diabetic-retinopathy/2", addr), handle)
    }

    #[tokio::test]
    async fn test_classify_posts_encoded_image() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", SAMPLE_RESPONSE).await;
        let client = local_client(&endpoint, "secret-key");

        let parsed = client.classify(&encode_bytes(b"retina")).await.unwrap();
        assert_eq!(parsed.top, "Moderate");
        assert_eq!(parsed.confidence, 0.7412);

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /diabetic-retinopathy/2?api_key=secret-key HTTP/1.1"));
        assert!(head
            .to_ascii_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert_eq!(body, "cmV0aW5h");
    }

    #[tokio::test]
    async fn test_classify_http_error_status() {
        let (endpoint, server) = serve_once(
            "HTTP/1.1 401 Unauthorized",
            r#"{"message":"Unauthorized api_key"}"#,
        )
        .await;
        let client = local_client(&endpoint, "bad-key");

        let err = client.classify(&encode_bytes(b"retina")).await.unwrap_err();
        server.await.unwrap();

        assert!(err.is_retryable());
        match err {
            ScreenerError::Analysis { kind, message } => {
                assert_eq!(kind, AnalysisFailureKind::HttpStatus(401));
                assert_eq!(
                    message,
                    r#"Request failed with status code 401: {"message":"Unauthorized api_key"}"#
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        // 端口 9 (discard) 在测试环境中通常无人监听
        let client = local_client("http://127.0.0.1:9/model/1", "k");
        let err = client.classify(&encode_bytes(b"x")).await.unwrap_err();
        match err {
            ScreenerError::Analysis { kind, .. } => assert_eq!(kind, AnalysisFailureKind::Network),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_classifier_counts_calls() {
        let mock = MockClassifier::responding("Mild", 0.5);
        let image = encode_bytes(b"x");
        mock.classify(&image).await.unwrap();
        mock.classify(&image).await.unwrap();
        assert_eq!(mock.calls(), 2);

        let failing = MockClassifier::failing("offline");
        assert!(failing.classify(&image).await.unwrap_err().is_retryable());
    }
}
