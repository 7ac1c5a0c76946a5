use crate::config::PipelineConfig;
use crate::pipeline::encode::{detect_image_mime, encode_data_url};
use crate::pipeline::failure::PipelineFailure;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::transport::{TransportFault, WebhookTransport};
use crate::types::{SimulationRequest, SimulationResult};
use std::time::Duration;

/// Client for the external smile-simulation webhook.
///
/// Owns the full submission lifecycle: request encoding, retry
/// scheduling, per-attempt timeouts and response validation. The
/// transport is injected so tests can script responses without a
/// network.
pub struct ImagePipelineClient<T: WebhookTransport> {
    transport: T,
    policy: RetryPolicy,
    endpoint: Option<String>,
    attempt_timeout: Duration,
    legacy_contract: bool,
}

impl<T: WebhookTransport> ImagePipelineClient<T> {
    pub fn new(transport: T, config: &PipelineConfig) -> Self {
        Self {
            transport,
            policy: RetryPolicy::from_config(config),
            endpoint: config.endpoint_url.clone(),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            legacy_contract: config.legacy_contract,
        }
    }

    /// Override the retry policy, mainly to shorten delays in tests
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the per-attempt deadline
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The injected transport, mainly so tests can read its counters
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit a source image for simulation.
    ///
    /// A missing endpoint fails immediately without consuming any
    /// attempts. Everything after that point goes through the retry
    /// policy; the final error after exhaustion is always reported as
    /// `ExhaustedRetries` carrying the last underlying failure.
    pub async fn submit(
        &self,
        request: SimulationRequest,
    ) -> Result<SimulationResult, PipelineFailure> {
        let endpoint = match self.endpoint.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => {
                log::error!("Simulation requested but no webhook endpoint is configured");
                return Err(PipelineFailure::configuration_missing());
            }
        };

        let url = self.build_url(endpoint, &request)?;
        let body = self.build_body(&request);

        log::info!(
            "Submitting simulation for procedure '{}' ({} byte source image)",
            request.procedure_identifier,
            request.source_image.len()
        );

        let response = self
            .policy
            .run(|attempt| self.attempt_submit(attempt, &url, &body))
            .await?;

        Ok(SimulationResult {
            original_image: request.source_image,
            simulated_image: response,
            procedure_reference: request.procedure_reference,
        })
    }

    fn build_url(
        &self,
        endpoint: &str,
        request: &SimulationRequest,
    ) -> Result<String, PipelineFailure> {
        let mut url = reqwest::Url::parse(endpoint).map_err(|e| {
            PipelineFailure::invalid_endpoint(format!("invalid webhook URL '{}': {}", endpoint, e))
        })?;

        let param = if self.legacy_contract {
            "procedureId"
        } else {
            "procedure"
        };
        url.query_pairs_mut()
            .append_pair(param, &request.procedure_identifier);

        Ok(url.into())
    }

    fn build_body(&self, request: &SimulationRequest) -> serde_json::Value {
        let mime = detect_image_mime(&request.source_image);
        let image_data = encode_data_url(&mime, &request.source_image);

        let mut body = serde_json::json!({ "imageData": image_data });
        if let Some(shade) = &request.shade_identifier {
            let key = if self.legacy_contract {
                "vitacor"
            } else {
                "shade"
            };
            body[key] = serde_json::Value::String(shade.clone());
        }
        body
    }

    async fn attempt_submit(
        &self,
        attempt: u32,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<Vec<u8>, PipelineFailure> {
        log::debug!("Simulation attempt {} -> {}", attempt, url);

        let outcome = tokio::time::timeout(self.attempt_timeout, self.transport.post_json(url, body))
            .await
            .map_err(|_| PipelineFailure::timeout())?;

        let bytes = outcome.map_err(|fault| match fault {
            TransportFault::Timeout => PipelineFailure::timeout(),
            TransportFault::Unreachable(detail) => PipelineFailure::network_unreachable(detail),
            TransportFault::Status(code) => {
                PipelineFailure::invalid_response(format!("webhook returned status {}", code))
            }
            TransportFault::Transfer(detail) => PipelineFailure::network_unreachable(detail),
        })?;

        if bytes.is_empty() {
            return Err(PipelineFailure::invalid_response("empty response body"));
        }
        if image::load_from_memory(&bytes).is_err() {
            return Err(PipelineFailure::invalid_response(
                "response body is not a decodable image",
            ));
        }

        Ok(bytes.to_vec())
    }
}
