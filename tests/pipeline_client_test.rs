//! End-to-end tests for the simulation webhook client, run against
//! scripted transports.

#[cfg(test)]
mod pipeline_client_tests {
    use bytes::Bytes;
    use smilesim::config::PipelineConfig;
    use smilesim::pipeline::{
        ImagePipelineClient, PipelineFailureKind, RetryPolicy, TransportFault,
    };
    use smilesim::testing::{synthetic_jpeg, HangingTransport, ScriptedTransport};
    use smilesim::types::SimulationRequest;
    use std::time::Duration;

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            endpoint_url: Some("https://hooks.example.com/webhook/simulate".to_string()),
            ..Default::default()
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let jpeg = synthetic_jpeg(32, 24);
        let transport = ScriptedTransport::new(vec![
            Err(TransportFault::Unreachable("connection refused".to_string())),
            Err(TransportFault::Status(502)),
            Ok(Bytes::from(jpeg.clone())),
        ]);
        let client =
            ImagePipelineClient::new(transport, &test_config()).with_policy(fast_policy(3));

        let result = client
            .submit(SimulationRequest::new(synthetic_jpeg(16, 16), "clareamento"))
            .await
            .unwrap();

        assert_eq!(result.simulated_image, jpeg);
        assert!(image::load_from_memory(&result.simulated_image).is_ok());
    }

    #[tokio::test]
    async fn test_exhaustion_after_exactly_max_attempts() {
        let transport = ScriptedTransport::always_fail();
        let client =
            ImagePipelineClient::new(transport, &test_config()).with_policy(fast_policy(3));

        let err = client
            .submit(SimulationRequest::new(synthetic_jpeg(16, 16), "clareamento"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, PipelineFailureKind::ExhaustedRetries);
        assert!(err.message.contains("3 attempts"));
        // The last underlying failure is folded into the message
        assert!(err.message.contains("scripted transport exhausted"));
    }

    #[tokio::test]
    async fn test_every_configured_attempt_reaches_the_transport() {
        let transport = ScriptedTransport::always_fail();
        let client =
            ImagePipelineClient::new(transport, &test_config()).with_policy(fast_policy(4));

        let _ = client
            .submit(SimulationRequest::new(synthetic_jpeg(16, 16), "clareamento"))
            .await;

        assert_eq!(client.transport().attempts(), 4);
    }

    #[tokio::test]
    async fn test_empty_response_body_is_retried_then_reported() {
        let transport = ScriptedTransport::new(vec![
            Ok(Bytes::new()),
            Ok(Bytes::new()),
            Ok(Bytes::new()),
        ]);
        let client =
            ImagePipelineClient::new(transport, &test_config()).with_policy(fast_policy(3));

        let err = client
            .submit(SimulationRequest::new(synthetic_jpeg(16, 16), "clareamento"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, PipelineFailureKind::ExhaustedRetries);
        assert!(err.message.contains("empty response body"));
    }

    #[tokio::test]
    async fn test_undecodable_response_body_is_rejected() {
        let transport = ScriptedTransport::new(vec![Ok(Bytes::from_static(b"<html>oops</html>"))]);
        let client =
            ImagePipelineClient::new(transport, &test_config()).with_policy(fast_policy(1));

        let err = client
            .submit(SimulationRequest::new(synthetic_jpeg(16, 16), "clareamento"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, PipelineFailureKind::ExhaustedRetries);
        assert!(err.message.contains("not a decodable image"));
    }

    #[tokio::test]
    async fn test_successful_submission_wire_format() {
        let source = synthetic_jpeg(16, 16);
        let response = synthetic_jpeg(32, 24);
        let transport = ScriptedTransport::new(vec![Ok(Bytes::from(response.clone()))]);
        let client = ImagePipelineClient::new(transport, &test_config());

        let request = SimulationRequest::new(source.clone(), "clareamento")
            .with_shade("A2")
            .with_reference("proc-42");
        let result = client.submit(request).await.unwrap();

        assert_eq!(result.original_image, source);
        assert_eq!(result.simulated_image, response);
        assert_eq!(result.procedure_reference.as_deref(), Some("proc-42"));

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        let (url, body) = &requests[0];
        assert_eq!(
            url,
            "https://hooks.example.com/webhook/simulate?procedure=clareamento"
        );
        let image_data = body["imageData"].as_str().unwrap();
        assert!(image_data.starts_with("data:image/jpeg;base64,"));
        assert_eq!(body["shade"], "A2");
        assert!(body.get("vitacor").is_none());
    }

    #[tokio::test]
    async fn test_legacy_contract_wire_format() {
        let response = synthetic_jpeg(32, 24);
        let transport = ScriptedTransport::new(vec![Ok(Bytes::from(response))]);
        let config = PipelineConfig {
            endpoint_url: Some("https://hooks.example.com/webhook/simulate".to_string()),
            legacy_contract: true,
            ..Default::default()
        };
        let client = ImagePipelineClient::new(transport, &config);

        let request = SimulationRequest::new(synthetic_jpeg(16, 16), "proc-42").with_shade("B1");
        client.submit(request).await.unwrap();

        let requests = client.transport().requests();
        let (url, body) = &requests[0];
        assert_eq!(
            url,
            "https://hooks.example.com/webhook/simulate?procedureId=proc-42"
        );
        assert_eq!(body["vitacor"], "B1");
        assert!(body.get("shade").is_none());
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails_without_attempts() {
        let transport = ScriptedTransport::always_fail();
        let config = PipelineConfig {
            endpoint_url: None,
            ..Default::default()
        };
        let client = ImagePipelineClient::new(transport, &config);

        let err = client
            .submit(SimulationRequest::new(synthetic_jpeg(16, 16), "clareamento"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, PipelineFailureKind::ConfigurationMissing);
        assert_eq!(client.transport().attempts(), 0);
    }

    #[tokio::test]
    async fn test_slow_transport_hits_the_attempt_deadline() {
        let transport = HangingTransport::new(Duration::from_secs(5));
        let client = ImagePipelineClient::new(transport, &test_config())
            .with_policy(fast_policy(1))
            .with_attempt_timeout(Duration::from_millis(30));

        let err = client
            .submit(SimulationRequest::new(synthetic_jpeg(16, 16), "clareamento"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, PipelineFailureKind::ExhaustedRetries);
        assert!(err.message.contains("timed out"));
        assert_eq!(client.transport().attempts(), 1);
    }
}
