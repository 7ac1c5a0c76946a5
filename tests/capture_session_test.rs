//! End-to-end tests for the capture session state machine, run against
//! the synthetic stream backend.

#[cfg(test)]
mod capture_session_tests {
    use smilesim::capture::{CaptureSession, StreamBackend};
    use smilesim::errors::CaptureError;
    use smilesim::testing::SyntheticBackend;
    use smilesim::types::{CameraFacing, SessionPhase, StreamCapabilities, ZoomRange};
    use std::sync::Arc;

    async fn open_with(backend: &Arc<SyntheticBackend>) -> CaptureSession {
        CaptureSession::open(
            Arc::clone(backend) as Arc<dyn StreamBackend>,
            CameraFacing::Environment,
            90,
        )
        .await
        .expect("synthetic open should succeed")
    }

    #[tokio::test]
    async fn test_open_goes_live_with_capabilities() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;

        assert_eq!(session.phase().await, SessionPhase::Live);
        assert!(session.capabilities().await.flash_supported);
        assert!(session.capabilities().await.zoom.is_some());
        assert_eq!(backend.acquire_count(), 1);
        assert_eq!(backend.live_stream_count(), 1);
        assert!(session.stream_id().await.is_some());
        assert!(session.device_id().await.is_some());
    }

    #[tokio::test]
    async fn test_close_stops_the_stream() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;

        session.close().await;
        assert_eq!(session.phase().await, SessionPhase::Idle);
        assert_eq!(backend.live_stream_count(), 0);
        assert!(session.stream_id().await.is_none());
        assert!(session.last_still().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;

        session.close().await;
        session.close().await;
        assert_eq!(session.phase().await, SessionPhase::Idle);
        assert_eq!(backend.live_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_close_releases_exactly_once() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;
        let other = session.clone();

        tokio::join!(session.close(), other.close());
        assert_eq!(backend.live_stream_count(), 0);
        assert_eq!(session.phase().await, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_facing_fallback_retries_unconstrained() {
        let backend = Arc::new(SyntheticBackend::new().reject_facing(CameraFacing::Environment));
        let session = open_with(&backend).await;

        // First acquisition is refused, the unconstrained retry succeeds
        assert_eq!(backend.acquire_count(), 2);
        assert_eq!(session.phase().await, SessionPhase::Live);
    }

    #[tokio::test]
    async fn test_total_acquisition_failure_leaves_nothing_live() {
        let backend = Arc::new(SyntheticBackend::new().fail_all());
        let result = CaptureSession::open(
            Arc::clone(&backend) as Arc<dyn StreamBackend>,
            CameraFacing::Environment,
            90,
        )
        .await;

        match result {
            Err(CaptureError::DeviceUnavailable(_)) => {}
            other => panic!("expected DeviceUnavailable, got {:?}", other.map(|_| ())),
        }
        assert_eq!(backend.acquire_count(), 2);
        assert_eq!(backend.live_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_capture_freezes_and_stops_the_stream() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;

        let still = session.capture_still().await.unwrap();
        assert_eq!(session.phase().await, SessionPhase::Frozen);
        assert_eq!(backend.live_stream_count(), 0);
        assert_eq!(session.last_still().await.unwrap().id, still.id);

        // The frozen frame is a decodable JPEG at the stream's resolution
        let decoded = image::load_from_memory(&still.data).unwrap();
        assert_eq!(decoded.width(), still.width);
        assert_eq!(decoded.height(), still.height);
    }

    #[tokio::test]
    async fn test_operations_rejected_in_wrong_phase() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;

        // Retake needs a frozen session
        assert!(matches!(
            session.retake().await,
            Err(CaptureError::InvalidState(_))
        ));

        session.capture_still().await.unwrap();

        // Frozen sessions refuse live-only operations
        assert!(matches!(
            session.capture_still().await,
            Err(CaptureError::InvalidState(_))
        ));
        assert!(matches!(
            session.toggle_flash().await,
            Err(CaptureError::InvalidState(_))
        ));
        assert!(matches!(
            session.set_zoom(2.0).await,
            Err(CaptureError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_retake_acquires_a_new_stream_identity() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;
        let first_stream = session.stream_id().await.unwrap();

        session.capture_still().await.unwrap();
        session.retake().await.unwrap();

        assert_eq!(session.phase().await, SessionPhase::Live);
        assert!(session.last_still().await.is_none());
        assert_eq!(backend.acquire_count(), 2);
        assert_eq!(backend.live_stream_count(), 1);

        let second_stream = session.stream_id().await.unwrap();
        assert_ne!(first_stream, second_stream);
    }

    #[tokio::test]
    async fn test_flash_toggles_and_reports_state() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;

        assert!(!session.flash_enabled().await);
        assert!(session.toggle_flash().await.unwrap());
        assert!(session.flash_enabled().await);
        assert!(!session.toggle_flash().await.unwrap());
        assert!(!session.flash_enabled().await);
    }

    #[tokio::test]
    async fn test_flash_unsupported_is_an_error_but_stays_live() {
        let backend = Arc::new(SyntheticBackend::with_capabilities(
            StreamCapabilities::none(),
        ));
        let session = open_with(&backend).await;

        assert!(matches!(
            session.toggle_flash().await,
            Err(CaptureError::ControlError(_))
        ));
        assert_eq!(session.phase().await, SessionPhase::Live);

        // The stream still works, so a capture is still possible
        assert!(session.capture_still().await.is_ok());
    }

    #[tokio::test]
    async fn test_torch_write_failure_is_surfaced_and_state_unchanged() {
        let backend = Arc::new(SyntheticBackend::new().fail_torch());
        let session = open_with(&backend).await;

        assert!(matches!(
            session.toggle_flash().await,
            Err(CaptureError::ControlError(_))
        ));
        assert!(!session.flash_enabled().await);
        assert_eq!(session.phase().await, SessionPhase::Live);
    }

    #[tokio::test]
    async fn test_zoom_outside_range_passes_through_unclamped() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;

        session.set_zoom(9.5).await.unwrap();
        assert_eq!(session.zoom_level().await, Some(9.5));
    }

    #[tokio::test]
    async fn test_zoom_unsupported_is_a_control_error() {
        let backend = Arc::new(SyntheticBackend::with_capabilities(
            StreamCapabilities::none().with_flash(),
        ));
        let session = open_with(&backend).await;

        assert!(matches!(
            session.set_zoom(2.0).await,
            Err(CaptureError::ControlError(_))
        ));
        assert_eq!(session.zoom_level().await, None);
    }

    #[tokio::test]
    async fn test_capabilities_are_read_once_per_acquisition() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;
        assert!(session.capabilities().await.flash_supported);

        // Capability changes on the device do not affect the live session
        backend.set_capabilities(StreamCapabilities::none());
        assert!(session.capabilities().await.flash_supported);

        // A retake acquires fresh, so the new record is seen
        session.capture_still().await.unwrap();
        session.retake().await.unwrap();
        assert!(!session.capabilities().await.flash_supported);
    }

    #[tokio::test]
    async fn test_capture_clears_control_state() {
        let backend = Arc::new(SyntheticBackend::new());
        let session = open_with(&backend).await;

        session.toggle_flash().await.unwrap();
        session.set_zoom(2.5).await.unwrap();
        session.capture_still().await.unwrap();

        assert!(!session.flash_enabled().await);
        assert_eq!(session.zoom_level().await, None);

        // And a retake starts from defaults as well
        session.retake().await.unwrap();
        assert!(!session.flash_enabled().await);
        assert_eq!(session.zoom_level().await, None);
    }

    #[tokio::test]
    async fn test_zoom_range_is_advisory_metadata() {
        let backend = Arc::new(SyntheticBackend::with_capabilities(
            StreamCapabilities::none().with_zoom(ZoomRange::new(2.0, 3.0, 0.5)),
        ));
        let session = open_with(&backend).await;

        let zoom = session.capabilities().await.zoom.unwrap();
        assert_eq!(zoom.min, 2.0);
        assert_eq!(zoom.max, 3.0);

        // Below-range requests are applied as given
        session.set_zoom(1.0).await.unwrap();
        assert_eq!(session.zoom_level().await, Some(1.0));
    }
}
