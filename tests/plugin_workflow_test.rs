//! Whole-plugin workflow test: the Tauri command layer wired to a
//! fake-backed runtime, walked through the consultation flow end to end.

#[cfg(test)]
mod plugin_workflow_tests {
    use smilesim::commands;
    use smilesim::commands::init::{install_runtime, PluginRuntime};
    use smilesim::pipeline::{encode_data_url, JPEG_MIME};
    use smilesim::services::{IdentityProvider, Services, SessionStore};
    use smilesim::testing::{
        synthetic_jpeg, InMemoryCatalog, InMemoryIdentity, InMemoryProfiles, InMemorySimulations,
        InMemoryStorage,
    };
    use smilesim::types::{GateState, Procedure, ProfileUpdate, ShadeSwatch, UserProfile};
    use std::sync::Arc;

    fn jpeg_data_url() -> String {
        encode_data_url(JPEG_MIME, &synthetic_jpeg(16, 16))
    }

    struct Fakes {
        identity: Arc<InMemoryIdentity>,
        profiles: Arc<InMemoryProfiles>,
        simulations: Arc<InMemorySimulations>,
        storage: Arc<InMemoryStorage>,
    }

    async fn install_fake_runtime() -> Fakes {
        let identity = Arc::new(InMemoryIdentity::new());
        let profiles = Arc::new(InMemoryProfiles::new());
        let catalog = Arc::new(InMemoryCatalog::new(
            vec![
                Procedure {
                    id: "proc-1".to_string(),
                    display_name: "Clareamento".to_string(),
                    webhook_value: "clareamento".to_string(),
                    active: true,
                },
                Procedure {
                    id: "proc-2".to_string(),
                    display_name: "Facetas".to_string(),
                    webhook_value: "facetas".to_string(),
                    active: false,
                },
            ],
            vec![ShadeSwatch {
                id: "shade-1".to_string(),
                display_name: "A1".to_string(),
                color_hex: "#F5F0E1".to_string(),
                active: true,
            }],
        ));
        let simulations = Arc::new(InMemorySimulations::new());
        let storage = Arc::new(InMemoryStorage::new());

        let session = SessionStore::new(identity.clone() as Arc<dyn IdentityProvider>);
        session.initialize().await.unwrap();

        let services = Services::new(
            session,
            profiles.clone(),
            catalog,
            simulations.clone(),
            storage.clone(),
        );
        install_runtime(Arc::new(PluginRuntime::from_services(services, "simulacoes")));

        Fakes {
            identity,
            profiles,
            simulations,
            storage,
        }
    }

    #[tokio::test]
    async fn test_full_consultation_workflow() {
        // Before initialization every runtime-backed command refuses
        let err = commands::catalog::get_procedures().await.unwrap_err();
        assert!(err.contains("not initialized"));

        let fakes = install_fake_runtime().await;

        // Signed out: the gate blocks
        assert!(commands::gate::get_current_session().await.unwrap().is_none());
        assert_eq!(
            commands::gate::evaluate_access_gate().await.unwrap(),
            GateState::Blocked
        );

        // Sign up asks for email confirmation with this backend
        let signup = commands::gate::sign_up(
            "dentist@example.com".to_string(),
            "secret".to_string(),
            "Dr. Souza".to_string(),
            "+55 11 99999-0000".to_string(),
        )
        .await
        .unwrap();
        assert!(signup.requires_confirmation);

        // Sign in; without a profile row the user is pending approval
        let session = commands::gate::sign_in(
            "dentist@example.com".to_string(),
            "secret".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(
            commands::gate::evaluate_access_gate().await.unwrap(),
            GateState::PendingApproval
        );

        // Without a profile row the logo URL cannot be recorded; the
        // uploaded object must be rolled back rather than orphaned
        let err = commands::profile::upload_profile_logo(jpeg_data_url())
            .await
            .unwrap_err();
        assert!(err.contains("Failed to record logo URL"));
        assert_eq!(fakes.storage.object_count(), 0);

        // Dismissing the notice signs out, exactly once
        assert_eq!(
            commands::gate::dismiss_approval_notice().await.unwrap(),
            GateState::Blocked
        );
        assert_eq!(fakes.identity.sign_out_calls(), 1);
        assert!(commands::gate::get_current_session().await.unwrap().is_none());

        // Approve the account and sign back in
        fakes.profiles.insert_profile(UserProfile {
            id: session.user_id.clone(),
            display_name: "Dr. Souza".to_string(),
            phone: None,
            company: None,
            tax_id: None,
            logo_url: None,
            active: true,
        });
        commands::gate::sign_in("dentist@example.com".to_string(), "secret".to_string())
            .await
            .unwrap();
        assert_eq!(
            commands::gate::evaluate_access_gate().await.unwrap(),
            GateState::Granted
        );

        // Catalogs come back filtered to active rows
        let procedures = commands::catalog::get_procedures().await.unwrap();
        assert_eq!(procedures.len(), 1);
        assert_eq!(procedures[0].display_name, "Clareamento");
        let shades = commands::catalog::get_shade_swatches().await.unwrap();
        assert_eq!(shades.len(), 1);
        commands::catalog::reload_catalog().await.unwrap();

        // Profile read and update
        let profile = commands::profile::get_user_profile().await.unwrap().unwrap();
        assert_eq!(profile.display_name, "Dr. Souza");
        let updated = commands::profile::update_user_profile(ProfileUpdate {
            company: Some("Clinica Sorriso".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(updated.company.as_deref(), Some("Clinica Sorriso"));

        // Logo upload stores an object and records its URL
        let with_logo = commands::profile::upload_profile_logo(jpeg_data_url())
            .await
            .unwrap();
        assert!(with_logo.logo_url.is_some());
        assert_eq!(fakes.storage.object_count(), 1);

        // Persist a simulation and read it back
        fakes
            .simulations
            .register_procedure_name("proc-1", "Clareamento");
        let saved = commands::records::save_simulation(
            "Maria Silva".to_string(),
            Some("proc-1".to_string()),
            jpeg_data_url(),
            jpeg_data_url(),
        )
        .await
        .unwrap();
        assert_eq!(saved.procedure_name.as_deref(), Some("Clareamento"));
        assert_eq!(fakes.storage.object_count(), 3);

        let listed = commands::records::list_simulations().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].patient_name, "Maria Silva");

        commands::records::delete_simulation(saved.id).await.unwrap();
        assert!(commands::records::list_simulations().await.unwrap().is_empty());
        assert_eq!(fakes.simulations.row_count(), 0);
        // The logo object remains; only the simulation pair was deleted
        assert_eq!(fakes.storage.object_count(), 1);

        // Sign out ends the session and blocks the gate
        commands::gate::sign_out().await.unwrap();
        assert_eq!(
            commands::gate::get_access_gate_state().await.unwrap(),
            GateState::Blocked
        );
        assert!(commands::gate::get_current_session().await.unwrap().is_none());
    }
}
