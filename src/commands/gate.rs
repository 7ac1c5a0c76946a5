use crate::types::{GateState, SessionInfo};
use serde::{Deserialize, Serialize};
use tauri::command;

/// Sign-up outcome: a session when the backend signs the user straight
/// in, otherwise a pending email confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpResponse {
    pub session: Option<SessionInfo>,
    pub requires_confirmation: bool,
}

/// Re-derive the access gate from the current session and profile
#[command]
pub async fn evaluate_access_gate() -> Result<GateState, String> {
    let runtime = super::init::runtime()?;
    let state = runtime.gate.evaluate().await;
    log::info!("Access gate evaluated: {}", state);
    Ok(state)
}

/// Get the last evaluated gate state without touching the backend
#[command]
pub async fn get_access_gate_state() -> Result<GateState, String> {
    let runtime = super::init::runtime()?;
    Ok(runtime.gate.state().await)
}

/// Acknowledge the pending-approval notice, signing the user out
#[command]
pub async fn dismiss_approval_notice() -> Result<GateState, String> {
    let runtime = super::init::runtime()?;

    match runtime.gate.dismiss_pending().await {
        Ok(state) => Ok(state),
        Err(e) => {
            log::error!("Failed to dismiss approval notice: {}", e);
            Err(format!("Failed to dismiss approval notice: {}", e))
        }
    }
}

/// Sign in with email and password
#[command]
pub async fn sign_in(email: String, password: String) -> Result<SessionInfo, String> {
    let runtime = super::init::runtime()?;

    match runtime.services.session.sign_in(&email, &password).await {
        Ok(session) => {
            log::info!("Signed in user {}", session.user_id);
            Ok(session)
        }
        Err(e) => {
            log::error!("Sign-in failed: {}", e);
            Err(format!("Sign-in failed: {}", e))
        }
    }
}

/// Create an account. Depending on backend settings the user is either
/// signed straight in or asked to confirm their email first.
#[command]
pub async fn sign_up(
    email: String,
    password: String,
    display_name: String,
    phone: String,
) -> Result<SignUpResponse, String> {
    let runtime = super::init::runtime()?;

    match runtime
        .services
        .session
        .sign_up(&email, &password, &display_name, &phone)
        .await
    {
        Ok(session) => {
            let requires_confirmation = session.is_none();
            log::info!(
                "Signed up {} (confirmation required: {})",
                email,
                requires_confirmation
            );
            Ok(SignUpResponse {
                session,
                requires_confirmation,
            })
        }
        Err(e) => {
            log::error!("Sign-up failed: {}", e);
            Err(format!("Sign-up failed: {}", e))
        }
    }
}

/// Request a password-reset email
#[command]
pub async fn request_password_reset(email: String) -> Result<String, String> {
    let runtime = super::init::runtime()?;

    match runtime
        .services
        .session
        .request_password_reset(&email)
        .await
    {
        Ok(()) => Ok(format!("Password reset email sent to {}", email)),
        Err(e) => {
            log::error!("Password reset request failed: {}", e);
            Err(format!("Password reset request failed: {}", e))
        }
    }
}

/// Sign out and block the gate
#[command]
pub async fn sign_out() -> Result<(), String> {
    let runtime = super::init::runtime()?;

    match runtime.gate.sign_out().await {
        Ok(()) => {
            log::info!("Signed out");
            Ok(())
        }
        Err(e) => {
            log::error!("Sign-out failed: {}", e);
            Err(format!("Sign-out failed: {}", e))
        }
    }
}

/// Get the locally mirrored session, if any
#[command]
pub async fn get_current_session() -> Result<Option<SessionInfo>, String> {
    let runtime = super::init::runtime()?;
    Ok(runtime.services.session.session())
}
