//! Application configuration loaded from `config.toml` and environment
//! variables, environment taking precedence (§6, §4.9). The only
//! config-fatal condition is a missing or malformed `SUPABASE_SERVICE_ROLE`
//! key — everything else falls back to a documented default.

use crate::errors::{AppError, AppResult};
use base64::Engine;
use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role: String,
    pub server_host: String,
    pub server_port: u16,
    pub wwebjs_data_path: String,
    pub puppeteer_executable_path: Option<String>,
    pub receipts_bucket: String,
    pub mp_force_x1000: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_service_role: String::new(),
            server_host: "0.0.0.0".to_string(),
            server_port: 4000,
            wwebjs_data_path: "./.wwebjs_auth".to_string(),
            puppeteer_executable_path: None,
            receipts_bucket: "receipts".to_string(),
            mp_force_x1000: true,
        }
    }
}

/// Extract the project subdomain from a Supabase URL, e.g.
/// `https://abcxyz.supabase.co` -> `abcxyz`.
fn project_ref_from_url(url: &str) -> Option<&str> {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    without_scheme.split('.').next()
}

/// Decode a JWT's payload segment (base64url, no padding) into its claims,
/// without verifying the signature — this crate only needs the shape check
/// described in §6, not cryptographic validation.
fn decode_jwt_payload(token: &str) -> AppResult<serde_json::Value> {
    let payload_segment = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AppError::Config("service role key is not a JWT".to_string()))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_segment)
        .map_err(AppError::Base64)?;
    serde_json::from_slice(&bytes).map_err(AppError::from)
}

/// Validate that `service_role`'s `ref` claim matches the project subdomain
/// of `supabase_url` and that its `role` claim is `service_role` (§6,
/// §7 Config-fatal).
fn validate_service_role(supabase_url: &str, service_role: &str) -> AppResult<()> {
    let claims = decode_jwt_payload(service_role)?;
    let expected_ref = project_ref_from_url(supabase_url)
        .ok_or_else(|| AppError::Config("SUPABASE_URL has no project subdomain".to_string()))?;

    let claim_ref = claims
        .get("ref")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Config("service role JWT missing ref claim".to_string()))?;
    if claim_ref != expected_ref {
        return Err(AppError::Config(format!(
            "service role ref '{claim_ref}' does not match project '{expected_ref}'"
        )));
    }

    let claim_role = claims.get("role").and_then(|v| v.as_str());
    if claim_role != Some("service_role") {
        return Err(AppError::Config(
            "service role JWT role claim is not 'service_role'".to_string(),
        ));
    }

    Ok(())
}

impl AppConfig {
    /// Load configuration from `config.toml` (if present) and environment
    /// variables, validating the Supabase service-role key. Fails
    /// (config-fatal, per §7) if `SUPABASE_URL`/`SUPABASE_SERVICE_ROLE` are
    /// missing or the role key's shape doesn't match.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let config = Config::builder()
            .set_default("supabase_url", "")?
            .set_default("supabase_service_role", "")?
            .set_default("server_host", defaults.server_host.clone())?
            .set_default("server_port", defaults.server_port as i64)?
            .set_default("wwebjs_data_path", defaults.wwebjs_data_path.clone())?
            .set_default("receipts_bucket", defaults.receipts_bucket.clone())?
            .set_default("mp_force_x1000", defaults.mp_force_x1000)?
            .add_source(File::with_name("config").required(false))
            .add_source(config::Environment::default())
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(v) = env::var("SUPABASE_URL") {
            app_config.supabase_url = v;
        }
        if let Ok(v) = env::var("SUPABASE_SERVICE_ROLE") {
            app_config.supabase_service_role = v;
        }
        if let Ok(v) = env::var("SERVER_HOST") {
            app_config.server_host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(port) = v.parse() {
                app_config.server_port = port;
            }
        }
        if let Ok(v) = env::var("WWEBJS_DATA_PATH") {
            app_config.wwebjs_data_path = v;
        }
        if let Ok(v) = env::var("PUPPETEER_EXECUTABLE_PATH") {
            app_config.puppeteer_executable_path = Some(v);
        }
        if let Ok(v) = env::var("RECEIPTS_BUCKET") {
            app_config.receipts_bucket = v;
        }
        if let Ok(v) = env::var("MP_FORCE_X1000") {
            app_config.mp_force_x1000 = v.parse().unwrap_or(true);
        }

        if app_config.supabase_url.is_empty() || app_config.supabase_service_role.is_empty() {
            return Err(ConfigError::Message(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE are required".to_string(),
            ));
        }

        validate_service_role(&app_config.supabase_url, &app_config.supabase_service_role)
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(app_config)
    }

    /// Defaults usable for CLI/testing without a real Supabase project
    /// configured; never validates the service role key.
    pub fn get_defaults() -> AppConfig {
        AppConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_jwt(claims: serde_json::Value) -> String {
        let header = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"{}");
        let payload =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn project_ref_extracted_from_url() {
        assert_eq!(
            project_ref_from_url("https://abcxyz.supabase.co"),
            Some("abcxyz")
        );
    }

    #[test]
    fn validate_service_role_accepts_matching_ref_and_role() {
        let token = fake_jwt(serde_json::json!({"ref": "abcxyz", "role": "service_role"}));
        assert!(validate_service_role("https://abcxyz.supabase.co", &token).is_ok());
    }

    #[test]
    fn validate_service_role_rejects_mismatched_ref() {
        let token = fake_jwt(serde_json::json!({"ref": "other", "role": "service_role"}));
        assert!(validate_service_role("https://abcxyz.supabase.co", &token).is_err());
    }

    #[test]
    fn validate_service_role_rejects_wrong_role_claim() {
        let token = fake_jwt(serde_json::json!({"ref": "abcxyz", "role": "anon"}));
        assert!(validate_service_role("https://abcxyz.supabase.co", &token).is_err());
    }

    #[test]
    fn defaults_have_sensible_values() {
        let defaults = AppConfig::get_defaults();
        assert_eq!(defaults.server_port, 4000);
        assert_eq!(defaults.receipts_bucket, "receipts");
        assert!(defaults.mp_force_x1000);
    }
}
