use secrecy::Secret;
use service_core::config::{self as core_config, get_env, Environment};
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;

/// Default Gemini REST endpoint.
pub const DEFAULT_GENAI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const PRODUCTION_ORIGINS: &[&str] = &[
    "https://newchatai-pi.vercel.app",
    "https://your-frontend-domain.netlify.app",
];

const LOCAL_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub google: GoogleConfig,
    pub supabase: SupabaseConfig,
    pub cors: CorsConfig,
    pub static_dir: PathBuf,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
    /// Model for chat and text generation (e.g., gemini-2.0-flash)
    pub text_model: String,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. https://xyz.supabase.co
    pub url: String,
    pub anon_key: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let environment = Environment::current();
        let is_prod = environment.is_production();

        Ok(ChatConfig {
            common: common_config,
            environment,
            google: GoogleConfig {
                api_key: Secret::new(get_env("GOOGLE_API_KEY", None, is_prod)?),
                api_base: get_env("GENAI_API_BASE", Some(DEFAULT_GENAI_API_BASE), is_prod)?,
                text_model: get_env("GENAI_TEXT_MODEL", Some("gemini-2.0-flash"), is_prod)?,
            },
            supabase: SupabaseConfig {
                url: get_env("SUPABASE_URL", None, is_prod)?,
                anon_key: Secret::new(get_env("SUPABASE_ANON_KEY", None, is_prod)?),
            },
            cors: CorsConfig {
                allowed_origins: allowed_origins(
                    environment,
                    env::var("CORS_ALLOWED_ORIGINS").ok().as_deref(),
                ),
            },
            static_dir: static_dir(env::var("STATIC_DIR").ok()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }
}

/// CORS origins: an explicit comma-separated override, or the profile list.
pub fn allowed_origins(environment: Environment, override_list: Option<&str>) -> Vec<String> {
    if let Some(list) = override_list {
        let origins: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if !origins.is_empty() {
            return origins;
        }
    }

    let profile = if environment.is_production() {
        PRODUCTION_ORIGINS
    } else {
        LOCAL_ORIGINS
    };
    profile.iter().map(|o| o.to_string()).collect()
}

/// Resolve the static asset directory relative to either the workspace root
/// or the crate directory.
fn static_dir(configured: Option<String>) -> PathBuf {
    if let Some(dir) = configured.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    let base_path = env::current_dir().unwrap_or_default();
    if base_path.ends_with("chat-service") {
        base_path.join("public")
    } else {
        base_path.join("chat-service").join("public")
    }
}
