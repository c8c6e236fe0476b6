use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub geocoding: GeocodingConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; required at startup
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
    /// Upper bound on any single geocoding or media call
    pub upstream_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub base_url: String,
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub places_folder: String,
    pub users_folder: String,
}

impl MediaConfig {
    /// Credentials triple, present only when all three are configured
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.cloud_name, &self.api_key, &self.api_secret) {
            (Some(cloud), Some(key), Some(secret)) => Some((cloud, key, secret)),
            _ => None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(port) = env::var("PLACES_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_UPSTREAM_TIMEOUT_SECS") {
            self.api.upstream_timeout_secs = v.parse().unwrap_or(self.api.upstream_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Geocoding overrides
        if let Ok(v) = env::var("GOOGLE_API_KEY") {
            self.geocoding.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = env::var("GEOCODING_BASE_URL") {
            self.geocoding.base_url = v;
        }

        // Media overrides
        if let Ok(v) = env::var("CLOUDINARY_BASE_URL") {
            self.media.base_url = v;
        }
        if let Ok(v) = env::var("CLOUDINARY_CLOUD_NAME") {
            self.media.cloud_name = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("CLOUDINARY_API_KEY") {
            self.media.api_key = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("CLOUDINARY_API_SECRET") {
            self.media.api_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("CLOUDINARY_PLACES_FOLDER") {
            self.media.places_folder = v;
        }
        if let Ok(v) = env::var("CLOUDINARY_USERS_FOLDER") {
            self.media.users_folder = v;
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                upstream_timeout_secs: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 1,
                cors_origins: Vec::new(),
            },
            geocoding: GeocodingConfig {
                api_key: None,
                base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            },
            media: MediaConfig {
                base_url: "https://api.cloudinary.com/v1_1".to_string(),
                cloud_name: None,
                api_key: None,
                api_secret: None,
                places_folder: "places".to_string(),
                users_folder: "users".to_string(),
            },
        }
    }

    pub fn development() -> Self {
        let mut config = Self::base(Environment::Development);
        config.security.cors_origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ];
        config
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api.max_request_size_bytes = 5 * 1024 * 1024; // 5MB
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.api.max_request_size_bytes = 2 * 1024 * 1024; // 2MB
        config.api.upstream_timeout_secs = 5;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }

    /// Settings that must be present before the server can start
    pub fn ensure_required(&self) -> Result<(), &'static str> {
        if self.database.url.is_empty() {
            return Err("DATABASE_URL");
        }
        if self.security.jwt_secret.is_empty() {
            return Err("JWT_SECRET");
        }
        Ok(())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
