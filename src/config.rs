use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub report: ReportConfig,
    pub email: EmailConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub workbook_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from: String,
    pub password: String,
    pub to: Vec<String>,
    pub max_attempts: u32,
    pub retry_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/sales.db".to_string(),
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            source: SourceConfig {
                workbook_path: "data/input/sales_data.xlsx".to_string(),
            },
            report: ReportConfig {
                output_directory: "data/output".to_string(),
            },
            email: EmailConfig {
                smtp_server: "localhost".to_string(),
                smtp_port: 587,
                from: "reports@example.com".to_string(),
                password: String::new(),
                to: vec!["sales@example.com".to_string()],
                max_attempts: 3,
                retry_backoff_secs: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        // Start with default values
        let mut builder = Config::builder();
        for (key, value) in AppConfig::default() {
            builder = builder
                .set_default(&key, value)
                .map_err(|e| anyhow::anyhow!("Failed to set default for {}: {}", key, e))?;
        }

        let config = builder
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("SALES_REPORT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate email config
        if self.email.smtp_server.trim().is_empty() {
            return Err(anyhow::anyhow!("smtp_server cannot be empty"));
        }
        if self.email.to.is_empty() {
            return Err(anyhow::anyhow!("at least one recipient is required"));
        }
        if self.email.max_attempts == 0 {
            return Err(anyhow::anyhow!("max_attempts must be greater than 0"));
        }

        // Validate report config
        if self.report.output_directory.trim().is_empty() {
            return Err(anyhow::anyhow!("output_directory cannot be empty"));
        }

        Ok(())
    }

    /// Get database URL from environment or config
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get source workbook path from environment or config
    pub fn get_workbook_path(&self) -> String {
        std::env::var("SALES_WORKBOOK_PATH").unwrap_or_else(|_| self.source.workbook_path.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Get SMTP password from environment or config
    pub fn get_smtp_password(&self) -> String {
        std::env::var("SMTP_PASSWORD").unwrap_or_else(|_| self.email.password.clone())
    }
}

impl IntoIterator for AppConfig {
    type Item = (String, config::Value);
    type IntoIter = std::collections::hash_map::IntoIter<String, config::Value>;

    fn into_iter(self) -> Self::IntoIter {
        let mut map = std::collections::HashMap::new();

        // Flatten the configuration into key-value pairs
        map.insert("database.url".to_string(), config::Value::from(self.database.url));
        map.insert("database.max_connections".to_string(), config::Value::from(self.database.max_connections));
        map.insert(
            "database.connection_timeout_secs".to_string(),
            config::Value::from(self.database.connection_timeout_secs),
        );

        map.insert("source.workbook_path".to_string(), config::Value::from(self.source.workbook_path));

        map.insert("report.output_directory".to_string(), config::Value::from(self.report.output_directory));

        map.insert("email.smtp_server".to_string(), config::Value::from(self.email.smtp_server));
        map.insert("email.smtp_port".to_string(), config::Value::from(self.email.smtp_port));
        map.insert("email.from".to_string(), config::Value::from(self.email.from));
        map.insert("email.password".to_string(), config::Value::from(self.email.password));
        map.insert("email.to".to_string(), config::Value::from(self.email.to));
        map.insert("email.max_attempts".to_string(), config::Value::from(self.email.max_attempts));
        map.insert("email.retry_backoff_secs".to_string(), config::Value::from(self.email.retry_backoff_secs));

        map.insert("logging.level".to_string(), config::Value::from(self.logging.level));
        if let Some(file_path) = self.logging.file_path {
            map.insert("logging.file_path".to_string(), config::Value::from(file_path));
        }
        map.insert("logging.format".to_string(), config::Value::from(self.logging.format));

        map.into_iter()
    }
}
