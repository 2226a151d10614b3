//! Configuration validation rules.

use super::schema::{Config, StorageBackend};

/// Validate configuration and return aggregated validation errors.
///
/// Missing credentials are not validation errors: the server starts in a
/// degraded mode and reports them per request.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push("server.port must be > 0".to_string());
    }

    if config.completion.max_tokens == 0 {
        errors.push("completion.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.completion.temperature) {
        errors.push("completion.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.completion.timeout_secs == 0 {
        errors.push("completion.timeout_secs must be > 0".to_string());
    }
    if config.completion.api_base.trim().is_empty() {
        errors.push("completion.api_base must not be empty".to_string());
    }

    if config.chat.max_messages == 0 {
        errors.push("chat.max_messages must be > 0".to_string());
    }
    if config.chat.system_prompt.trim().is_empty() {
        errors.push("chat.system_prompt must not be empty".to_string());
    }

    if config.storage.backend == StorageBackend::Supabase {
        if config.storage.table.trim().is_empty() {
            errors.push("storage.table must not be empty".to_string());
        }
        let url = config.storage.url.trim();
        if config.storage.is_configured()
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            errors.push("storage.url must start with http:// or https://".to_string());
        }
        if config.storage.timeout_secs == 0 {
            errors.push("storage.timeout_secs must be > 0".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        let config = Config::default();
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validate_accepts_missing_credentials() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Supabase;
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_storage_url() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Supabase;
        config.storage.url = "demo.supabase.co".to_string();
        config.storage.api_key = "anon".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("storage.url"));
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.chat.max_messages = 0;
        config.completion.max_tokens = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("chat.max_messages"));
        assert!(err.contains("completion.max_tokens"));
    }
}
