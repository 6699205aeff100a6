//! Configuration validation.

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::{AllowConfig, Config};

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_session(config, &mut result);
        Self::validate_pump(config, &mut result);
        Self::validate_display(config, &mut result);
        Self::validate_host(config, &mut result);

        result
    }

    fn validate_session(config: &Config, result: &mut ValidationResult) {
        match &config.session.allow {
            AllowConfig::Keyword(keyword) => {
                if !AllowConfig::KEYWORDS.contains(&keyword.as_str()) {
                    result.add_error(ValidationError::new(
                        "session.allow",
                        format!(
                            "Unknown allow mode '{}', expected one of {:?} or {{ pattern = \"...\" }}",
                            keyword,
                            AllowConfig::KEYWORDS
                        ),
                    ));
                }
            }
            AllowConfig::Pattern { pattern } => {
                if let Err(e) = Regex::new(pattern) {
                    result.add_error(ValidationError::new(
                        "session.allow.pattern",
                        format!("Invalid pattern: {}", e),
                    ));
                }
            }
        }

        if config.session.script_timeout_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "session.script_timeout_ms",
                "Script deadline disabled, an unanswered ticket keeps the view loop pumping",
            ));
        }

        if config.session.event_prefix.is_empty() {
            result.add_error(ValidationError::new(
                "session.event_prefix",
                "Event prefix cannot be empty",
            ));
        } else if !config
            .session
            .event_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            result.add_error(ValidationError::new(
                "session.event_prefix",
                "Event prefix must be ASCII alphanumeric or '_'",
            ));
        }
    }

    fn validate_pump(config: &Config, result: &mut ValidationResult) {
        if config.pump.interval_ms == 0 {
            result.add_error(ValidationError::new(
                "pump.interval_ms",
                "interval_ms must be greater than 0",
            ));
        }

        if config.pump.interval_ms > 1000 {
            result.add_warning(ValidationWarning::new(
                "pump.interval_ms",
                "interval_ms is very high (>1000), page scripts will reply slowly",
            ));
        }
    }

    fn validate_display(config: &Config, result: &mut ValidationResult) {
        if let Some(screen) = &config.display.virtual_screen {
            if config.display.index == 0 {
                result.add_warning(ValidationWarning::new(
                    "display.virtual_screen",
                    "A virtual screen is never provisioned on display 0",
                ));
            }
            if screen.width == 0 || screen.height == 0 {
                result.add_error(ValidationError::new(
                    "display.virtual_screen",
                    "Screen width and height must be greater than 0",
                ));
            }
            if ![8, 16, 24, 32].contains(&screen.depth) {
                result.add_error(ValidationError::new(
                    "display.virtual_screen.depth",
                    "Depth must be one of 8, 16, 24, 32",
                ));
            }
        }
    }

    fn validate_host(config: &Config, result: &mut ValidationResult) {
        match &config.host.program {
            None => result.add_warning(ValidationWarning::new(
                "host.program",
                "No view host program configured",
            )),
            Some(program) if program.trim().is_empty() => result.add_error(ValidationError::new(
                "host.program",
                "Program cannot be empty",
            )),
            Some(_) => {}
        }

        if config.host.response_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "host.response_timeout_ms",
                "response_timeout_ms must be greater than 0",
            ));
        }
    }
}
