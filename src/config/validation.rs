//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (channels reference existing peers/orderers)
//! - Validate value ranges (timeouts > 0, URLs parse)
//! - Check strategy names against the built-in registries
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{GatewayConfig, GatewayOptions};
use crate::events::registry::EVENT_STRATEGY_NAMES;
use crate::query::registry::QUERY_STRATEGY_NAMES;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate gateway options on their own.
pub fn validate_options(options: &GatewayOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_options(options, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a full configuration, options and topology.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_options(&config.options, &mut errors);

    if config.client.msp_id.is_empty() {
        errors.push(ValidationError::new("client.msp_id", "must not be empty"));
    }

    let mut peer_names = HashSet::new();
    for (i, peer) in config.peers.iter().enumerate() {
        if !peer_names.insert(peer.name.as_str()) {
            errors.push(ValidationError::new(
                format!("peers[{}].name", i),
                format!("duplicate peer name '{}'", peer.name),
            ));
        }
        if url::Url::parse(&peer.url).is_err() {
            errors.push(ValidationError::new(
                format!("peers[{}].url", i),
                format!("invalid URL '{}'", peer.url),
            ));
        }
        if url::Url::parse(&peer.event_url).is_err() {
            errors.push(ValidationError::new(
                format!("peers[{}].event_url", i),
                format!("invalid URL '{}'", peer.event_url),
            ));
        }
    }

    let mut orderer_names = HashSet::new();
    for (i, orderer) in config.orderers.iter().enumerate() {
        if !orderer_names.insert(orderer.name.as_str()) {
            errors.push(ValidationError::new(
                format!("orderers[{}].name", i),
                format!("duplicate orderer name '{}'", orderer.name),
            ));
        }
        if url::Url::parse(&orderer.url).is_err() {
            errors.push(ValidationError::new(
                format!("orderers[{}].url", i),
                format!("invalid URL '{}'", orderer.url),
            ));
        }
    }

    for (i, channel) in config.channels.iter().enumerate() {
        for peer in &channel.peers {
            if !peer_names.contains(peer.as_str()) {
                errors.push(ValidationError::new(
                    format!("channels[{}].peers", i),
                    format!("unknown peer '{}'", peer),
                ));
            }
        }
        for orderer in &channel.orderers {
            if !orderer_names.contains(orderer.as_str()) {
                errors.push(ValidationError::new(
                    format!("channels[{}].orderers", i),
                    format!("unknown orderer '{}'", orderer),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_options(options: &GatewayOptions, errors: &mut Vec<ValidationError>) {
    if options.query.timeout_secs == 0 {
        errors.push(ValidationError::new("query.timeout_secs", "must be greater than 0"));
    }
    if !QUERY_STRATEGY_NAMES.contains(&options.query.strategy.as_str()) {
        errors.push(ValidationError::new(
            "query.strategy",
            format!("unknown query strategy '{}'", options.query.strategy),
        ));
    }
    if options.transaction.commit_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "transaction.commit_timeout_secs",
            "must be greater than 0",
        ));
    }
    if !EVENT_STRATEGY_NAMES.contains(&options.transaction.strategy.as_str()) {
        errors.push(ValidationError::new(
            "transaction.strategy",
            format!("unknown event strategy '{}'", options.transaction.strategy),
        ));
    }
}
