// src/queue/codec.rs
// =============================================================================
// Converts QueueMessages to and from the queue's wire format.
//
// Wire layout (SQS style, the attribute key casing matters to the queue):
//
//   {
//     "DelaySeconds": 0,
//     "MessageAttributes": {
//       "limit":       { "DataType": "Number", "StringValue": "25" },
//       "executionId": { "DataType": "String", "StringValue": "<uuid>" },
//       "rootUrl":     { "DataType": "String", "StringValue": "http://..." },
//       "invocations": { "DataType": "Number", "StringValue": "3" }
//     },
//     "MessageBody": "[\"http://...\", ...]"
//   }
//
// Decoding never trusts the attributes. Anything missing or unreadable falls
// back to a default that turns the message into a small, harmless crawl
// instead of a crashed worker.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::{ExecutionContext, QueueMessage};
use crate::error::TransportError;

/// Execution id used when a message arrives without one
pub const NO_OP_EXECUTION: &str = "no-op";
/// Root URL used when a message arrives without one
pub const PLACEHOLDER_ROOT: &str = "http://www.example.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "DataType")]
    pub data_type: String,
    #[serde(rename = "StringValue", default)]
    pub string_value: Option<String>,
}

impl Attribute {
    fn number(value: impl ToString) -> Self {
        Self {
            data_type: "Number".to_string(),
            string_value: Some(value.to_string()),
        }
    }

    fn string(value: &str) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_url: Option<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocations: Option<Attribute>,
}

/// A message exactly as it travels through the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "DelaySeconds", default)]
    pub delay_seconds: u32,
    #[serde(rename = "MessageAttributes", default)]
    pub attributes: MessageAttributes,
    #[serde(rename = "MessageBody")]
    pub body: String,
}

/// Builds the wire form of `targets` for the crawl in `context`
pub fn encode(targets: &[String], context: &ExecutionContext) -> Result<WireMessage, TransportError> {
    Ok(WireMessage {
        delay_seconds: 0,
        attributes: MessageAttributes {
            limit: Some(Attribute::number(context.limit)),
            execution_id: Some(Attribute::string(&context.execution_id)),
            root_url: Some(Attribute::string(&context.root_url)),
            invocations: Some(Attribute::number(context.invocations)),
        },
        body: serde_json::to_string(targets)?,
    })
}

/// Rebuilds a QueueMessage, filling gaps with safe defaults
///
/// `block_size` is worker configuration; it does not travel on the wire.
/// Only an unreadable body is an error: there is nothing safe to scan then.
pub fn decode(message: &WireMessage, block_size: usize) -> Result<QueueMessage, TransportError> {
    let targets: Vec<String> = serde_json::from_str(&message.body)?;
    let attrs = &message.attributes;

    let limit = value_of(&attrs.limit)
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(1);

    let execution_id = value_of(&attrs.execution_id)
        .unwrap_or(NO_OP_EXECUTION)
        .to_string();

    let root_url = value_of(&attrs.root_url)
        .unwrap_or(PLACEHOLDER_ROOT)
        .to_string();

    // A missing, zero or garbled counter restarts the lineage at 1
    let invocations = value_of(&attrs.invocations)
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1);

    Ok(QueueMessage {
        targets,
        context: ExecutionContext {
            execution_id,
            root_url,
            limit,
            invocations,
            block_size: block_size.max(1),
        },
    })
}

// The attribute's string value, if present and not blank
fn value_of(attribute: &Option<Attribute>) -> Option<&str> {
    attribute
        .as_ref()
        .and_then(|a| a.string_value.as_deref())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does #[serde(rename = "...")] do?
//    - It maps a Rust field name to a different name on the wire
//    - Here it gives us the PascalCase names queue services use
//
// 2. Why are all attributes Option?
//    - Messages from older or hand-written producers may omit some
//    - Missing values fall back to defaults instead of failing the cycle
// -----------------------------------------------------------------------------
