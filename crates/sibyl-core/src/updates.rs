//! Typed update payloads and the decoder that produces them.

use serde::{Deserialize, Serialize};

use crate::{
    domain::{UpdateContainer, UpdateType},
    errors::Error,
    Result,
};

/// Payload of a scan request decision made by an agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequestEvent {
    #[serde(alias = "uniqueId")]
    pub unique_id: String,
    #[serde(alias = "targetUser")]
    pub target_user: i64,
    #[serde(alias = "targetType", default)]
    pub target_type: i32,
    #[serde(alias = "agentReason", default)]
    pub agent_reason: String,
}

/// A decoded update, as handed to handlers.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateContext {
    ScanRequestApproved(ScanRequestEvent),
    ScanRequestRejected(ScanRequestEvent),
    /// A tag this client does not understand; routed nowhere.
    Unknown { update_type: String },
}

impl UpdateContext {
    /// Decode a container by its declared tag.
    ///
    /// Unrecognised tags are not an error: they come back as
    /// [`UpdateContext::Unknown`] so the router can drop them quietly.
    pub fn decode(container: &UpdateContainer) -> Result<Self> {
        let Some(ty) = UpdateType::from_tag(&container.update_type) else {
            return Ok(Self::Unknown {
                update_type: container.update_type.clone(),
            });
        };

        let decode_err = |e: serde_json::Error| Error::Decode {
            update_type: ty.as_tag().to_string(),
            reason: e.to_string(),
        };

        let ctx = match ty {
            UpdateType::ScanRequestApproved => Self::ScanRequestApproved(
                serde_json::from_value(container.update_data.clone()).map_err(decode_err)?,
            ),
            UpdateType::ScanRequestRejected => Self::ScanRequestRejected(
                serde_json::from_value(container.update_data.clone()).map_err(decode_err)?,
            ),
        };
        Ok(ctx)
    }

    pub fn update_type(&self) -> Option<UpdateType> {
        match self {
            Self::ScanRequestApproved(_) => Some(UpdateType::ScanRequestApproved),
            Self::ScanRequestRejected(_) => Some(UpdateType::ScanRequestRejected),
            Self::Unknown { .. } => None,
        }
    }

    pub fn scan_request(&self) -> Option<&ScanRequestEvent> {
        match self {
            Self::ScanRequestApproved(e) | Self::ScanRequestRejected(e) => Some(e),
            Self::Unknown { .. } => None,
        }
    }
}
