use serde::{Deserialize, Serialize};

/// Server-issued identifier correlating successive long-poll calls to one session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollingIdentifier {
    #[serde(alias = "uniqueId")]
    pub unique_id: String,
    #[serde(alias = "accessHash")]
    pub access_hash: String,
}

/// Known update kinds the dispatcher can route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateType {
    ScanRequestApproved,
    ScanRequestRejected,
}

impl UpdateType {
    pub const ALL: [UpdateType; 2] = [
        UpdateType::ScanRequestApproved,
        UpdateType::ScanRequestRejected,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ScanRequestApproved" => Some(Self::ScanRequestApproved),
            "ScanRequestRejected" => Some(Self::ScanRequestRejected),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::ScanRequestApproved => "ScanRequestApproved",
            Self::ScanRequestRejected => "ScanRequestRejected",
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Generic envelope returned by a successful poll: a type tag plus the raw payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateContainer {
    #[serde(alias = "updateType")]
    pub update_type: String,
    #[serde(alias = "updateData", default)]
    pub update_data: serde_json::Value,
}

impl UpdateContainer {
    pub fn new(update_type: impl Into<String>, update_data: serde_json::Value) -> Self {
        Self {
            update_type: update_type.into(),
            update_data,
        }
    }
}
