use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ParentReference: Represents the parent reference of a drive item.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct ParentReference {
    #[serde(default)]
    pub id: String,
    pub path: Option<String>,
}

/// DriveItem: a file or folder in the drive.
/// The adapter only ever holds copies of these; the remote side owns them.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct DriveItem {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "lastModifiedDateTime")]
    pub last_modified: Option<String>,
    #[serde(rename = "createdDateTime")]
    pub created_date: Option<String>,
    pub size: Option<u64>,
    pub folder: Option<FolderFacet>,
    pub file: Option<FileFacet>,
    #[serde(rename = "parentReference")]
    pub parent_reference: Option<ParentReference>,
}

impl DriveItem {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    pub fn size(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_date.as_deref())
    }

    pub fn updated_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.last_modified.as_deref())
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_reference.as_ref().map(|p| p.id.as_str())
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// FolderFacet: Represents the folder facet of a drive item.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct FolderFacet {
    #[serde(rename = "childCount", default)]
    pub child_count: u32,
}

/// FileFacet: Represents the file facet of a drive item.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct FileFacet {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
}

/// DriveItemCollection: one page of a children listing.
#[derive(Debug, Deserialize, Serialize)]
pub struct DriveItemCollection {
    #[serde(default)]
    pub value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Storage quota of the drive, in bytes.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Quota {
    pub total: Option<u64>,
    pub used: Option<u64>,
    pub remaining: Option<u64>,
    pub deleted: Option<u64>,
    pub state: Option<String>,
}

impl Quota {
    pub fn available(&self) -> u64 {
        self.remaining.unwrap_or(0)
    }
}

/// Drive resource, only the parts the adapter reads.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Drive {
    #[serde(default)]
    pub id: String,
    pub quota: Option<Quota>,
}

/// Metadata patch applied by `update_object`.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ItemUpdate {
    pub fn rename(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
        }
    }
}

/// Options for simple content uploads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: Option<String>,
}
