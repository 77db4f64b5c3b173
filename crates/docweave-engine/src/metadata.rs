use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed allow-list of metadata fields carried in `// Key: value` comments
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataField {
    Type,
    Category,
    ModuleID,
    Title,
    UserStory,
    Jira,
    ParentAssemblies,
    Level,
    Implement,
    ConversionStatus,
    ConversionDate,
    ConvertedFromFile,
    ConvertedFromID,
    ConvertedFromTitle,
    Context,
    FilePath,
}

impl MetadataField {
    pub const ALL: [MetadataField; 16] = [
        MetadataField::Type,
        MetadataField::Category,
        MetadataField::ModuleID,
        MetadataField::Title,
        MetadataField::UserStory,
        MetadataField::Jira,
        MetadataField::ParentAssemblies,
        MetadataField::Level,
        MetadataField::Implement,
        MetadataField::ConversionStatus,
        MetadataField::ConversionDate,
        MetadataField::ConvertedFromFile,
        MetadataField::ConvertedFromID,
        MetadataField::ConvertedFromTitle,
        MetadataField::Context,
        MetadataField::FilePath,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetadataField::Type => "Type",
            MetadataField::Category => "Category",
            MetadataField::ModuleID => "ModuleID",
            MetadataField::Title => "Title",
            MetadataField::UserStory => "UserStory",
            MetadataField::Jira => "Jira",
            MetadataField::ParentAssemblies => "ParentAssemblies",
            MetadataField::Level => "Level",
            MetadataField::Implement => "Implement",
            MetadataField::ConversionStatus => "ConversionStatus",
            MetadataField::ConversionDate => "ConversionDate",
            MetadataField::ConvertedFromFile => "ConvertedFromFile",
            MetadataField::ConvertedFromID => "ConvertedFromID",
            MetadataField::ConvertedFromTitle => "ConvertedFromTitle",
            MetadataField::Context => "Context",
            MetadataField::FilePath => "FilePath",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown metadata field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for MetadataField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // TopicType is the upstream spelling of Type
        if s == "TopicType" {
            return Ok(MetadataField::Type);
        }
        MetadataField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Metadata collected for one candidate module or assembly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    fields: BTreeMap<MetadataField, String>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: MetadataField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: MetadataField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: MetadataField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn remove(&mut self, field: MetadataField) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetadataField, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// The `Type` value, lower-cased
    pub fn kind(&self) -> Option<String> {
        self.get(MetadataField::Type).map(str::to_lowercase)
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.get(MetadataField::Type)
            .is_some_and(|t| t.eq_ignore_ascii_case(kind))
    }

    pub fn is_skip(&self) -> bool {
        self.has_kind("skip")
    }
}
