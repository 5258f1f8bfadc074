use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Stage 1 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub extracted_text: String,

    #[serde(default)]
    pub document_type: Option<String>,

    /// Provider-specific fields we pass through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtractionResult {
    pub fn new(extracted_text: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            extracted_text: extracted_text.into(),
            document_type: Some(document_type.into()),
            extra: Map::new(),
        }
    }

    /// The raw label, empty when the provider sent none.
    pub fn document_type_label(&self) -> &str {
        self.document_type.as_deref().unwrap_or("")
    }
}

/// Stage 2 response. Absent or null sections come back empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub vendor_details: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_details: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub invoice_details: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub line_items: Vec<Map<String, Value>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
