use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Creative,
    Bold,
}

/// Body of `POST /api/generate`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody<'a> {
    pub source_text: &'a str,
    pub tone: Tone,
}

/// Error payload returned with a 400
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_wire_format() {
        let body = GenerateBody { source_text: "notes", tone: Tone::Creative };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "sourceText": "notes", "tone": "creative" })
        );
    }
}
