//! JSON descriptor format read by the Power Query language service
//!
//! One symbol file is a JSON array of [`MicrosoftSymbolFile`] objects.

use serde::{Deserialize, Serialize};

use crate::symbol::{Symbol, SymbolKind};

/// VS Code `CompletionItemKind` codes
pub const COMPLETION_KIND_FUNCTION: u32 = 2;
pub const COMPLETION_KIND_VARIABLE: u32 = 5;
pub const COMPLETION_KIND_RECORD: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrosoftSymbolFile {
    pub name: String,
    pub completion_item_kind: u32,
    pub is_data_source: bool,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<SymbolDocumentation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_parameters: Option<Vec<FunctionParameter>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDocumentation {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub is_required: bool,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only on record-typed parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<RecordField>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub is_required: bool,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MicrosoftSymbolFile {
    /// Project a symbol into the descriptor format.
    ///
    /// The format has no record shape, so a record becomes a single `record`
    /// parameter whose `fields` list the record's fields.
    pub fn from_symbol(symbol: &Symbol) -> Self {
        let (completion_item_kind, type_name) = match symbol.kind {
            SymbolKind::Function { .. } => (COMPLETION_KIND_FUNCTION, "function"),
            SymbolKind::Variable => (COMPLETION_KIND_VARIABLE, "any"),
            SymbolKind::Record { .. } => (COMPLETION_KIND_RECORD, "record"),
        };

        let documentation = symbol.documentation.as_ref().map(|description| SymbolDocumentation {
            description: description.clone(),
            long_description: None,
            category: Some(symbol.source.category()),
        });

        let function_parameters = match &symbol.kind {
            SymbolKind::Function { parameters } => Some(
                parameters
                    .iter()
                    .map(|param| FunctionParameter {
                        name: param.name.clone(),
                        type_name: param.value_type.to_string(),
                        is_required: param.is_required,
                        is_nullable: param.is_nullable,
                        description: param.description.clone(),
                        fields: None,
                    })
                    .collect(),
            ),
            SymbolKind::Record { fields: Some(fields) } => Some(vec![FunctionParameter {
                name: "record".to_string(),
                type_name: "record".to_string(),
                is_required: true,
                is_nullable: false,
                description: Some(format!("{} record fields", symbol.name)),
                fields: Some(
                    fields
                        .iter()
                        .map(|field| RecordField {
                            name: field.name.clone(),
                            type_name: field.value_type.to_string(),
                            is_required: true,
                            is_nullable: false,
                            description: field.description.clone(),
                        })
                        .collect(),
                ),
            }]),
            SymbolKind::Record { fields: None } | SymbolKind::Variable => None,
        };

        Self {
            name: symbol.name.clone(),
            completion_item_kind,
            is_data_source: false,
            type_name: type_name.to_string(),
            documentation,
            function_parameters,
        }
    }
}

impl From<&Symbol> for MicrosoftSymbolFile {
    fn from(symbol: &Symbol) -> Self {
        Self::from_symbol(symbol)
    }
}

fn field(name: &str, type_name: &str, is_required: bool, description: &str) -> RecordField {
    RecordField {
        name: name.to_string(),
        type_name: type_name.to_string(),
        is_required,
        is_nullable: false,
        description: Some(description.to_string()),
    }
}

/// Hand-written descriptors for checking that the language service picks up
/// generated files: one function taking an options record, and one record.
pub fn sample_symbols() -> Vec<MicrosoftSymbolFile> {
    let test_function = MicrosoftSymbolFile {
        name: "TestFunction".to_string(),
        completion_item_kind: COMPLETION_KIND_FUNCTION,
        is_data_source: false,
        type_name: "function".to_string(),
        documentation: Some(SymbolDocumentation {
            description: "A test function for development".to_string(),
            long_description: Some("This is a longer description of the test function".to_string()),
            category: Some("Test".to_string()),
        }),
        function_parameters: Some(vec![
            FunctionParameter {
                name: "input".to_string(),
                type_name: "text".to_string(),
                is_required: true,
                is_nullable: false,
                description: Some("Input text parameter".to_string()),
                fields: None,
            },
            FunctionParameter {
                name: "options".to_string(),
                type_name: "record".to_string(),
                is_required: false,
                is_nullable: true,
                description: Some("Optional configuration record".to_string()),
                fields: Some(vec![
                    field("testMode", "logical", false, "Enable test mode"),
                    field("timeout", "number", false, "Timeout in seconds"),
                ]),
            },
        ]),
    };

    let test_record = MicrosoftSymbolFile {
        name: "TestRecord".to_string(),
        completion_item_kind: COMPLETION_KIND_RECORD,
        is_data_source: false,
        type_name: "record".to_string(),
        documentation: Some(SymbolDocumentation {
            description: "A test record for development".to_string(),
            long_description: None,
            category: Some("Test".to_string()),
        }),
        function_parameters: Some(vec![FunctionParameter {
            name: "record".to_string(),
            type_name: "record".to_string(),
            is_required: true,
            is_nullable: false,
            description: Some("Test record fields".to_string()),
            fields: Some(vec![
                field("name", "text", true, "Name field"),
                field("value", "number", true, "Value field"),
            ]),
        }]),
    };

    vec![test_function, test_record]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::symbol::{Field, Parameter, SourceFile, ValueType};

    fn source() -> Arc<SourceFile> {
        Arc::new(SourceFile::from_content("lib/Helpers.pq", ""))
    }

    #[test]
    fn test_variable_without_documentation() {
        let symbol = Symbol::new("Rate", SymbolKind::Variable, source(), 1);
        let value = serde_json::to_value(MicrosoftSymbolFile::from(&symbol)).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Rate",
                "completionItemKind": 5,
                "isDataSource": false,
                "type": "any"
            })
        );
    }

    #[test]
    fn test_function_projection() {
        let mut optional = Parameter::new("b", ValueType::Text);
        optional.is_required = false;
        optional.is_nullable = true;
        let symbol = Symbol::new(
            "F",
            SymbolKind::Function {
                parameters: vec![Parameter::new("a", ValueType::Number), optional],
            },
            source(),
            4,
        )
        .with_documentation(Some("Does things".to_string()));

        let value = serde_json::to_value(MicrosoftSymbolFile::from(&symbol)).unwrap();
        assert_eq!(value["completionItemKind"], 2);
        assert_eq!(value["type"], "function");
        assert_eq!(value["documentation"], json!({"description": "Does things", "category": "lib/Helpers"}));
        assert_eq!(
            value["functionParameters"][1],
            json!({"name": "b", "type": "text", "isRequired": false, "isNullable": true})
        );
    }

    #[test]
    fn test_record_becomes_single_parameter() {
        let symbol = Symbol::new(
            "Point",
            SymbolKind::Record {
                fields: Some(vec![Field::new("x", ValueType::Number), Field::new("y", ValueType::Text)]),
            },
            source(),
            1,
        );
        let value = serde_json::to_value(MicrosoftSymbolFile::from(&symbol)).unwrap();
        assert_eq!(value["completionItemKind"], 6);
        let params = value["functionParameters"].as_array().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0]["name"], "record");
        assert_eq!(params[0]["description"], "Point record fields");
        assert_eq!(
            params[0]["fields"],
            json!([
                {"name": "x", "type": "number", "isRequired": true, "isNullable": false},
                {"name": "y", "type": "text", "isRequired": true, "isNullable": false}
            ])
        );
    }

    #[test]
    fn test_key_order_matches_language_service_files() {
        let symbol = Symbol::new("R", SymbolKind::Record { fields: None }, source(), 1)
            .with_documentation(Some("doc".to_string()));
        let text = serde_json::to_string(&MicrosoftSymbolFile::from(&symbol)).unwrap();
        assert_eq!(
            text,
            r#"{"name":"R","completionItemKind":6,"isDataSource":false,"type":"record","documentation":{"description":"doc","category":"lib/Helpers"}}"#
        );
    }
}
