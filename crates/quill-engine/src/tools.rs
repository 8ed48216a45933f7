//! Tool definitions sent to the model, and the registry that owns them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// JSON Schema-compatible parameter definition for a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolParameterSchema {
    /// Top-level JSON Schema type.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property definitions (when type is `object`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, Value>>,
    /// Required property names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl ToolParameterSchema {
    fn object(properties: Value, required: &[&str]) -> Self {
        let Value::Object(properties) = properties else {
            unreachable!("schema properties are always object literals");
        };
        Self {
            schema_type: "object".into(),
            properties: Some(properties),
            required: if required.is_empty() {
                None
            } else {
                Some(required.iter().map(|&s| s.to_owned()).collect())
            },
        }
    }
}

/// A tool definition that can be sent to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: ToolParameterSchema,
}

/// Registry of every tool the engine can execute.
#[derive(Clone, Debug)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// The full built-in tool set.
    #[must_use]
    pub fn builtin() -> Self {
        let mut tools = HashMap::new();
        for def in builtin_definitions() {
            let _ = tools.insert(def.name.clone(), def);
        }
        Self { tools }
    }

    /// Look up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Whether `name` is a registered tool.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// All definitions, sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().cloned().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn anchor_schema() -> Value {
    json!({
        "type": "object",
        "description": "Insertion point: an existing element ID plus an edge",
        "properties": {
            "id": {"type": "string", "description": "Existing element ID"},
            "edge": {"type": "string", "enum": ["begin", "end"]}
        },
        "required": ["id", "edge"]
    })
}

fn text_style_schema() -> Value {
    json!({
        "type": "object",
        "description": "Partial text style; unset fields are left unchanged",
        "properties": {
            "bold": {"type": "boolean"},
            "italic": {"type": "boolean"},
            "underline": {"type": "boolean"},
            "strikethrough": {"type": "boolean"},
            "fontSize": {"type": "number", "description": "Font size in points"},
            "color": {"type": "string", "description": "Named CSS color, #abc, #aabbcc, rgb() or rgba()"},
            "link": {"type": "string", "description": "Hyperlink URL"}
        }
    })
}

fn kinds_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "string",
            "enum": [
                "document", "section", "paragraph", "table",
                "table-row", "table-cell", "inline-text", "inline-image"
            ]
        }
    })
}

#[allow(clippy::too_many_lines)]
fn builtin_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_elements".into(),
            description: "List document elements with previews, optionally filtered by kind or parent. Element IDs are positional and change after every mutation; re-list before reusing them.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "kinds": kinds_schema(),
                    "parentId": {"type": "string", "description": "Restrict to direct children of this element"}
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: "search_elements".into(),
            description: "Rank elements against a query (BM25 + phrase + proximity), or test a regex against every element. Returns scored hits with snippets.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "query": {"type": "string"},
                    "mode": {"type": "string", "enum": ["exact_phrase", "keyword", "hybrid"]},
                    "kinds": kinds_schema(),
                    "maxResults": {"type": "integer", "minimum": 1},
                    "minScore": {"type": "number"},
                    "regex": {"type": "string", "description": "Regex pattern; when set the query is ignored"},
                    "caseSensitive": {"type": "boolean"}
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: "scroll_elements".into(),
            description: "Page through elements in document order. Pass the cursor from the previous page to continue.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "cursor": {"type": "string", "description": "Last element ID of the previous page"},
                    "limit": {"type": "integer", "minimum": 1},
                    "kinds": kinds_schema()
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: "add_paragraphs".into(),
            description: "Insert one or more paragraphs, each at its own anchor. Anchors are resolved against the document state before any insertion.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "anchor": anchor_schema(),
                                "text": {"type": "string"},
                                "textStyle": text_style_schema()
                            },
                            "required": ["anchor", "text"]
                        }
                    }
                }),
                &["items"],
            ),
        },
        ToolDefinition {
            name: "replace_paragraph".into(),
            description: "Replace a paragraph's whole text, or a character range of it via `edit`.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "id": {"type": "string", "description": "Paragraph element ID"},
                    "text": {"type": "string", "description": "Full replacement text"},
                    "textStyle": text_style_schema(),
                    "edit": {
                        "type": "object",
                        "properties": {
                            "start": {"type": "integer", "minimum": 0},
                            "end": {"type": "integer", "minimum": 0},
                            "text": {"type": "string"},
                            "textStyle": text_style_schema()
                        },
                        "required": ["start", "end", "text"]
                    }
                }),
                &["id"],
            ),
        },
        ToolDefinition {
            name: "add_table".into(),
            description: "Insert a table at an anchor. Columns are padded to the widest of headers and rows.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "anchor": anchor_schema(),
                    "headers": {"type": "array", "items": {"type": "string"}},
                    "rows": {"type": "array", "items": {"type": "array", "items": {"type": "string"}}}
                }),
                &["anchor"],
            ),
        },
        ToolDefinition {
            name: "replace_table".into(),
            description: "Replace a table's entire content with new headers and rows.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "id": {"type": "string", "description": "Table element ID"},
                    "headers": {"type": "array", "items": {"type": "string"}},
                    "rows": {"type": "array", "items": {"type": "array", "items": {"type": "string"}}}
                }),
                &["id"],
            ),
        },
        ToolDefinition {
            name: "edit_image".into(),
            description: "Update an inline image's width, height, or alt text.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "id": {"type": "string", "description": "Inline image element ID"},
                    "width": {"type": "integer", "minimum": 1},
                    "height": {"type": "integer", "minimum": 1},
                    "alt": {"type": "string"}
                }),
                &["id"],
            ),
        },
        ToolDefinition {
            name: "delete_element".into(),
            description: "Delete an element. The document root cannot be deleted; deleting the last section clears it instead; deleting an inline run clears its text.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "id": {"type": "string"}
                }),
                &["id"],
            ),
        },
        ToolDefinition {
            name: "set_table_header_text_style".into(),
            description: "Apply a text style to every paragraph in a table's header row (row 0) only.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "id": {"type": "string", "description": "Table element ID"},
                    "textStyle": text_style_schema()
                }),
                &["id", "textStyle"],
            ),
        },
        ToolDefinition {
            name: "set_paragraph_text_style".into(),
            description: "Apply a text style to a paragraph, a single inline run, or every paragraph in a table row or cell.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "id": {"type": "string", "description": "Element ID with prefix p, it, tr, or tc"},
                    "textStyle": text_style_schema()
                }),
                &["id", "textStyle"],
            ),
        },
        ToolDefinition {
            name: "adjust_paragraph_text_style".into(),
            description: "Shift font size by a relative delta. Runs without an explicit size count as 11pt; results are clamped to [1, 400] and written back as absolute sizes.".into(),
            parameters: ToolParameterSchema::object(
                json!({
                    "id": {"type": "string", "description": "Element ID with prefix p, it, tr, or tc"},
                    "fontSizeDelta": {"type": "number"}
                }),
                &["id", "fontSizeDelta"],
            ),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_all_twelve_tools() {
        let registry = ToolRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec![
                "add_paragraphs",
                "add_table",
                "adjust_paragraph_text_style",
                "delete_element",
                "edit_image",
                "list_elements",
                "replace_paragraph",
                "replace_table",
                "scroll_elements",
                "search_elements",
                "set_paragraph_text_style",
                "set_table_header_text_style",
            ]
        );
    }

    #[test]
    fn definitions_are_valid_schemas() {
        for def in ToolRegistry::builtin().definitions() {
            assert_eq!(def.parameters.schema_type, "object");
            assert!(def.parameters.properties.is_some(), "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn lookup_by_name() {
        let registry = ToolRegistry::builtin();
        assert!(registry.contains("delete_element"));
        assert!(!registry.contains("drop_table"));
        let def = registry.get("add_paragraphs").unwrap();
        assert_eq!(def.parameters.required.as_deref(), Some(&["items".to_owned()][..]));
    }

    #[test]
    fn definition_serde_roundtrip() {
        let def = ToolRegistry::builtin().get("search_elements").cloned().unwrap();
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["parameters"]["type"], "object");
        let back: ToolDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);
    }
}
