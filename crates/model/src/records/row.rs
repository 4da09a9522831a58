use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowData {
    pub entity: String,
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        RowData {
            entity: entity.to_string(),
            field_values,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .and_then(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Column name to natural JSON value, in column order.
    pub fn to_json(&self) -> serde_json::Value {
        let fields = self
            .field_values
            .iter()
            .map(|f| {
                let value = f.value.as_ref().map_or(serde_json::Value::Null, Value::to_json);
                (f.name.clone(), value)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(fields)
    }

    pub fn size_bytes(&self) -> usize {
        self.field_values
            .iter()
            .map(|f| f.name.len() + f.value.as_ref().map_or(0, Value::size_bytes))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_type::DataType;

    fn row() -> RowData {
        RowData::new(
            "orders",
            vec![
                FieldValue {
                    name: "id".into(),
                    value: Some(Value::Int(7)),
                    data_type: DataType::Long,
                },
                FieldValue {
                    name: "note".into(),
                    value: None,
                    data_type: DataType::String,
                },
            ],
        )
    }

    #[test]
    fn test_get_is_case_insensitive() {
        assert_eq!(row().get_value("ID"), Value::Int(7));
        assert_eq!(row().get_value("note"), Value::Null);
        assert_eq!(row().get_value("missing"), Value::Null);
        assert!(row().get("missing").is_none());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(
            row().to_json(),
            serde_json::json!({ "id": 7, "note": null })
        );
    }
}
