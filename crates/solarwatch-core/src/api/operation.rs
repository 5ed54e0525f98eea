//! GraphQL operations as they travel through the pipeline.

use serde_json::{Map, Value};

/// Whether an operation may be sent without a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Authenticated,
    /// Only `login` and `signup`
    Public,
}

/// A file to upload alongside an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read an upload from disk, naming it after the file
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }

    /// Explicit content type, else guessed from the file name
    pub fn mime_type(&self) -> String {
        self.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .to_string()
        })
    }
}

/// An upload bound to a dotted path inside the operation's variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Path relative to `variables`, e.g. `input.file`
    pub path: String,
    pub upload: Upload,
}

/// One request to the API, consumed by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub query: String,
    pub variables: Map<String, Value>,
    pub attachments: Vec<Attachment>,
    pub access: Access,
}

impl Operation {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            variables: Map::new(),
            attachments: Vec::new(),
            access: Access::Authenticated,
        }
    }

    /// Mark the operation as callable without a session
    pub fn public(mut self) -> Self {
        self.access = Access::Public;
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Bind an upload to `path` inside the variables.
    ///
    /// The variable itself is set to `null`; the bytes travel as a separate
    /// multipart part that the server maps back onto that path.
    pub fn attach(mut self, path: impl Into<String>, upload: Upload) -> Self {
        let path = path.into();
        set_null_at(&mut self.variables, &path);
        self.attachments.push(Attachment { path, upload });
        self
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// JSON body sent to the endpoint
    pub fn body(&self) -> Value {
        serde_json::json!({
            "operationName": self.name,
            "query": self.query,
            "variables": Value::Object(self.variables.clone()),
        })
    }
}

fn set_null_at(variables: &mut Map<String, Value>, path: &str) {
    let mut segments = path.split('.').peekable();
    let mut current = variables;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), Value::Null);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot.as_object_mut() {
            Some(map) => map,
            None => return,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attach_nulls_nested_variable() {
        let op = Operation::new("CreateFacility", "mutation {}")
            .variable("input", json!({ "name": "Roof", "nominalPower": 12.5 }))
            .attach("input.file", Upload::new("data.csv", b"a,b\n".to_vec()));

        assert_eq!(
            Value::Object(op.variables.clone()),
            json!({ "input": { "name": "Roof", "nominalPower": 12.5, "file": null } })
        );
        assert_eq!(op.attachments.len(), 1);
        assert_eq!(op.attachments[0].path, "input.file");
    }

    #[test]
    fn test_attach_creates_missing_objects() {
        let op = Operation::new("Op", "q").attach("a.b.c", Upload::new("x.bin", vec![1]));
        assert_eq!(Value::Object(op.variables), json!({ "a": { "b": { "c": null } } }));
    }

    #[test]
    fn test_upload_mime_type() {
        assert_eq!(Upload::new("solar.csv", vec![]).mime_type(), "text/csv");
        assert_eq!(
            Upload::new("blob", vec![]).mime_type(),
            "application/octet-stream"
        );
        assert_eq!(
            Upload::new("solar.csv", vec![]).with_content_type("text/plain").mime_type(),
            "text/plain"
        );
    }

    #[test]
    fn test_operations_default_to_authenticated() {
        assert_eq!(Operation::new("Op", "q").access, Access::Authenticated);
        assert_eq!(Operation::new("Op", "q").public().access, Access::Public);
    }
}
