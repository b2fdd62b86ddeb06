use serde::{Deserialize, Serialize};

/// One node of a multi-task graph handed to the DAG executor (§4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagTask {
    pub name: String,
    pub command: String,
    pub depends_on: Vec<String>,
}

impl DagTask {
    pub fn new(name: impl Into<String>, command: impl Into<String>, depends_on: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            depends_on,
        }
    }
}
