#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};

/// Fetch payload for a small `products` table with one invalid row.
pub fn products_payload() -> Value {
    json!({
        "status": "success",
        "table_name": "products",
        "data": [
            {"id": "integer", "name": "string", "price": "float", "active": "boolean"},
            {"id": 1, "name": "Pen", "price": "1.50", "active": "true"},
            {"id": "x", "name": "Cup", "price": 2, "active": false},
            {"id": 3, "name": "Ink", "price": null, "active": "FALSE"}
        ],
        "total_count": 3,
        "limit": 100,
        "offset": 0
    })
}

/// Fetch payload whose `data` carries plain rows and no schema element.
pub fn schemaless_payload() -> Value {
    json!({
        "table_name": "employees",
        "data": [
            {"id": 1, "name": "Ada", "hired": "2021-03-01", "remote": true},
            {"id": 2, "name": "Grace", "hired": "2019-11-15", "remote": "false"},
            {"id": null, "name": "Linus", "hired": null, "remote": null}
        ]
    })
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        self.write(name, &serde_json::to_string_pretty(value).expect("json"))
    }

    pub fn read_json(&self, name: &str) -> Value {
        let contents = std::fs::read_to_string(self.path().join(name)).expect("read output");
        serde_json::from_str(&contents).expect("parse output json")
    }
}
