// Dataset catalog - the tables a dashboard can be bound to
use serde::Serialize;
use serde_json::Value;

/// A row set with named columns, as returned by the warehouse
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetHandle {
    pub name: String,
    pub table: String,
    pub preview: TabularResult,
}

impl DatasetHandle {
    pub fn new(name: String, table: String, preview: TabularResult) -> Self {
        Self {
            name,
            table,
            preview,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.preview.columns
    }
}

/// Ordered mapping of dataset name to handle, fixed at startup
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    datasets: Vec<DatasetHandle>,
}

impl DatasetCatalog {
    pub fn new(datasets: Vec<DatasetHandle>) -> Self {
        Self { datasets }
    }

    /// The dataset a new dashboard starts on
    pub fn default_dataset(&self) -> Option<&DatasetHandle> {
        self.datasets.first()
    }

    pub fn get(&self, name: &str) -> Option<&DatasetHandle> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.datasets.iter().map(|d| d.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> DatasetHandle {
        DatasetHandle::new(
            name.to_string(),
            format!("bronze.{}", name),
            TabularResult::new(vec!["timestamp".into(), "NumSteps".into()], vec![]),
        )
    }

    #[test]
    fn test_first_dataset_is_default() {
        let catalog = DatasetCatalog::new(vec![handle("sensors"), handle("devices")]);
        assert_eq!(catalog.default_dataset().unwrap().name, "sensors");
        assert_eq!(catalog.names(), vec!["sensors", "devices"]);
        assert!(catalog.get("devices").is_some());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let table = handle("sensors").preview;
        assert_eq!(table.column_index("TIMESTAMP"), Some(0));
        assert_eq!(table.column_index("numsteps"), Some(1));
        assert_eq!(table.column_index("Miles"), None);
    }
}
