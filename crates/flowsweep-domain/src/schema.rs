//! Schema/dependency model and deletion ordering
//!
//! Tables are kept in an arena keyed by name; foreign-key edges are stored as
//! sets of names on both ends. A valid deletion order lists every dependent
//! before the tables it references, so deletes never violate a constraint.

use crate::SchemaError;
use std::collections::{BTreeMap, BTreeSet};

/// Column used for age comparisons in the built-in Prefect model
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "created";

/// Check that `s` is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`)
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Description of one table taking part in cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    timestamp_column: String,
    parents: BTreeSet<String>,
    dependents: BTreeSet<String>,
}

impl TableDescriptor {
    /// Create a descriptor with no foreign-key edges
    pub fn new(name: impl Into<String>, timestamp_column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp_column: timestamp_column.into(),
            parents: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }

    /// Declare that this table references `parent` by foreign key
    pub fn references(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(parent.into());
        self
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column compared against the cutoff
    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Tables this table references
    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.parents.iter().map(String::as_str)
    }

    /// Tables that reference this table (filled in by [`SchemaModel`])
    pub fn dependents(&self) -> impl Iterator<Item = &str> {
        self.dependents.iter().map(String::as_str)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for ident in [&self.name, &self.timestamp_column].into_iter().chain(&self.parents) {
            if !is_identifier(ident) {
                return Err(SchemaError::InvalidIdentifier(ident.clone()));
            }
        }
        Ok(())
    }
}

/// The set of tables known to the cleanup engine
///
/// # Examples
///
/// ```
/// use flowsweep_domain::{SchemaModel, TableDescriptor};
///
/// let model = SchemaModel::new([
///     TableDescriptor::new("flow_run", "created"),
///     TableDescriptor::new("task_run", "created").references("flow_run"),
/// ]).unwrap();
///
/// let order: Vec<&str> = model.deletion_order().unwrap()
///     .into_iter()
///     .map(|t| t.name())
///     .collect();
/// assert_eq!(order, ["task_run", "flow_run"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModel {
    tables: BTreeMap<String, TableDescriptor>,
}

impl SchemaModel {
    /// Build a model, rejecting bad identifiers, duplicates and references to
    /// tables that are not part of the model
    ///
    /// Cycles are accepted here and reported by [`SchemaModel::deletion_order`].
    pub fn new(descriptors: impl IntoIterator<Item = TableDescriptor>) -> Result<Self, SchemaError> {
        let mut tables = BTreeMap::new();
        for descriptor in descriptors {
            descriptor.validate()?;
            if tables.contains_key(&descriptor.name) {
                return Err(SchemaError::DuplicateTable(descriptor.name));
            }
            tables.insert(descriptor.name.clone(), descriptor);
        }

        for descriptor in tables.values() {
            if let Some(parent) = descriptor.parents.iter().find(|p| !tables.contains_key(*p)) {
                return Err(SchemaError::UnknownTable {
                    table: descriptor.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        Ok(Self::link(tables))
    }

    /// Default Prefect metadata tables
    ///
    /// | Table | References |
    /// |-------|------------|
    /// | `flow_run` | |
    /// | `flow_run_state` | `flow_run` |
    /// | `task_run` | `flow_run` |
    /// | `task_run_state` | `task_run` |
    /// | `log` | `flow_run`, `task_run` |
    /// | `artifact` | `flow_run`, `task_run` |
    /// | `events` | |
    /// | `event_resources` | `events` |
    pub fn prefect() -> Self {
        let tables = prefect_tables()
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        Self::link(tables)
    }

    /// Fill in dependents from the declared parents
    fn link(mut tables: BTreeMap<String, TableDescriptor>) -> Self {
        let edges: Vec<(String, String)> = tables
            .values()
            .flat_map(|t| t.parents.iter().map(move |p| (p.clone(), t.name.clone())))
            .collect();
        for (parent, dependent) in edges {
            if let Some(descriptor) = tables.get_mut(&parent) {
                descriptor.dependents.insert(dependent);
            }
        }
        Self { tables }
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    /// All tables, sorted by name
    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.values()
    }

    /// Number of tables in the model
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True if the model has no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Order in which tables must be purged
    ///
    /// Every dependent comes before each table it references. Tables with no
    /// constraint between them are ordered by name, so the result is the same
    /// on every call. A table referencing itself does not constrain the order;
    /// a single `DELETE` handles self-references.
    ///
    /// # Errors
    ///
    /// [`SchemaError::CyclicDependency`] when no valid order exists.
    pub fn deletion_order(&self) -> Result<Vec<&TableDescriptor>, SchemaError> {
        // Number of dependents still waiting to be deleted, per table
        let mut pending: BTreeMap<&str, usize> = self
            .tables
            .values()
            .map(|t| {
                let count = t.dependents.iter().filter(|d| **d != t.name).count();
                (t.name.as_str(), count)
            })
            .collect();

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.tables.len());
        while let Some(name) = ready.pop_first() {
            let descriptor = &self.tables[name];
            order.push(descriptor);
            for parent in descriptor.parents.iter().filter(|p| **p != descriptor.name) {
                if let Some(count) = pending.get_mut(parent.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(parent.as_str());
                    }
                }
            }
        }

        if order.len() < self.tables.len() {
            let tables = pending
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(SchemaError::CyclicDependency { tables });
        }

        Ok(order)
    }
}

fn prefect_tables() -> Vec<TableDescriptor> {
    let ts = DEFAULT_TIMESTAMP_COLUMN;
    vec![
        TableDescriptor::new("flow_run", ts),
        TableDescriptor::new("flow_run_state", ts).references("flow_run"),
        TableDescriptor::new("task_run", ts).references("flow_run"),
        TableDescriptor::new("task_run_state", ts).references("task_run"),
        TableDescriptor::new("log", ts).references("flow_run").references("task_run"),
        TableDescriptor::new("artifact", ts).references("flow_run").references("task_run"),
        TableDescriptor::new("events", ts),
        TableDescriptor::new("event_resources", ts).references("events"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(order: &[&TableDescriptor]) -> Vec<String> {
        order.iter().map(|t| t.name().to_string()).collect()
    }

    fn position(order: &[&TableDescriptor], name: &str) -> usize {
        order.iter().position(|t| t.name() == name).unwrap()
    }

    #[test]
    fn test_prefect_model_is_valid() {
        let validated = SchemaModel::new(prefect_tables()).unwrap();
        assert_eq!(validated, SchemaModel::prefect());
        assert_eq!(validated.len(), 8);
    }

    #[test]
    fn test_prefect_deletion_order() {
        let model = SchemaModel::prefect();
        let order = model.deletion_order().unwrap();

        assert_eq!(
            names(&order),
            [
                "artifact",
                "event_resources",
                "events",
                "flow_run_state",
                "log",
                "task_run_state",
                "task_run",
                "flow_run",
            ]
        );
        assert!(position(&order, "log") < position(&order, "task_run"));
        assert!(position(&order, "task_run") < position(&order, "flow_run"));
    }

    #[test]
    fn test_dependents_are_linked() {
        let model = SchemaModel::prefect();
        let flow_run = model.table("flow_run").unwrap();
        let dependents: Vec<&str> = flow_run.dependents().collect();
        assert_eq!(dependents, ["artifact", "flow_run_state", "log", "task_run"]);
        assert_eq!(flow_run.parents().count(), 0);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let model = SchemaModel::new([
            TableDescriptor::new("a", "created").references("b"),
            TableDescriptor::new("b", "created").references("c"),
            TableDescriptor::new("c", "created").references("a"),
            TableDescriptor::new("leaf", "created"),
        ])
        .unwrap();

        match model.deletion_order() {
            Err(SchemaError::CyclicDependency { tables }) => {
                assert_eq!(tables, ["a", "b", "c"]);
            }
            other => panic!("Expected cyclic dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_does_not_block_order() {
        let model = SchemaModel::new([
            TableDescriptor::new("task_run", "created").references("task_run"),
        ])
        .unwrap();
        assert_eq!(names(&model.deletion_order().unwrap()), ["task_run"]);
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let result = SchemaModel::new([TableDescriptor::new("log", "created").references("flow_run")]);
        assert_eq!(
            result,
            Err(SchemaError::UnknownTable {
                table: "log".to_string(),
                parent: "flow_run".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_table_is_rejected() {
        let result = SchemaModel::new([
            TableDescriptor::new("log", "created"),
            TableDescriptor::new("log", "updated"),
        ]);
        assert_eq!(result, Err(SchemaError::DuplicateTable("log".to_string())));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_identifier("flow_run"));
        assert!(is_identifier("_tmp2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("log; DROP TABLE flow_run"));
        assert!(!is_identifier("\"quoted\""));

        let result = SchemaModel::new([TableDescriptor::new("log", "created at")]);
        assert_eq!(result, Err(SchemaError::InvalidIdentifier("created at".to_string())));
    }

    #[test]
    fn test_empty_model() {
        let model = SchemaModel::new(Vec::new()).unwrap();
        assert!(model.is_empty());
        assert!(model.deletion_order().unwrap().is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Random DAG: table `i` may reference any table `j < i`, names are
    /// shuffled by a random key so name order is unrelated to edge direction.
    fn arb_dag() -> impl Strategy<Value = Vec<TableDescriptor>> {
        (1usize..12)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec(0u16..1000, n),
                    prop::collection::vec(any::<bool>(), n * n),
                )
            })
            .prop_map(|(keys, edges)| {
                let n = keys.len();
                let names: Vec<String> = keys
                    .iter()
                    .enumerate()
                    .map(|(i, key)| format!("t{:03}_{}", key, i))
                    .collect();
                (0..n)
                    .map(|i| {
                        (0..i)
                            .filter(|j| edges[i * n + j])
                            .fold(TableDescriptor::new(names[i].clone(), "created"), |t, j| {
                                t.references(names[j].clone())
                            })
                    })
                    .collect()
            })
    }

    proptest! {
        /// Property: every dependent is deleted before each of its parents
        #[test]
        fn test_dependents_precede_parents(tables in arb_dag()) {
            let model = SchemaModel::new(tables).unwrap();
            let order = model.deletion_order().unwrap();
            prop_assert_eq!(order.len(), model.len());

            let position = |name: &str| order.iter().position(|t| t.name() == name).unwrap();
            for table in model.tables() {
                for parent in table.parents() {
                    prop_assert!(position(table.name()) < position(parent));
                }
            }
        }

        /// Property: ordering the same model twice yields the same sequence
        #[test]
        fn test_order_is_deterministic(tables in arb_dag()) {
            let first = SchemaModel::new(tables.clone()).unwrap();
            let second = SchemaModel::new(tables.into_iter().rev()).unwrap();

            let a: Vec<&str> = first.deletion_order().unwrap().iter().map(|t| t.name()).collect();
            let b: Vec<&str> = first.deletion_order().unwrap().iter().map(|t| t.name()).collect();
            let c: Vec<&str> = second.deletion_order().unwrap().iter().map(|t| t.name()).collect();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(&a, &c);
        }
    }
}
