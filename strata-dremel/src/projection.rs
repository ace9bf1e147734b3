use strata_error::{StrataResult, strata_bail};
use strata_schema::{ColumnPath, GroupShape, Schema};

/// The set of leaf columns to materialize, by leaf index in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    leaves: Vec<usize>,
}

impl Projection {
    /// Every leaf of the schema.
    pub fn all(schema: &Schema) -> Self {
        Self {
            leaves: (0..schema.leaves().len()).collect(),
        }
    }

    /// The leaves under the named columns.
    ///
    /// Names are top-level columns or dotted paths to nested ones. Selecting anything inside a
    /// map selects the whole map, since entries cannot be rebuilt without their keys.
    pub fn try_new<S: AsRef<str>>(schema: &Schema, columns: &[S]) -> StrataResult<Self> {
        if columns.is_empty() {
            return Ok(Self::all(schema));
        }
        let mut selected = vec![false; schema.leaves().len()];
        for name in columns {
            let name = name.as_ref();
            let Some(prefix) = resolve(schema, name) else {
                strata_bail!("Column \"{}\" does not exist", name);
            };
            for leaf in schema.leaves_under(&prefix) {
                selected[leaf.index()] = true;
            }
        }
        Ok(Self {
            leaves: selected
                .into_iter()
                .enumerate()
                .filter_map(|(idx, selected)| selected.then_some(idx))
                .collect(),
        })
    }

    /// Selected leaf indices, ascending.
    pub fn leaves(&self) -> &[usize] {
        &self.leaves
    }

    pub fn contains(&self, leaf: usize) -> bool {
        self.leaves.binary_search(&leaf).is_ok()
    }

    /// Whether any leaf in `first_leaf..first_leaf + num_leaves` is selected.
    pub fn contains_any(&self, first_leaf: usize, num_leaves: usize) -> bool {
        let start = self.leaves.partition_point(|&leaf| leaf < first_leaf);
        self.leaves
            .get(start)
            .is_some_and(|&leaf| leaf < first_leaf + num_leaves)
    }
}

/// The path to select for `name`, widened to the outermost enclosing map.
fn resolve(schema: &Schema, name: &str) -> Option<ColumnPath> {
    let path = ColumnPath::from(name);
    schema.get(&path)?;
    let mut resolved = ColumnPath::root();
    let mut children = schema.columns();
    for part in path.parts() {
        let column = children.iter().find(|c| c.name() == part.as_str())?;
        resolved.push(part.as_str());
        if column.shape() == Some(GroupShape::Map) {
            break;
        }
        children = column.children();
    }
    Some(resolved)
}
