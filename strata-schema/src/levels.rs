use crate::{ColumnPath, LeafType, Repetition};

/// Maximum definition and repetition levels of a schema node.
///
/// The definition level counts the optional or repeated columns from the root down to and
/// including the node; the repetition level counts only the repeated ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Levels {
    /// Maximum definition level
    pub def: u16,
    /// Maximum repetition level
    pub rep: u16,
}

impl Levels {
    /// Levels of the schema root.
    pub const ROOT: Levels = Levels { def: 0, rep: 0 };

    /// Levels of a child column with the given repetition.
    pub fn child(self, repetition: Repetition) -> Levels {
        match repetition {
            Repetition::Required => self,
            Repetition::Optional => Levels {
                def: self.def + 1,
                rep: self.rep,
            },
            Repetition::Repeated => Levels {
                def: self.def + 1,
                rep: self.rep + 1,
            },
        }
    }
}

/// A leaf column as seen by the shredder, the assembler and the file format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeafDescriptor {
    index: usize,
    path: ColumnPath,
    leaf_type: LeafType,
    repetition: Repetition,
    levels: Levels,
}

impl LeafDescriptor {
    pub(crate) fn new(
        index: usize,
        path: ColumnPath,
        leaf_type: LeafType,
        repetition: Repetition,
        levels: Levels,
    ) -> Self {
        Self {
            index,
            path,
            leaf_type,
            repetition,
            levels,
        }
    }

    /// Position of this leaf in depth-first order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Full dotted path of this leaf.
    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    /// Physical and logical type of the leaf.
    pub fn leaf_type(&self) -> &LeafType {
        &self.leaf_type
    }

    /// Repetition of the leaf itself.
    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    /// Maximum definition level; a value is present exactly when its level reaches this.
    pub fn max_def(&self) -> u16 {
        self.levels.def
    }

    /// Maximum repetition level.
    pub fn max_rep(&self) -> u16 {
        self.levels.rep
    }

    /// Both maxima.
    pub fn levels(&self) -> Levels {
        self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_compose_through_nesting() {
        let levels = Levels::ROOT
            .child(Repetition::Optional)
            .child(Repetition::Repeated)
            .child(Repetition::Required);
        assert_eq!(levels, Levels { def: 2, rep: 1 });
    }
}
