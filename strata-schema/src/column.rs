use itertools::Itertools;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strata_error::{StrataResult, strata_bail};

use crate::{DecimalType, LogicalType, PhysicalType, Repetition, TimeUnit};

/// Name of the repeated group inside a list column.
pub const LIST_GROUP_NAME: &str = "list";
/// Name of the element column inside a list's repeated group.
pub const LIST_ELEMENT_NAME: &str = "element";
/// Name of the repeated group inside a map column.
pub const MAP_GROUP_NAME: &str = "key_value";
/// Name of the key column inside a map's repeated group.
pub const MAP_KEY_NAME: &str = "key";
/// Name of the value column inside a map's repeated group.
pub const MAP_VALUE_NAME: &str = "value";

/// The type of a leaf column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafType {
    physical: PhysicalType,
    type_length: Option<u32>,
    logical: Option<LogicalType>,
}

impl LeafType {
    /// A leaf type without a logical annotation.
    pub fn new(physical: PhysicalType) -> Self {
        Self {
            physical,
            type_length: None,
            logical: None,
        }
    }

    /// A fixed-length byte array of `length` bytes.
    pub fn fixed_len(length: u32) -> Self {
        Self {
            physical: PhysicalType::FixedLenByteArray,
            type_length: Some(length),
            logical: None,
        }
    }

    /// Checked constructor used when reading types back from a footer.
    pub fn try_new(
        physical: PhysicalType,
        type_length: Option<u32>,
        logical: Option<LogicalType>,
    ) -> StrataResult<Self> {
        match (physical, type_length) {
            (PhysicalType::FixedLenByteArray, None | Some(0)) => {
                strata_bail!("fixed_len_byte_array requires a positive type length")
            }
            (PhysicalType::FixedLenByteArray, Some(_)) | (_, None) => {}
            (_, Some(_)) => strata_bail!("{} does not take a type length", physical),
        }
        if let Some(logical) = logical {
            if !logical.annotates(physical) {
                strata_bail!("{} cannot annotate {}", logical, physical);
            }
            if let LogicalType::Decimal(decimal) = logical {
                if type_length != Some(decimal.byte_width()) {
                    strata_bail!(
                        "{} requires {} bytes, got {:?}",
                        logical,
                        decimal.byte_width(),
                        type_length
                    );
                }
            }
        }
        Ok(Self {
            physical,
            type_length,
            logical,
        })
    }

    /// Annotate this type with a logical type.
    pub fn with_logical(mut self, logical: LogicalType) -> Self {
        self.logical = Some(logical);
        self
    }

    /// The storage type.
    pub fn physical(&self) -> PhysicalType {
        self.physical
    }

    /// Byte width of fixed-length byte arrays.
    pub fn type_length(&self) -> Option<u32> {
        self.type_length
    }

    /// The logical annotation, if any.
    pub fn logical(&self) -> Option<LogicalType> {
        self.logical
    }

    /// Whether values are UTF-8 text rather than raw bytes.
    pub fn is_utf8(&self) -> bool {
        self.logical.is_some_and(|l| l.is_utf8())
    }

    /// Whether values are decimals.
    pub fn is_decimal(&self) -> bool {
        matches!(self.logical, Some(LogicalType::Decimal(_)))
    }

    /// Name of the value type stored in this leaf, in the vocabulary of error messages.
    pub fn value_type_name(&self) -> &'static str {
        match self.physical {
            PhysicalType::Boolean => "boolean",
            PhysicalType::Int32 => "integer",
            PhysicalType::Int64 => "long",
            PhysicalType::Float => "float",
            PhysicalType::Double => "double",
            PhysicalType::ByteArray if self.is_utf8() => "string",
            PhysicalType::FixedLenByteArray if self.is_decimal() => "decimal",
            PhysicalType::ByteArray | PhysicalType::FixedLenByteArray => "bytes",
        }
    }
}

/// The logical shape of a group column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum GroupShape {
    /// Ordered named children
    Struct = 0,
    /// A single repeated `list` group holding an `element` column
    List = 1,
    /// A single repeated `key_value` group holding a required `key` and a `value` column
    Map = 2,
}

/// Whether a column is a leaf or a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// A primitive column.
    Leaf(LeafType),
    /// A nested column.
    Group {
        /// Logical shape of the group
        shape: GroupShape,
        /// Ordered child columns
        children: Vec<Column>,
    },
}

/// A node of the schema tree.
///
/// Columns built through the constructors below are optional; use [`Column::required`] or
/// [`Column::repeated`] to change that.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    name: String,
    repetition: Repetition,
    kind: ColumnKind,
}

impl Column {
    /// An optional leaf column.
    pub fn leaf<S: Into<String>>(name: S, leaf_type: LeafType) -> Self {
        Self {
            name: name.into(),
            repetition: Repetition::Optional,
            kind: ColumnKind::Leaf(leaf_type),
        }
    }

    /// An optional group column.
    pub fn group<S: Into<String>, I: IntoIterator<Item = Column>>(
        name: S,
        shape: GroupShape,
        children: I,
    ) -> Self {
        Self {
            name: name.into(),
            repetition: Repetition::Optional,
            kind: ColumnKind::Group {
                shape,
                children: children.into_iter().collect(),
            },
        }
    }

    /// A boolean column.
    pub fn boolean<S: Into<String>>(name: S) -> Self {
        Self::leaf(name, LeafType::new(PhysicalType::Boolean))
    }

    /// A 32-bit integer column.
    pub fn int32<S: Into<String>>(name: S) -> Self {
        Self::leaf(name, LeafType::new(PhysicalType::Int32))
    }

    /// A 64-bit integer column.
    pub fn int64<S: Into<String>>(name: S) -> Self {
        Self::leaf(name, LeafType::new(PhysicalType::Int64))
    }

    /// A single precision float column.
    pub fn float<S: Into<String>>(name: S) -> Self {
        Self::leaf(name, LeafType::new(PhysicalType::Float))
    }

    /// A double precision float column.
    pub fn double<S: Into<String>>(name: S) -> Self {
        Self::leaf(name, LeafType::new(PhysicalType::Double))
    }

    /// A raw byte string column.
    pub fn bytes<S: Into<String>>(name: S) -> Self {
        Self::leaf(name, LeafType::new(PhysicalType::ByteArray))
    }

    /// A column of byte strings that are all exactly `length` bytes long.
    pub fn fixed_len_bytes<S: Into<String>>(name: S, length: u32) -> Self {
        Self::leaf(name, LeafType::fixed_len(length))
    }

    /// A UTF-8 text column.
    pub fn string<S: Into<String>>(name: S) -> Self {
        Self::leaf(
            name,
            LeafType::new(PhysicalType::ByteArray).with_logical(LogicalType::String),
        )
    }

    /// A JSON document column.
    pub fn json<S: Into<String>>(name: S) -> Self {
        Self::leaf(
            name,
            LeafType::new(PhysicalType::ByteArray).with_logical(LogicalType::Json),
        )
    }

    /// A textual UUID column.
    pub fn uuid<S: Into<String>>(name: S) -> Self {
        Self::leaf(
            name,
            LeafType::new(PhysicalType::ByteArray).with_logical(LogicalType::Uuid),
        )
    }

    /// An enumeration label column.
    pub fn enum_<S: Into<String>>(name: S) -> Self {
        Self::leaf(
            name,
            LeafType::new(PhysicalType::ByteArray).with_logical(LogicalType::Enum),
        )
    }

    /// A date column holding days since the unix epoch.
    pub fn date<S: Into<String>>(name: S) -> Self {
        Self::leaf(
            name,
            LeafType::new(PhysicalType::Int32).with_logical(LogicalType::Date),
        )
    }

    /// A time of day column.
    pub fn time<S: Into<String>>(name: S, unit: TimeUnit) -> Self {
        let physical = match unit {
            TimeUnit::Millis => PhysicalType::Int32,
            TimeUnit::Micros | TimeUnit::Nanos => PhysicalType::Int64,
        };
        Self::leaf(
            name,
            LeafType::new(physical).with_logical(LogicalType::Time(unit)),
        )
    }

    /// A UTC-normalized timestamp column.
    pub fn timestamp<S: Into<String>>(name: S, unit: TimeUnit) -> Self {
        Self::leaf(
            name,
            LeafType::new(PhysicalType::Int64).with_logical(LogicalType::Timestamp {
                unit,
                adjusted_to_utc: true,
            }),
        )
    }

    /// A decimal column with the given precision and scale.
    pub fn decimal<S: Into<String>>(name: S, precision: u8, scale: u8) -> StrataResult<Self> {
        let decimal = DecimalType::try_new(precision, scale)?;
        Ok(Self::leaf(
            name,
            LeafType::fixed_len(decimal.byte_width()).with_logical(LogicalType::Decimal(decimal)),
        ))
    }

    /// A struct column with the given children.
    pub fn struct_<S: Into<String>, I: IntoIterator<Item = Column>>(name: S, children: I) -> Self {
        Self::group(name, GroupShape::Struct, children)
    }

    /// A list column; `element` is renamed to `element` and keeps its repetition.
    pub fn list<S: Into<String>>(name: S, element: Column) -> Self {
        let element = element.with_name(LIST_ELEMENT_NAME);
        let list = Self::struct_(LIST_GROUP_NAME, [element]).repeated();
        Self::group(name, GroupShape::List, [list])
    }

    /// A map column; keys are always required.
    pub fn map<S: Into<String>>(name: S, key: Column, value: Column) -> Self {
        let key = key.with_name(MAP_KEY_NAME).required();
        let value = value.with_name(MAP_VALUE_NAME);
        let key_value = Self::struct_(MAP_GROUP_NAME, [key, value]).repeated();
        Self::group(name, GroupShape::Map, [key_value])
    }

    /// Mark this column as required.
    pub fn required(mut self) -> Self {
        self.repetition = Repetition::Required;
        self
    }

    /// Mark this column as optional.
    pub fn optional(mut self) -> Self {
        self.repetition = Repetition::Optional;
        self
    }

    /// Mark this column as repeated.
    pub fn repeated(mut self) -> Self {
        self.repetition = Repetition::Repeated;
        self
    }

    /// Set the repetition of this column.
    pub fn with_repetition(mut self, repetition: Repetition) -> Self {
        self.repetition = repetition;
        self
    }

    /// Rename this column.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column repetition.
    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    /// Whether this column is a leaf or a group.
    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// The leaf type, if this is a leaf.
    pub fn leaf_type(&self) -> Option<&LeafType> {
        match &self.kind {
            ColumnKind::Leaf(leaf_type) => Some(leaf_type),
            ColumnKind::Group { .. } => None,
        }
    }

    /// The group shape, if this is a group.
    pub fn shape(&self) -> Option<GroupShape> {
        match &self.kind {
            ColumnKind::Leaf(_) => None,
            ColumnKind::Group { shape, .. } => Some(*shape),
        }
    }

    /// Whether this column is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ColumnKind::Leaf(_))
    }

    /// Child columns; empty for leaves.
    pub fn children(&self) -> &[Column] {
        match &self.kind {
            ColumnKind::Leaf(_) => &[],
            ColumnKind::Group { children, .. } => children,
        }
    }

    /// A direct child by name.
    pub fn child(&self, name: &str) -> Option<&Column> {
        self.children().iter().find(|c| c.name == name)
    }

    /// The number of leaf columns in this subtree.
    pub fn num_leaves(&self) -> usize {
        match &self.kind {
            ColumnKind::Leaf(_) => 1,
            ColumnKind::Group { children, .. } => children.iter().map(Column::num_leaves).sum(),
        }
    }

    /// The repeated group of a list or map column.
    pub fn repeated_group(&self) -> Option<&Column> {
        match self.shape() {
            Some(GroupShape::List | GroupShape::Map) => self.children().first(),
            _ => None,
        }
    }

    /// The element column of a list column.
    pub fn list_element(&self) -> Option<&Column> {
        match self.shape() {
            Some(GroupShape::List) => self.repeated_group()?.children().first(),
            _ => None,
        }
    }

    /// The key and value columns of a map column.
    pub fn map_entry(&self) -> Option<(&Column, &Column)> {
        match self.shape() {
            Some(GroupShape::Map) => match self.repeated_group()?.children() {
                [key, value] => Some((key, value)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Checks the structural rules of this subtree.
    pub(crate) fn validate(&self) -> StrataResult<()> {
        if self.name.is_empty() {
            strata_bail!("Column names cannot be empty");
        }
        if self.name.contains('.') {
            strata_bail!("Column name \"{}\" cannot contain '.'", self.name);
        }
        let (shape, children) = match &self.kind {
            ColumnKind::Leaf(leaf) => {
                return LeafType::try_new(leaf.physical, leaf.type_length, leaf.logical)
                    .map(|_| ())
                    .map_err(|err| err.with_context(format!("Column \"{}\"", self.name)));
            }
            ColumnKind::Group { shape, children } => (shape, children),
        };
        if children.is_empty() {
            strata_bail!("Group \"{}\" must have at least one child", self.name);
        }
        if let Some(duplicate) = children.iter().map(|c| c.name.as_str()).duplicates().next() {
            strata_bail!("Group \"{}\" has duplicate child \"{}\"", self.name, duplicate);
        }
        match shape {
            GroupShape::Struct => {}
            GroupShape::List => {
                let Some(element) = self.list_element() else {
                    strata_bail!("List \"{}\" must have a single \"list\" group", self.name);
                };
                let group = &children[0];
                if children.len() != 1
                    || group.name != LIST_GROUP_NAME
                    || !group.repetition.is_repeated()
                    || group.shape() != Some(GroupShape::Struct)
                    || group.children().len() != 1
                    || element.name != LIST_ELEMENT_NAME
                {
                    strata_bail!(
                        "List \"{}\" must contain exactly one repeated group \"list\" with a single \"element\" column",
                        self.name
                    );
                }
            }
            GroupShape::Map => {
                let Some((key, value)) = self.map_entry() else {
                    strata_bail!(
                        "Map \"{}\" must have a single \"key_value\" group with a key and a value",
                        self.name
                    );
                };
                let group = &children[0];
                if children.len() != 1
                    || group.name != MAP_GROUP_NAME
                    || !group.repetition.is_repeated()
                    || group.shape() != Some(GroupShape::Struct)
                    || key.name != MAP_KEY_NAME
                    || !key.repetition.is_required()
                    || value.name != MAP_VALUE_NAME
                {
                    strata_bail!(
                        "Map \"{}\" must contain exactly one repeated group \"key_value\" with a required \"key\" and a \"value\"",
                        self.name
                    );
                }
            }
        }
        for child in children {
            child.validate()?;
        }
        Ok(())
    }
}
