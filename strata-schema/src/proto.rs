//! Conversion between [`Schema`] and the depth-first list of footer schema elements.

use strata_error::{StrataResult, strata_bail, strata_err};
use strata_proto::footer as pb;

use crate::{
    Column, ColumnKind, DecimalType, GroupShape, LeafType, LogicalKind, LogicalType, PhysicalType,
    Repetition, Schema, TimeUnit,
};

/// Name of the synthetic root element.
const ROOT_NAME: &str = "schema";

impl Schema {
    /// Flatten the schema, root element first.
    pub fn to_proto(&self) -> Vec<pb::SchemaElement> {
        let mut elements = vec![pb::SchemaElement {
            name: ROOT_NAME.to_string(),
            repetition: u8::from(Repetition::Required).into(),
            group_shape: Some(u8::from(GroupShape::Struct).into()),
            num_children: count(self.columns().len()),
            ..Default::default()
        }];
        for column in self.columns() {
            flatten(column, &mut elements);
        }
        elements
    }

    /// Rebuild a schema from footer elements written by [`Schema::to_proto`].
    pub fn from_proto(elements: &[pb::SchemaElement]) -> StrataResult<Self> {
        let (root, rest) = elements
            .split_first()
            .ok_or_else(|| strata_err!(Corrupted: "Footer schema is empty"))?;
        let mut remaining = rest;
        let mut columns = Vec::new();
        for _ in 0..root.num_children {
            columns.push(unflatten(&mut remaining)?);
        }
        if !remaining.is_empty() {
            strata_bail!(
                Corrupted: "Footer schema has {} trailing elements",
                remaining.len()
            );
        }
        Schema::try_new(columns).map_err(|err| err.with_context("Invalid footer schema"))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn count(len: usize) -> u32 {
    len as u32
}

fn flatten(column: &Column, elements: &mut Vec<pb::SchemaElement>) {
    let repetition = u8::from(column.repetition()).into();
    match column.kind() {
        ColumnKind::Leaf(leaf) => elements.push(pb::SchemaElement {
            name: column.name().to_string(),
            repetition,
            physical_type: Some(u8::from(leaf.physical()).into()),
            type_length: leaf.type_length(),
            logical_type: leaf.logical().map(logical_to_proto),
            group_shape: None,
            num_children: 0,
        }),
        ColumnKind::Group { shape, children } => {
            elements.push(pb::SchemaElement {
                name: column.name().to_string(),
                repetition,
                physical_type: None,
                type_length: None,
                logical_type: None,
                group_shape: Some(u8::from(*shape).into()),
                num_children: count(children.len()),
            });
            for child in children {
                flatten(child, elements);
            }
        }
    }
}

fn unflatten(elements: &mut &[pb::SchemaElement]) -> StrataResult<Column> {
    let (element, rest) = elements
        .split_first()
        .ok_or_else(|| strata_err!(Corrupted: "Footer schema ends before all children were read"))?;
    *elements = rest;

    let repetition = Repetition::try_from(id(element.repetition)?).map_err(|_| {
        strata_err!(
            Corrupted: "Unknown repetition {} for column \"{}\"",
            element.repetition,
            element.name
        )
    })?;

    let column = match (element.physical_type, element.group_shape) {
        (Some(physical), None) => {
            let physical = PhysicalType::try_from(id(physical)?).map_err(|_| {
                strata_err!(
                    Corrupted: "Unknown physical type {} for column \"{}\"",
                    physical,
                    element.name
                )
            })?;
            let logical = element
                .logical_type
                .as_ref()
                .map(logical_from_proto)
                .transpose()?;
            let leaf = LeafType::try_new(physical, element.type_length, logical)?;
            Column::leaf(element.name.clone(), leaf)
        }
        (None, Some(shape)) => {
            let shape = GroupShape::try_from(id(shape)?).map_err(|_| {
                strata_err!(
                    Corrupted: "Unknown group shape {} for column \"{}\"",
                    shape,
                    element.name
                )
            })?;
            let mut children = Vec::new();
            for _ in 0..element.num_children {
                children.push(unflatten(elements)?);
            }
            Column::group(element.name.clone(), shape, children)
        }
        _ => strata_bail!(
            Corrupted: "Column \"{}\" must be either a leaf or a group",
            element.name
        ),
    };
    Ok(column.with_repetition(repetition))
}

fn id(value: u32) -> StrataResult<u8> {
    u8::try_from(value).map_err(|_| strata_err!(Corrupted: "Type id {} is out of range", value))
}

fn logical_to_proto(logical: LogicalType) -> pb::LogicalType {
    let mut proto = pb::LogicalType {
        kind: u8::from(logical.kind()).into(),
        ..Default::default()
    };
    match logical {
        LogicalType::Time(unit) => proto.time_unit = Some(u8::from(unit).into()),
        LogicalType::Timestamp {
            unit,
            adjusted_to_utc,
        } => {
            proto.time_unit = Some(u8::from(unit).into());
            proto.is_adjusted_to_utc = adjusted_to_utc;
        }
        LogicalType::Decimal(decimal) => {
            proto.precision = Some(decimal.precision().into());
            proto.scale = Some(decimal.scale().into());
        }
        LogicalType::String
        | LogicalType::Json
        | LogicalType::Uuid
        | LogicalType::Enum
        | LogicalType::Date => {}
    }
    proto
}

fn logical_from_proto(proto: &pb::LogicalType) -> StrataResult<LogicalType> {
    let kind = LogicalKind::try_from(id(proto.kind)?)
        .map_err(|_| strata_err!(Corrupted: "Unknown logical type {}", proto.kind))?;
    let unit = || -> StrataResult<TimeUnit> {
        let unit = proto
            .time_unit
            .ok_or_else(|| strata_err!(Corrupted: "Logical type {:?} is missing its unit", kind))?;
        TimeUnit::try_from(id(unit)?)
            .map_err(|_| strata_err!(Corrupted: "Unknown time unit {}", unit))
    };
    Ok(match kind {
        LogicalKind::String => LogicalType::String,
        LogicalKind::Json => LogicalType::Json,
        LogicalKind::Uuid => LogicalType::Uuid,
        LogicalKind::Enum => LogicalType::Enum,
        LogicalKind::Date => LogicalType::Date,
        LogicalKind::Time => LogicalType::Time(unit()?),
        LogicalKind::Timestamp => LogicalType::Timestamp {
            unit: unit()?,
            adjusted_to_utc: proto.is_adjusted_to_utc,
        },
        LogicalKind::Decimal => {
            let (Some(precision), Some(scale)) = (proto.precision, proto.scale) else {
                strata_bail!(Corrupted: "Decimal logical type is missing precision or scale");
            };
            LogicalType::Decimal(DecimalType::try_new(id(precision)?, id(scale)?)?)
        }
    })
}
