#![allow(clippy::cast_possible_truncation)]
use std::path::PathBuf;

use bytes::Bytes;
use prost::Message;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;
use strata_compress::CompressionCodec;
use strata_encoding::Encoding;
use strata_error::{StrataError, StrataResult};
use strata_proto::footer as pb;
use strata_scalar::{Row, Value, struct_value};
use strata_schema::{Column, Schema, TimeUnit};
use tempfile::TempDir;

use crate::{
    MAGIC_BYTES, Pagination, Reader, STRATA_FILE_EXTENSION, StrataFile, VERSION, WriteOptions,
    Writer,
};

#[test]
fn test_eof_values() {
    // a reminder to think about the version whenever the footer changes
    assert_eq!(VERSION, 1);
}

fn write_bytes(schema: &Schema, rows: &[Row], options: WriteOptions) -> Bytes {
    let mut writer = Writer::new(options)
        .open_with(Vec::new(), schema.clone())
        .unwrap();
    writer.write_batch(rows).unwrap();
    writer.close().unwrap();
    Bytes::from(writer.into_inner().unwrap())
}

fn open(bytes: Bytes) -> StrataFile<Bytes> {
    Reader::default().read_bytes(bytes).unwrap()
}

fn read_all(bytes: Bytes) -> Vec<Row> {
    collect(open(bytes).values().unwrap())
}

fn collect<I: Iterator<Item = StrataResult<Row>>>(rows: I) -> Vec<Row> {
    rows.collect::<StrataResult<Vec<_>>>().unwrap()
}

fn temp_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{name}.{STRATA_FILE_EXTENSION}"))
}

/// Decode the footer, let `edit` change it and write it back.
fn rewrite_footer(bytes: &Bytes, edit: impl FnOnce(&mut pb::FileMetadata)) -> Bytes {
    let len = bytes.len();
    let footer_len = u32::from_le_bytes(bytes[len - 8..len - 4].try_into().unwrap()) as usize;
    let footer_start = len - 8 - footer_len;
    let mut footer = pb::FileMetadata::decode(&bytes[footer_start..len - 8]).unwrap();
    edit(&mut footer);

    let encoded = footer.encode_to_vec();
    let mut out = bytes[..footer_start].to_vec();
    out.extend_from_slice(&encoded);
    out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
    out.extend_from_slice(&MAGIC_BYTES);
    out.into()
}

#[test]
fn test_required_int_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "ints");
    let schema = Schema::try_new([Column::int32("id").required()]).unwrap();
    let rows: Vec<Row> = (1..=100i32).map(|id| Row::new().with("id", id)).collect();

    let metadata = Writer::default().write(&path, schema.clone(), &rows).unwrap();
    assert_eq!(metadata.num_rows(), 100);

    let file = Reader::default().read(&path).unwrap();
    assert_eq!(file.schema().as_ref(), &schema);
    assert_eq!(file.schema().ddl(), schema.ddl());
    assert_eq!(collect(file.values().unwrap()), rows);
}

#[test]
fn test_random_nullable_lists_gzip() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "lists");
    let schema = Schema::try_new([Column::list("values", Column::int32("element"))]).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let rows: Vec<Row> = (0..1000)
        .map(|_| {
            let value = if rng.random_bool(0.5) {
                Value::Null
            } else {
                let len = rng.random_range(2..=10);
                Value::List((0..len).map(|_| Value::Int32(rng.random())).collect())
            };
            Row::new().with("values", value)
        })
        .collect();

    let options = WriteOptions::default().with_compression(CompressionCodec::Gzip);
    Writer::new(options).write(&path, schema, &rows).unwrap();

    let file = Reader::default().read(&path).unwrap();
    let chunk = &file.metadata().row_groups()[0].columns()[0];
    assert_eq!(chunk.codec().unwrap(), CompressionCodec::Gzip);
    assert_eq!(collect(file.values().unwrap()), rows);
}

#[test]
fn test_paginate_projected_column_across_row_groups() {
    let schema = Schema::try_new([Column::int32("id").required(), Column::string("name")]).unwrap();
    let rows: Vec<Row> = (1..=5000i32)
        .map(|id| Row::new().with("id", id).with("name", format!("name-{id}")))
        .collect();
    let bytes = write_bytes(
        &schema,
        &rows,
        WriteOptions::default().with_row_group_size_bytes(1024),
    );
    let file = open(bytes);
    assert!(file.metadata().row_groups().len() > 1);

    let page: Vec<Row> = collect(
        file.scan()
            .with_columns(["id"])
            .with_offset(4900)
            .with_limit(100)
            .into_rows()
            .unwrap(),
    );
    let expected: Vec<Row> = (4901..=5000i32).map(|id| Row::new().with("id", id)).collect();
    assert_eq!(page, expected);
}

fn deep_map_schema() -> Schema {
    Schema::try_new([
        Column::int32("id").required(),
        Column::map(
            "m",
            Column::string("key"),
            Column::struct_(
                "value",
                [
                    Column::string("name"),
                    Column::struct_(
                        "inner",
                        [
                            Column::int64("count"),
                            Column::struct_("deep", [Column::double("score")]),
                        ],
                    ),
                ],
            ),
        ),
    ])
    .unwrap()
}

fn entry(name: Value, inner: Value) -> Value {
    struct_value([("name", name), ("inner", inner)])
}

fn inner(count: Value, deep: Value) -> Value {
    struct_value([("count", count), ("deep", deep)])
}

fn deep_map_rows() -> Vec<Row> {
    let score = |s: f64| struct_value([("score", Value::Double(s))]);
    vec![
        Row::new().with("id", 0i32).with(
            "m",
            Value::Map(vec![
                (
                    Value::from("a"),
                    entry(Value::from("alpha"), inner(Value::Int64(1), score(0.5))),
                ),
                (Value::from("b"), entry(Value::Null, Value::Null)),
            ]),
        ),
        Row::new().with("id", 1i32).with("m", Value::Null),
        Row::new().with("id", 2i32).with("m", Value::Map(vec![])),
        Row::new().with("id", 3i32).with(
            "m",
            Value::Map(vec![
                (Value::from("c"), Value::Null),
                (
                    Value::from("d"),
                    entry(Value::from("delta"), inner(Value::Null, Value::Null)),
                ),
                (
                    Value::from("e"),
                    entry(
                        Value::from("epsilon"),
                        inner(
                            Value::Int64(5),
                            struct_value([("score", Value::Null)]),
                        ),
                    ),
                ),
            ]),
        ),
        Row::new().with("id", 4i32).with(
            "m",
            Value::Map(vec![(
                Value::from("a"),
                entry(Value::from("again"), inner(Value::Int64(-7), score(-1.25))),
            )]),
        ),
    ]
}

#[test]
fn test_map_of_struct_of_struct() {
    let schema = deep_map_schema();
    let rows = deep_map_rows();
    let bytes = write_bytes(&schema, &rows, WriteOptions::default());
    assert_eq!(read_all(bytes.clone()), rows);

    // selecting a member of the map reads the whole map
    let file = open(bytes);
    let projected = collect(
        file.scan()
            .with_columns(["m.key_value.value.inner.deep.score"])
            .into_rows()
            .unwrap(),
    );
    let expected: Vec<Row> = rows
        .iter()
        .map(|row| Row::new().with("m", row.get("m").cloned().unwrap_or_default()))
        .collect();
    assert_eq!(projected, expected);
}

#[test]
fn test_string_column_rejects_integers() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "mismatch");
    let schema = Schema::try_new([Column::string("string")]).unwrap();
    let rows = [Row::new().with("string", 1i32)];

    let err = Writer::default().write(&path, schema, &rows).unwrap_err();
    assert!(matches!(err, StrataError::MismatchedTypes(..)));
    assert_eq!(
        err.to_string(),
        "Column \"string\" is not string, got \"integer\" instead"
    );
    assert!(Reader::default().read(&path).is_err());
}

#[test]
fn test_required_violation_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "required");
    let schema = Schema::try_new([
        Column::int32("id").required(),
        Column::struct_("s", [Column::string("name").required()]),
    ])
    .unwrap();
    let rows = [
        Row::new().with("id", 1i32),
        Row::new()
            .with("id", 2i32)
            .with("s", struct_value([("name", Value::Null)])),
    ];

    let err = Writer::default().write(&path, schema, &rows).unwrap_err();
    assert!(matches!(err, StrataError::SchemaViolation(..)));
    assert_eq!(err.to_string(), "Column \"s.name\" is required");
    assert!(Reader::default().read(&path).is_err());
}

#[rstest]
#[case(CompressionCodec::Uncompressed)]
#[case(CompressionCodec::Snappy)]
#[case(CompressionCodec::Gzip)]
fn test_round_trip_is_codec_independent(#[case] codec: CompressionCodec) {
    let schema = deep_map_schema();
    let rows: Vec<Row> = deep_map_rows().into_iter().cycle().take(500).collect();
    let options = WriteOptions::default()
        .with_compression(codec)
        .with_page_size_bytes(256);
    let bytes = write_bytes(&schema, &rows, options);

    let file = open(bytes);
    for chunk in file.metadata().row_groups()[0].columns() {
        for page in chunk.dictionary_page().into_iter().chain(chunk.data_pages()) {
            assert_eq!(page.codec().unwrap(), codec);
        }
    }
    assert_eq!(collect(file.values().unwrap()), rows);
}

#[test]
fn test_alternating_nulls() {
    let schema = Schema::try_new([Column::int64("n"), Column::string("s")]).unwrap();
    let rows: Vec<Row> = (0..301i64)
        .map(|i| {
            if i % 2 == 0 {
                Row::new().with("n", Value::Null).with("s", Value::Null)
            } else {
                Row::new().with("n", i).with("s", if i % 3 == 0 { "fizz" } else { "buzz" })
            }
        })
        .collect();
    let options = WriteOptions::default()
        .with_row_group_size_bytes(512)
        .with_row_group_size_check_interval(16);
    let read = read_all(write_bytes(&schema, &rows, options));
    assert_eq!(read, rows);
    for (i, row) in read.iter().enumerate() {
        assert_eq!(row.get("n").is_some_and(Value::is_null), i % 2 == 0);
    }
}

#[test]
fn test_all_leaf_types() {
    let schema = Schema::try_new([
        Column::boolean("b"),
        Column::int32("i"),
        Column::int64("l"),
        Column::float("f"),
        Column::double("d"),
        Column::string("s"),
        Column::bytes("raw"),
        Column::fixed_len_bytes("fixed", 3),
        Column::decimal("dec", 10, 2).unwrap(),
        Column::date("date"),
        Column::time("millis", TimeUnit::Millis),
        Column::time("micros", TimeUnit::Micros),
        Column::timestamp("ts", TimeUnit::Nanos),
        Column::uuid("uuid"),
        Column::json("json"),
        Column::enum_("enum"),
    ])
    .unwrap();
    let rows: Vec<Row> = (0..60i32)
        .map(|i| {
            if i % 3 == 0 {
                return schema
                    .columns()
                    .iter()
                    .map(|c| (c.name(), Value::Null))
                    .collect();
            }
            let wide = i64::from(i);
            Row::new()
                .with("b", i % 2 == 0)
                .with("i", -i)
                .with("l", wide * 1_000_000_007)
                .with("f", i as f32 / 4.0)
                .with("d", f64::from(i) * -0.125)
                .with("s", format!("row {i}"))
                .with("raw", Bytes::from(vec![0u8, 255, i as u8]))
                .with("fixed", Bytes::from(vec![i as u8; 3]))
                .with("dec", Value::Decimal(i128::from(i) * -99_999_999))
                .with("date", 19_000 + i)
                .with("millis", i * 1000)
                .with("micros", wide * 1_000_000)
                .with("ts", 1_700_000_000_000_000_000i64 + wide)
                .with("uuid", format!("00000000-0000-4000-8000-{:012}", i))
                .with("json", format!("{{\"i\":{i}}}"))
                .with("enum", if i % 2 == 0 { "EVEN" } else { "ODD" })
        })
        .collect();
    let bytes = write_bytes(&schema, &rows, WriteOptions::default());
    assert_eq!(read_all(bytes), rows);
}

#[test]
fn test_nested_lists_and_structs() {
    let schema = Schema::try_new([Column::list(
        "items",
        Column::struct_(
            "element",
            [
                Column::int32("a").required(),
                Column::list("tags", Column::list("element", Column::string("element"))),
            ],
        ),
    )])
    .unwrap();
    let item = |a: i32, tags: Value| struct_value([("a", Value::Int32(a)), ("tags", tags)]);
    let rows = vec![
        Row::new().with(
            "items",
            Value::List(vec![
                item(1, Value::List(vec![Value::List(vec![Value::from("x")])])),
                Value::Null,
                item(
                    2,
                    Value::List(vec![
                        Value::List(vec![]),
                        Value::Null,
                        Value::List(vec![Value::from("y"), Value::Null]),
                    ]),
                ),
            ]),
        ),
        Row::new().with("items", Value::List(vec![])),
        Row::new().with("items", Value::Null),
        Row::new().with("items", Value::List(vec![item(3, Value::Null)])),
    ];
    let bytes = write_bytes(&schema, &rows, WriteOptions::default());
    assert_eq!(read_all(bytes), rows);
}

#[test]
fn test_struct_projection() {
    let schema = Schema::try_new([
        Column::int32("id").required(),
        Column::struct_("s", [Column::int32("a"), Column::string("b")]),
    ])
    .unwrap();
    let rows: Vec<Row> = (0..20i32)
        .map(|i| {
            let s = if i % 4 == 0 {
                Value::Null
            } else {
                struct_value([("a", Value::Int32(i)), ("b", Value::from(format!("b{i}")))])
            };
            Row::new().with("id", i).with("s", s)
        })
        .collect();
    let file = open(write_bytes(&schema, &rows, WriteOptions::default()));
    let projected = collect(file.scan().with_columns(["s.b"]).into_rows().unwrap());
    let expected: Vec<Row> = rows
        .iter()
        .map(|row| {
            let s = match row.get("s") {
                Some(s @ Value::Struct(_)) => {
                    struct_value([("b", s.field("b").cloned().unwrap_or_default())])
                }
                _ => Value::Null,
            };
            Row::new().with("s", s)
        })
        .collect();
    assert_eq!(projected, expected);

    let err = file.scan().with_columns(["nope"]).into_rows().err().unwrap();
    assert_eq!(err.to_string(), "Column \"nope\" does not exist");
}

fn paginated_file() -> (StrataFile<Bytes>, Vec<Row>) {
    let schema = Schema::try_new([
        Column::int32("id").required(),
        Column::list("tags", Column::string("element")),
    ])
    .unwrap();
    let rows: Vec<Row> = (0..250i32)
        .map(|id| {
            let tags = (0..id % 5).map(|t| format!("t{t}")).collect::<Vec<_>>();
            Row::new().with("id", id).with("tags", tags)
        })
        .collect();
    let options = WriteOptions::default()
        .with_row_group_size_bytes(256)
        .with_row_group_size_check_interval(7)
        .with_page_size_bytes(64);
    (open(write_bytes(&schema, &rows, options)), rows)
}

#[rstest]
#[case(0, 1)]
#[case(0, 250)]
#[case(3, 10)]
#[case(6, 8)]
#[case(49, 60)]
#[case(100, 1000)]
#[case(249, 5)]
#[case(250, 1)]
#[case(1000, 3)]
fn test_pagination_law(#[case] offset: usize, #[case] limit: usize) {
    let (file, rows) = paginated_file();
    assert!(file.metadata().row_groups().len() > 3);

    let page = collect(
        file.scan()
            .with_offset(offset as i64)
            .with_limit(limit as i64)
            .into_rows()
            .unwrap(),
    );
    let start = offset.min(rows.len());
    let end = (offset + limit).min(rows.len());
    assert_eq!(page, rows[start..end]);

    let tail = collect(file.scan().with_offset(offset as i64).into_rows().unwrap());
    assert_eq!(tail, rows[start..]);
}

#[test]
fn test_invalid_pagination_is_rejected_first() {
    let (file, _) = paginated_file();
    let err = file.scan().with_offset(-1).into_rows().err().unwrap();
    assert!(matches!(err, StrataError::InvalidPagination(..)));

    let err = file
        .scan()
        .with_columns(["nope"])
        .with_limit(0)
        .into_rows()
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "Limit must be greater than 0");

    let pagination = Pagination::try_new(240, Some(20)).unwrap();
    let rows = collect(file.scan().with_pagination(pagination).into_rows().unwrap());
    assert_eq!(rows.len(), 10);
}

#[test]
fn test_unsupported_encoding() {
    let schema = Schema::try_new([Column::int32("id").required(), Column::string("name")]).unwrap();
    let rows: Vec<Row> = (0..10i32)
        .map(|id| Row::new().with("id", id).with("name", format!("{id}")))
        .collect();
    let bytes = write_bytes(&schema, &rows, WriteOptions::default());
    let bytes = rewrite_footer(&bytes, |footer| {
        footer.row_groups[0].columns[0].data_pages[0].encoding =
            u8::from(Encoding::DeltaBinaryPacked).into();
    });

    let file = open(bytes);
    let err = file.values().unwrap().next().unwrap().unwrap_err();
    assert!(matches!(err, StrataError::UnsupportedEncoding(..)));
    assert_eq!(
        err.to_string(),
        "Encoding DELTA_BINARY_PACKED of column \"id\" is not supported"
    );

    // columns that are not read are never checked
    let names = collect(file.scan().with_columns(["name"]).into_rows().unwrap());
    assert_eq!(names.len(), 10);
}

#[test]
fn test_unsupported_codec_on_read() {
    let schema = Schema::try_new([Column::int32("id").required()]).unwrap();
    let rows: Vec<Row> = (0..10i32).map(|id| Row::new().with("id", id)).collect();
    let bytes = write_bytes(&schema, &rows, WriteOptions::default());
    let bytes = rewrite_footer(&bytes, |footer| {
        footer.row_groups[0].columns[0].data_pages[0].codec = u8::from(CompressionCodec::Zstd).into();
    });

    let mut values = open(bytes).values().unwrap();
    let err = values.next().unwrap().unwrap_err();
    assert!(
        err.to_string()
            .ends_with("Compression codec ZSTD is not supported"),
        "{err}"
    );
    assert!(values.next().is_none());
}

#[test]
fn test_page_offset_overflow_on_read() {
    let schema = Schema::try_new([Column::int32("id").required()]).unwrap();
    let rows: Vec<Row> = (0..10i32).map(|id| Row::new().with("id", id)).collect();
    let bytes = write_bytes(&schema, &rows, WriteOptions::default());
    let bytes = rewrite_footer(&bytes, |footer| {
        footer.row_groups[0].columns[0].data_pages[0].offset = u64::MAX;
    });

    let mut values = open(bytes).values().unwrap();
    let err = values.next().unwrap().unwrap_err();
    let mut cause = &err;
    while let StrataError::Context(_, inner) = cause {
        cause = inner;
    }
    assert!(matches!(cause, StrataError::Corrupted(..)), "{err}");
    assert!(values.next().is_none());
}

#[test]
fn test_statistics_and_dictionary() {
    let schema = Schema::try_new([Column::int32("id").required(), Column::string("category")])
        .unwrap();
    let categories = ["red", "green", "blue"];
    let rows: Vec<Row> = (0..100i32)
        .map(|id| {
            let category = if id % 10 == 0 {
                Value::Null
            } else {
                Value::from(categories[id as usize % 3])
            };
            Row::new().with("id", id).with("category", category)
        })
        .collect();
    let bytes = write_bytes(&schema, &rows, WriteOptions::default());
    let file = open(bytes.clone());
    let columns = file.metadata().row_groups()[0].columns();

    assert_eq!(columns[0].encoding().unwrap(), Encoding::Plain);
    let ids = columns[0].statistics().unwrap();
    assert_eq!(ids.min(), Some(&Value::Int32(0)));
    assert_eq!(ids.max(), Some(&Value::Int32(99)));
    assert_eq!(ids.null_count(), 0);

    assert_eq!(columns[1].encoding().unwrap(), Encoding::RleDictionary);
    assert_eq!(columns[1].dictionary_page().unwrap().num_values(), 3);
    let categories = columns[1].statistics().unwrap();
    assert_eq!(categories.min(), Some(&Value::from("blue")));
    assert_eq!(categories.max(), Some(&Value::from("red")));
    assert_eq!(categories.null_count(), 10);
    assert_eq!(categories.distinct_count(), Some(3));

    assert_eq!(read_all(bytes), rows);
}

#[test]
fn test_reading_is_repeatable() {
    let (file, rows) = paginated_file();
    let first = collect(file.values().unwrap());
    let second = collect(file.clone().values().unwrap());
    assert_eq!(first, rows);
    assert_eq!(first, second);
}

#[test]
fn test_empty_file() {
    let schema = Schema::try_new([Column::string("s")]).unwrap();
    let bytes = write_bytes(&schema, &[], WriteOptions::default());
    let file = open(bytes);
    assert_eq!(file.num_rows(), 0);
    assert!(file.metadata().row_groups().is_empty());
    assert!(collect(file.values().unwrap()).is_empty());
}
