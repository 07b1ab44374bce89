//! Benchmarks for compact encode and decode paths.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridpack_core::{
    Compact, CompactReader, CompactSerializer, CompactWithSchemaSerializer, CompactWriter,
    InMemorySchemaCatalog, Result, TypeRegistry,
};

#[derive(Debug, Clone, PartialEq)]
struct Trade {
    id: i64,
    symbol: Option<String>,
    quantity: i32,
    price: f64,
    flagged: bool,
    venues: Vec<i32>,
}

impl Compact for Trade {
    fn type_name() -> &'static str {
        "bench.Trade"
    }

    fn write<W: CompactWriter>(&self, writer: &mut W) -> Result<()> {
        writer.write_int64("id", self.id)?;
        writer.write_string("symbol", self.symbol.as_deref())?;
        writer.write_int32("quantity", self.quantity)?;
        writer.write_float64("price", self.price)?;
        writer.write_boolean("flagged", self.flagged)?;
        writer.write_array_of_int32("venues", Some(&self.venues))?;
        Ok(())
    }

    fn read<R: CompactReader>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            id: reader.read_int64("id")?,
            symbol: reader.read_string("symbol")?,
            quantity: reader.read_int32("quantity")?,
            price: reader.read_float64("price")?,
            flagged: reader.read_boolean("flagged")?,
            venues: reader.read_array_of_int32("venues")?.unwrap_or_default(),
        })
    }
}

fn trade() -> Trade {
    Trade {
        id: 982_451_653,
        symbol: Some("GRDP".to_string()),
        quantity: 500,
        price: 41.875,
        flagged: false,
        venues: vec![1, 4, 9, 16],
    }
}

fn reference_serializer() -> CompactSerializer {
    CompactSerializer::new(
        Arc::new(TypeRegistry::new()),
        Arc::new(InMemorySchemaCatalog::new()),
    )
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let value = trade();

    let by_reference = reference_serializer();
    group.bench_function("by_reference", |b| {
        b.iter(|| by_reference.to_bytes(black_box(&value)).unwrap())
    });

    let embedded = CompactWithSchemaSerializer::new(
        Arc::new(TypeRegistry::new()),
        Arc::new(InMemorySchemaCatalog::new()),
    );
    group.bench_function("schema_embedded", |b| {
        b.iter(|| embedded.to_bytes(black_box(&value)).unwrap())
    });

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let serializer = reference_serializer();
    let bytes = serializer.to_bytes(&trade()).unwrap();

    group.bench_function("typed", |b| {
        b.iter(|| serializer.read_as::<Trade>(black_box(&bytes)).unwrap())
    });

    group.bench_function("generic_record", |b| {
        b.iter(|| {
            let record = serializer.read_record(black_box(&bytes)).unwrap();
            black_box(record.get_float64("price").unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
