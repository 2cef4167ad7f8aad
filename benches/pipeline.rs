//! Benchmark suite for the conversion pipeline

use std::fs;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kgload::binning::{bin_edges, bin_nodes};
use kgload::convert::{format_list, CsvConverter};
use kgload::partition::PartitionFiles;
use kgload::{CategoryPriority, FileKind, NodeClassLookup, PartitionRange, PipelineConfig};
use tempfile::TempDir;

const CLASSES: &[&str] = &[
    "biolink:Gene",
    "biolink:Protein",
    "biolink:SmallMolecule",
    "biolink:Disease",
    "biolink:Pathway",
];

fn create_test_export(dir: &Path, node_count: usize, edge_count: usize) {
    let mut nodes = String::from("id,name,labels\n");
    for i in 0..node_count {
        nodes.push_str(&format!(
            "N:{},node_{},\"[{},biolink:NamedThing]\"\n",
            i,
            i,
            CLASSES[i % CLASSES.len()]
        ));
    }
    fs::write(dir.join("rk-nodes-conv1.csv"), nodes).unwrap();

    let mut edges = String::from("from,to,subject,label,object\n");
    for i in 0..edge_count {
        let (s, o) = (i % node_count, (i * 7 + 1) % node_count);
        edges.push_str(&format!("N:{},N:{},N:{},biolink:related_to,N:{}\n", s, o, s, o));
    }
    fs::write(dir.join("rk-edges-conv1.csv"), edges).unwrap();
}

fn create_test_lookup(node_count: usize) -> NodeClassLookup {
    let mut lookup = NodeClassLookup::new();
    for i in 0..node_count {
        let class = CLASSES[i % CLASSES.len()].trim_start_matches("biolink:");
        lookup.insert(format!("N:{}", i), class);
    }
    lookup
}

fn bench_reorder(c: &mut Criterion) {
    let priority = CategoryPriority::default();
    let cell = "biolink:NamedThing;biolink:BiologicalEntity;biolink:ThingWithTaxon;\
                biolink:MolecularEntity;biolink:ChemicalEntity;biolink:SmallMolecule";

    c.bench_function("reorder_labels", |b| {
        b.iter(|| priority.reorder(black_box(cell)))
    });

    c.bench_function("format_list", |b| {
        b.iter(|| format_list(black_box("PMID:1;PMID:2;PMID:3;PMID:4;Crohn's")))
    });
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_nodes");
    let config = PipelineConfig::default();

    for size in [1000, 10000] {
        let dir = TempDir::new().unwrap();
        let mut raw = String::from("id,name,category,rotb\n");
        for i in 0..size {
            raw.push_str(&format!(
                "N:{},node_{},biolink:NamedThing;{},{}.0\n",
                i,
                i,
                CLASSES[i % CLASSES.len()],
                i % 9
            ));
        }
        let input = dir.path().join("rk-nodes-pt1.csv");
        let output = dir.path().join("rk-nodes-conv1.csv");
        fs::write(&input, raw).unwrap();

        let converter = CsvConverter::new(FileKind::Node, &config);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| converter.convert_file(&input, &output).unwrap())
        });
    }

    group.finish();
}

fn bench_binning(c: &mut Criterion) {
    let mut group = c.benchmark_group("binning");

    for size in [1000, 10000] {
        let dir = TempDir::new().unwrap();
        create_test_export(dir.path(), size, size * 3);
        let lookup = create_test_lookup(size);
        let nodes = PartitionFiles::new(dir.path(), "rk-nodes-pt", PartitionRange::new(1, 1));
        let edges = PartitionFiles::new(dir.path(), "rk-edges-pt", PartitionRange::new(1, 1));

        group.bench_with_input(BenchmarkId::new("nodes", size), &size, |b, _| {
            b.iter(|| bin_nodes(&nodes).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("edges", size), &size, |b, _| {
            b.iter(|| bin_edges(&edges, &lookup).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reorder, bench_convert, bench_binning);
criterion_main!(benches);
