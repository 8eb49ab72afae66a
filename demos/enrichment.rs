//! Runs an enrichment on a small synthetic population and prints the results
//!
//! Usage
//! enrichment <SCORE THRESHOLD> <N RESULTS>
//!
//! Set `RUST_LOG=debug` to see why annotations are skipped.
use std::process;

use npenrich::annotations::{AnnotationKey, Target};
use npenrich::source::memory::{InMemorySource, Record};
use npenrich::{EngineError, EnrichmentEngine, EnrichmentRequest, Fingerprint512};

/// Builds 200 compounds and 100 gene clusters
///
/// Compounds with an id divisible by 10 share most bits with the query
/// and are mostly non-ribosomal peptides.
fn population(query: &[usize]) -> InMemorySource {
    let nrp = AnnotationKey::new("mibig", "biosynthetic_class", "NRP");
    let pk = AnnotationKey::new("mibig", "biosynthetic_class", "Polyketide");
    let terpene = AnnotationKey::new("mibig", "biosynthetic_class", "Terpene");
    let antibacterial = AnnotationKey::new("npatlas", "activity", "antibacterial");

    let mut source = InMemorySource::new();
    for id in 1..=200u64 {
        let similar = id % 10 == 0;
        let mut bits: Vec<usize> = if similar {
            query.to_vec()
        } else {
            vec![100 + (id % 50) as usize, 200 + (id % 7) as usize]
        };
        bits.push(300 + (id % 3) as usize);

        let mut record = Record::compound(id, id, Fingerprint512::from_bits(&bits))
            .with_name(&format!("compound-{id}"));
        record = match (similar, id % 4) {
            (true, 0..=2) | (false, 0) => record.with_annotation(nrp.clone()),
            (_, 1) => record.with_annotation(pk.clone()),
            _ => record.with_annotation(terpene.clone()),
        };
        if id % 3 == 0 {
            record = record.with_annotation(antibacterial.clone());
        }
        source.add(record);
    }
    for id in 1..=100u64 {
        let bits = [400 + (id % 20) as usize];
        let key = if id % 2 == 0 { &pk } else { &nrp };
        source.add(
            Record::genbank_region(1000 + id, id, Fingerprint512::from_bits(&bits))
                .with_annotation(key.clone()),
        );
    }
    // regions without any fingerprint still count towards the population
    for id in 101..=120u64 {
        source.add_target(Target::GeneCluster(id.into()));
    }
    source
}

fn main() {
    if let Err(err) = simple_logger::init_with_env() {
        eprintln!("unable to initialize logging: {err}");
    }

    let mut args = std::env::args().skip(1);
    let threshold = args
        .next()
        .map(|arg| arg.parse::<f64>().unwrap_or(0.8))
        .unwrap_or(0.8);
    let output_len = args
        .next()
        .map(|arg| arg.parse::<usize>().unwrap_or(10))
        .unwrap_or(10);

    let query = [1, 2, 3, 4, 5, 6, 7, 8];
    let engine = EnrichmentEngine::new(population(&query));
    let request = EnrichmentRequest::new(Fingerprint512::from_bits(&query).to_hex())
        .with_score_threshold(threshold);

    let response = match engine.run_enrichment(&request) {
        Ok(response) => response,
        Err(EngineError::CandidateOverflow { cap }) => {
            eprintln!("More than {cap} similar targets, increase the score threshold");
            process::exit(1)
        }
        Err(err) => {
            eprintln!("Enrichment failed: {err}");
            process::exit(1)
        }
    };

    println!("### ENRICHED ANNOTATIONS ###");
    for item in response.items().iter().take(output_len) {
        println!(
            "{}\t{:e}\t{:e}\t({:.2}x, {}/{})",
            item.id(),
            item.pvalue(),
            item.adjusted_pvalue(),
            item.enrichment(),
            item.count(),
            item.background_count()
        );
    }
    println!(
        "\n{}",
        serde_json::to_string_pretty(&response).expect("responses are always serializable")
    );
}
