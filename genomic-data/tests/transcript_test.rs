use genomic_data::common_io::{create_temp_dir_file, open_buf_writer};
use std::io::Write;
use std::path::Path;
use genomic_data::gff::*;
use genomic_data::strand::Strand;
use genomic_data::transcript::*;

const GTF_FILE: &str = "tests/data/small.gtf";

#[test]
fn structure_from_small_gtf() -> anyhow::Result<()> {
    let structure = GeneStructure::from_gtf(GTF_FILE)?;

    assert_eq!(structure.num_genes(), 8);
    assert_eq!(structure.num_transcripts(), 10);
    assert_eq!(structure.transcripts().count(), 10);

    let gene_a = &structure.genes["ENSG01.1"];
    assert_eq!(gene_a.len(), 3);

    let t1 = &gene_a["ENST01.1"];
    assert_eq!(t1.chrom.as_ref(), "chr1");
    assert_eq!(t1.strand, Strand::Forward);
    assert_eq!(t1.gene_name, GeneSymbol::Symbol("GENE_A".into()));
    assert!(t1.gene_type.is("protein_coding"));
    assert_eq!(t1.exons, vec![(100, 200), (300, 400), (600, 700)]);

    assert!(gene_a["ENST03.1"].transcript_type.is("retained_intron"));

    // exons listed 5' to 3' on the backward strand come out sorted
    let t4 = &structure.genes["ENSG02.1"]["ENST04.1"];
    assert_eq!(t4.strand, Strand::Backward);
    assert_eq!(t4.exons, vec![(1000, 1100), (1500, 1600)]);

    // Ensembl-style biotype keys
    assert!(structure.genes["ENSG05"]["ENST06"].gene_type.is("protein_coding"));
    Ok(())
}

#[test]
fn records_without_ids_are_skipped() {
    let line = |attrs: &str| {
        parse_gff(
            format!("chr1\t.\texon\t10\t20\t.\t+\t.\t{}", attrs)
                .split('\t')
                .map(Box::from)
                .collect(),
        )
        .expect("valid line")
    };

    let records = vec![
        line("gene_id \"G1\";"),
        line("transcript_id \"T1\";"),
        line("gene_id \"G2\"; transcript_id \"T2\";"),
    ];

    let structure = GeneStructure::from_records(&records);
    assert_eq!(structure.num_genes(), 1);

    let t2 = &structure.genes["G2"]["T2"];
    assert_eq!(t2.display_name("G2").as_ref(), "G2");
    assert_eq!(t2.exons, vec![(10, 20)]);
}

#[test]
fn missing_file_is_an_error() {
    assert!(GeneStructure::from_gtf("tests/data/does_not_exist.gtf").is_err());
}

#[test]
fn cache_round_trip() -> anyhow::Result<()> {
    let structure = GeneStructure::from_gtf(GTF_FILE)?;

    let cache_file = create_temp_dir_file("json.gz")?;
    let cache_file = cache_file.to_str().expect("utf8 path");

    structure.to_cache(cache_file)?;
    assert_eq!(GeneStructure::from_cache(cache_file)?, structure);

    // the cache is newer than the annotation, so it is reused
    let loaded = GeneStructure::load_or_build(GTF_FILE, Some(cache_file), false)?;
    assert_eq!(loaded, structure);
    Ok(())
}

#[test]
fn cache_built_on_first_use_and_rebuilt_when_broken() -> anyhow::Result<()> {
    let cache_file = create_temp_dir_file("json.gz")?;
    let cache_file = cache_file.to_str().expect("utf8 path");

    let built = GeneStructure::load_or_build(GTF_FILE, Some(cache_file), false)?;
    assert!(std::path::Path::new(cache_file).exists());
    assert_eq!(GeneStructure::from_cache(cache_file)?, built);

    // not gzipped JSON
    std::fs::write(cache_file, "garbage")?;
    let rebuilt = GeneStructure::load_or_build(GTF_FILE, Some(cache_file), false)?;
    assert_eq!(rebuilt, built);
    assert_eq!(GeneStructure::from_cache(cache_file)?, built);
    Ok(())
}

#[test]
fn default_cache_file_names() {
    assert_eq!(
        default_cache_file("/ref/genes.gtf.gz").as_ref(),
        "/ref/genes.gtf.structure.json.gz"
    );
    assert_eq!(
        default_cache_file("genes.gtf").as_ref(),
        "genes.structure.json.gz"
    );
}

#[test]
fn gene_lines_fill_in_gene_attributes() {
    let line = |feature: &str, attrs: &str| {
        parse_gff(
            format!("chr1\t.\t{}\t10\t20\t.\t+\t.\t{}", feature, attrs)
                .split('\t')
                .map(Box::from)
                .collect(),
        )
        .expect("valid line")
    };

    let records = vec![
        line("gene", "gene_id \"G1\"; gene_name \"ALPHA\"; gene_type \"lincRNA\";"),
        line("exon", "gene_id \"G1\"; transcript_id \"T1\";"),
        line("exon", "gene_id \"G1\"; transcript_id \"T2\"; gene_name \"BETA\";"),
    ];

    let structure = GeneStructure::from_records(&records);
    assert_eq!(structure.num_transcripts(), 2);

    let t1 = &structure.genes["G1"]["T1"];
    assert_eq!(t1.gene_name, GeneSymbol::Symbol("ALPHA".into()));
    assert!(t1.gene_type.is("lincRNA"));

    // transcript lines come first
    let t2 = &structure.genes["G1"]["T2"];
    assert_eq!(t2.gene_name, GeneSymbol::Symbol("BETA".into()));
    assert!(t2.gene_type.is("lincRNA"));
}

fn write_one_gene_gtf(gtf_file: &Path, gene_id: &str) -> anyhow::Result<()> {
    let line = format!(
        "chr1\t.\texon\t10\t20\t.\t+\t.\tgene_id \"{}\"; transcript_id \"T1\";\n",
        gene_id
    );
    std::fs::write(gtf_file, line)?;
    Ok(())
}

fn gene_ids(structure: &GeneStructure) -> Vec<&str> {
    structure.genes.keys().map(|x| x.as_ref()).collect()
}

#[test]
fn stale_cache_is_rebuilt() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let gtf = dir.path().join("genes.gtf");
    let gtf_file = gtf.to_str().expect("utf8 path");
    let cache = dir.path().join("genes.structure.json.gz");
    let cache_file = cache.to_str().expect("utf8 path");

    write_one_gene_gtf(&gtf, "G1")?;
    let first = GeneStructure::load_or_build(gtf_file, Some(cache_file), false)?;
    assert_eq!(gene_ids(&first), vec!["G1"]);

    // the annotation changes after the cache was written
    write_one_gene_gtf(&gtf, "G9")?;
    let an_hour_ago = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
    std::fs::File::options()
        .write(true)
        .open(&cache)?
        .set_modified(an_hour_ago)?;

    let second = GeneStructure::load_or_build(gtf_file, Some(cache_file), false)?;
    assert_eq!(gene_ids(&second), vec!["G9"]);
    assert_eq!(GeneStructure::from_cache(cache_file)?, second);
    Ok(())
}

#[test]
fn cache_of_another_version_is_rebuilt() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let gtf = dir.path().join("genes.gtf");
    let gtf_file = gtf.to_str().expect("utf8 path");
    let cache_file = dir.path().join("genes.structure.json.gz");
    let cache_file = cache_file.to_str().expect("utf8 path");

    write_one_gene_gtf(&gtf, "G1")?;

    let mut buf = open_buf_writer(cache_file)?;
    write!(buf, "{{\"version\":0,\"structure\":{{\"genes\":{{}}}}}}")?;
    buf.flush()?;
    drop(buf);

    assert!(GeneStructure::from_cache(cache_file).is_err());

    let loaded = GeneStructure::load_or_build(gtf_file, Some(cache_file), false)?;
    assert_eq!(gene_ids(&loaded), vec!["G1"]);
    assert_eq!(GeneStructure::from_cache(cache_file)?, loaded);
    Ok(())
}

#[test]
fn rebuild_ignores_a_fresh_cache() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let gtf = dir.path().join("genes.gtf");
    let gtf_file = gtf.to_str().expect("utf8 path");
    let cache_file = dir.path().join("genes.structure.json.gz");
    let cache_file = cache_file.to_str().expect("utf8 path");

    write_one_gene_gtf(&gtf, "G1")?;
    GeneStructure::default().to_cache(cache_file)?;

    let cached = GeneStructure::load_or_build(gtf_file, Some(cache_file), false)?;
    assert!(cached.is_empty());

    let rebuilt = GeneStructure::load_or_build(gtf_file, Some(cache_file), true)?;
    assert_eq!(gene_ids(&rebuilt), vec!["G1"]);
    assert_eq!(GeneStructure::from_cache(cache_file)?, rebuilt);
    Ok(())
}
