use crate::common::*;

use genomic_data::regions::*;
use genomic_data::transcript::{default_cache_file, GeneStructure};

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Gene annotation (`GTF`) file, gzipped or not
    #[arg(short = 'g', long = "gtf", required = true)]
    gtf_file: Box<str>,

    /// output header: writes `{prefix}_utr.bed` and `{prefix}_intron.bed`
    #[arg(short, long, default_value = "genes")]
    prefix: Box<str>,

    /// RefSeq annotation: keep all biotypes, drop `MIR*` genes
    #[arg(long, default_value_t = false)]
    refseq: bool,

    /// gene biotypes to keep (ignored with `--refseq`)
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_GENE_TYPES.map(Box::<str>::from)
    )]
    gene_types: Vec<Box<str>>,

    /// merge 3' regions of the same gene within this distance (bp)
    #[arg(short = 'd', long, default_value_t = 500)]
    merge_distance: i64,

    /// keep intronic parts overlapping exons of other transcripts
    #[arg(long, default_value_t = false)]
    keep_exonic_introns: bool,

    /// parse the GTF again even if a cached structure exists
    #[arg(long, default_value_t = false)]
    rebuild_cache: bool,

    /// neither read nor write the cached structure
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// cached structure file (default: next to the GTF file)
    #[arg(long)]
    cache_file: Option<Box<str>>,
}

pub fn utr_output_file(prefix: &str) -> Box<str> {
    format!("{}_utr.bed", prefix).into_boxed_str()
}

pub fn intron_output_file(prefix: &str) -> Box<str> {
    format!("{}_intron.bed", prefix).into_boxed_str()
}

pub fn run_prepare(args: &PrepareArgs) -> anyhow::Result<()> {
    if args.merge_distance < 0 {
        return Err(anyhow::anyhow!(
            "merge distance should be non-negative: {}",
            args.merge_distance
        ));
    }

    if !args.refseq && args.gene_types.is_empty() {
        return Err(anyhow::anyhow!("need at least one gene type"));
    }

    let utr_file = utr_output_file(&args.prefix);
    let intron_file = intron_output_file(&args.prefix);
    io::mkdir(&utr_file)?;

    let cache_file = if args.no_cache {
        None
    } else {
        Some(
            args.cache_file
                .clone()
                .unwrap_or_else(|| default_cache_file(&args.gtf_file)),
        )
    };

    info!("parsing GTF file: {}", args.gtf_file);
    let structure =
        GeneStructure::load_or_build(&args.gtf_file, cache_file.as_deref(), args.rebuild_cache)?;

    if structure.is_empty() {
        return Err(anyhow::anyhow!("no transcripts found in {}", args.gtf_file));
    }

    info!(
        "{} genes, {} transcripts",
        structure.num_genes(),
        structure.num_transcripts()
    );

    let filter = if args.refseq {
        BiotypeFilter::RefSeq
    } else {
        BiotypeFilter::gencode(&args.gene_types)
    };

    let derived = derive_regions(&structure, &filter);

    if derived.num_transcripts == 0 {
        warn!("no transcript passed the biotype filter: {:?}", filter);
    }

    let utr = finalize_utr(&derived.utr, &derived.mito_utr, args.merge_distance);
    io::write_lines(&utr, &utr_file)?;
    info!("wrote {} 3' regions to {}", utr.len(), utr_file);

    let introns = finalize_introns(&derived.introns, &derived.exons, !args.keep_exonic_introns)?;
    io::write_lines(&introns, &intron_file)?;
    info!("wrote {} intronic regions to {}", introns.len(), intron_file);

    Ok(())
}
