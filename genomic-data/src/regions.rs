//! 3'-terminal and intronic regions of annotated transcripts

use crate::bed::*;
use crate::gff::{Biotype, GeneSymbol};
use crate::strand::Strand;
use crate::transcript::{GeneStructure, TranscriptModel};

use indicatif::ParallelProgressIterator;
use log::info;
use rayon::prelude::*;
use std::collections::HashSet;

/// Gene biotypes kept by default, the same set used by 10x references
pub const DEFAULT_GENE_TYPES: [&str; 3] = ["antisense", "lincRNA", "protein_coding"];

pub const RETAINED_INTRON: &str = "retained_intron";

/// Prefix of RefSeq microRNA gene names
pub const REFSEQ_MIRNA_PREFIX: &str = "MIR";

pub const UTR_NAME_DELIM: char = ';';
pub const INTRON_NAME_DELIM: char = ',';

const MITOCHONDRIAL_CHROMOSOMES: [&str; 2] = ["MT", "CHRM"];

/// Which transcripts contribute regions
#[derive(Debug, Clone)]
pub enum BiotypeFilter {
    /// GENCODE/Ensembl: allowed gene biotypes, no retained introns
    Gencode { gene_types: HashSet<Box<str>> },
    /// RefSeq: everything except microRNA genes
    RefSeq,
}

impl Default for BiotypeFilter {
    fn default() -> Self {
        Self::gencode(&DEFAULT_GENE_TYPES)
    }
}

impl BiotypeFilter {
    pub fn gencode<S: AsRef<str>>(gene_types: &[S]) -> Self {
        Self::Gencode {
            gene_types: gene_types.iter().map(|x| x.as_ref().into()).collect(),
        }
    }

    /// Should this transcript contribute regions?
    pub fn keep(&self, model: &TranscriptModel) -> bool {
        match self {
            BiotypeFilter::Gencode { gene_types } => {
                let gene_type_ok = match &model.gene_type {
                    Biotype::Type(x) => gene_types.contains(x),
                    Biotype::Missing => false,
                };
                gene_type_ok && !model.transcript_type.is(RETAINED_INTRON)
            }
            BiotypeFilter::RefSeq => match &model.gene_name {
                GeneSymbol::Symbol(x) => !x.starts_with(REFSEQ_MIRNA_PREFIX),
                GeneSymbol::Missing => true,
            },
        }
    }
}

pub fn is_mitochondrial(chrom: &str) -> bool {
    let chrom = chrom.to_uppercase();
    MITOCHONDRIAL_CHROMOSOMES.contains(&chrom.as_str())
}

/// The 3'-most exon: the last one on the forward strand, the first one
/// on the backward strand. Named after the gene.
pub fn three_prime_region(gene_id: &str, model: &TranscriptModel) -> Option<BedRecord> {
    let &(start, stop) = match model.strand {
        Strand::Forward => model.exons.last()?,
        Strand::Backward => model.exons.first()?,
    };

    Some(BedRecord {
        chr: model.chrom.clone(),
        start: start - 1,
        stop,
        name: model.display_name(gene_id),
        strand: model.strand,
    })
}

/// Gaps between consecutive exons, named
/// `chrom;gene_id;transcript_id;gene_name`
///
/// Exons `(s1, e1)` and `(s2, e2)` (1-based, inclusive) leave the
/// intron `[e1 + 1, s2 - 1]`, i.e., `[e1, s2 - 1)` in BED.
pub fn intron_regions(gene_id: &str, transcript_id: &str, model: &TranscriptModel) -> Vec<BedRecord> {
    if model.exons.len() < 2 {
        return vec![];
    }

    let name: Box<str> = format!(
        "{}{d}{}{d}{}{d}{}",
        model.chrom,
        gene_id,
        transcript_id,
        model.display_name(gene_id),
        d = UTR_NAME_DELIM
    )
    .into_boxed_str();

    model
        .exons
        .windows(2)
        .filter_map(|pair| {
            let (_, e1) = pair[0];
            let (s2, _) = pair[1];
            let intron = BedRecord {
                chr: model.chrom.clone(),
                start: e1,
                stop: s2 - 1,
                name: name.clone(),
                strand: model.strand,
            };
            (!intron.is_empty()).then_some(intron)
        })
        .collect()
}

/// Exons of a transcript as BED records (0-based)
pub fn exon_regions(model: &TranscriptModel) -> Vec<BedRecord> {
    model
        .exons
        .iter()
        .map(|&(start, stop)| BedRecord {
            chr: model.chrom.clone(),
            start: start - 1,
            stop,
            name: ".".into(),
            strand: model.strand,
        })
        .collect()
}

/// Regions before merging
#[derive(Debug, Default)]
pub struct DerivedRegions {
    pub utr: Vec<BedRecord>,
    pub mito_utr: Vec<BedRecord>,
    pub introns: Vec<BedRecord>,
    /// exons of all transcripts except retained introns, whatever the
    /// biotype filter says
    pub exons: Vec<BedRecord>,
    pub num_transcripts: usize,
}

/// Take 3'-terminal regions and introns of the transcripts passing the
/// `filter`, gene by gene in parallel. Exons are collected from every
/// transcript that is not a retained intron.
pub fn derive_regions(structure: &GeneStructure, filter: &BiotypeFilter) -> DerivedRegions {
    let ngenes = structure.num_genes() as u64;

    let per_gene = structure
        .genes
        .par_iter()
        .progress_count(ngenes)
        .map(|(gene_id, transcripts)| {
            let mut ret = DerivedRegions::default();
            for (transcript_id, model) in transcripts.iter() {
                // retained introns would wipe out real introns
                if !model.transcript_type.is(RETAINED_INTRON) {
                    ret.exons.extend(exon_regions(model));
                }

                if !filter.keep(model) {
                    continue;
                }
                ret.num_transcripts += 1;

                if let Some(utr) = three_prime_region(gene_id, model) {
                    if is_mitochondrial(&model.chrom) {
                        ret.mito_utr.push(utr);
                    } else {
                        ret.utr.push(utr);
                    }
                }

                ret.introns
                    .extend(intron_regions(gene_id, transcript_id, model));
            }
            ret
        })
        .collect::<Vec<_>>();

    let mut ret = DerivedRegions::default();
    for x in per_gene {
        ret.utr.extend(x.utr);
        ret.mito_utr.extend(x.mito_utr);
        ret.introns.extend(x.introns);
        ret.exons.extend(x.exons);
        ret.num_transcripts += x.num_transcripts;
    }

    info!(
        "{} transcripts passed: {} 3' regions ({} mitochondrial), {} introns",
        ret.num_transcripts,
        ret.utr.len() + ret.mito_utr.len(),
        ret.mito_utr.len(),
        ret.introns.len()
    );

    ret
}

/// Merge 3' regions of the same gene and strand, dropping the merged
/// regions shared by more than one gene. Nuclear regions within
/// `max_distance` of each other are merged; mitochondrial regions only
/// when they overlap or touch. Mitochondrial records come last.
pub fn finalize_utr(
    nuclear: &[BedRecord],
    mitochondrial: &[BedRecord],
    max_distance: i64,
) -> Vec<BedRecord> {
    let single_gene = |x: &BedRecord| x.num_names(UTR_NAME_DELIM) == 1;

    let merged_nuclear = merge_bed(nuclear, max_distance, UTR_NAME_DELIM);
    let merged_mito = merge_bed(mitochondrial, 0, UTR_NAME_DELIM);
    let nmerged = merged_nuclear.len() + merged_mito.len();

    let ret = merged_nuclear
        .into_iter()
        .chain(merged_mito)
        .filter(single_gene)
        .collect::<Vec<_>>();

    info!(
        "{} merged 3' regions, {} ambiguous ones dropped",
        nmerged,
        nmerged - ret.len()
    );
    ret
}

/// Optionally carve out exonic parts (same strand) of the introns, then
/// collapse identical intervals
///
/// * `introns` - introns of the selected transcripts
/// * `exons` - exons to carve out, see `DerivedRegions::exons`
/// * `subtract_exons` - remove exonic parts
pub fn finalize_introns(
    introns: &[BedRecord],
    exons: &[BedRecord],
    subtract_exons: bool,
) -> anyhow::Result<Vec<BedRecord>> {
    let introns = if subtract_exons {
        let ret = subtract_bed(introns, exons)?;
        info!(
            "{} intronic pieces left after removing {} exons",
            ret.len(),
            exons.len()
        );
        ret
    } else {
        introns.to_vec()
    };

    Ok(group_bed(&introns, INTRON_NAME_DELIM))
}
