use crate::common_io::read_lines_of_words_delim;
use crate::strand::Strand;

use dashmap::{DashMap as HashMap, DashSet as HashSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// read gff records including multiple annotations per gene
pub fn read_gff_record_vec(file_path: &str) -> anyhow::Result<Vec<GffRecord>> {
    let lines_of_words = read_lines_of_words_delim(file_path, &['\t'], -1)?.lines;

    Ok(lines_of_words
        .into_par_iter()
        .filter_map(parse_gff)
        .collect::<Vec<_>>())
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub enum FeatureType {
    Gene,
    Transcript,
    Exon,
    CDS,
    UTR,
    FivePrimeUTR,
    ThreePrimeUTR,
    StartCodon,
    StopCodon,
    Other,
}

impl From<&str> for FeatureType {
    fn from(val: &str) -> Self {
        match val {
            "gene" | "Gene" => FeatureType::Gene,
            "transcript" | "mRNA" => FeatureType::Transcript,
            "exon" => FeatureType::Exon,
            "CDS" | "cds" => FeatureType::CDS,
            "UTR" | "utr" => FeatureType::UTR,
            "five_prime_UTR" | "5UTR" | "five_prime_utr" => FeatureType::FivePrimeUTR,
            "three_prime_UTR" | "3UTR" | "three_prime_utr" => FeatureType::ThreePrimeUTR,
            "start_codon" | "start" => FeatureType::StartCodon,
            "stop_codon" | "stop" => FeatureType::StopCodon,
            _ => FeatureType::Other,
        }
    }
}

impl From<FeatureType> for Box<str> {
    fn from(feature_type: FeatureType) -> Self {
        match feature_type {
            FeatureType::Gene => Box::from("gene"),
            FeatureType::Transcript => Box::from("transcript"),
            FeatureType::Exon => Box::from("exon"),
            FeatureType::CDS => Box::from("CDS"),
            FeatureType::UTR => Box::from("UTR"),
            FeatureType::FivePrimeUTR => Box::from("five_prime_UTR"),
            FeatureType::ThreePrimeUTR => Box::from("three_prime_UTR"),
            FeatureType::StartCodon => Box::from("start_codon"),
            FeatureType::StopCodon => Box::from("stop_codon"),
            FeatureType::Other => Box::from("."),
        }
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let x: Box<str> = (*self).into();
        write!(f, "{}", x)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Serialize, Deserialize)]
pub enum GeneId {
    Id(Box<str>),
    Missing,
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Serialize, Deserialize)]
pub enum TranscriptId {
    Id(Box<str>),
    Missing,
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Serialize, Deserialize)]
pub enum GeneSymbol {
    Symbol(Box<str>),
    Missing,
}

/// `gene_type`/`transcript_type` (GENCODE) or
/// `gene_biotype`/`transcript_biotype` (Ensembl, RefSeq)
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Serialize, Deserialize)]
pub enum Biotype {
    Type(Box<str>),
    Missing,
}

impl Biotype {
    pub fn is(&self, name: &str) -> bool {
        matches!(self, Biotype::Type(x) if x.as_ref() == name)
    }
}

macro_rules! boxed_str_display {
    ($t:ident, $variant:ident) => {
        impl From<$t> for Box<str> {
            fn from(val: $t) -> Self {
                match val {
                    $t::$variant(x) => x,
                    $t::Missing => Box::from("."),
                }
            }
        }

        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $t::$variant(x) => write!(f, "{}", x),
                    $t::Missing => write!(f, "."),
                }
            }
        }
    };
}

boxed_str_display!(GeneId, Id);
boxed_str_display!(TranscriptId, Id);
boxed_str_display!(GeneSymbol, Symbol);
boxed_str_display!(Biotype, Type);

/// GFF record
#[derive(Clone, Debug)]
pub struct GffRecord {
    pub seqname: Box<str>,         // sequence name
    pub feature_type: FeatureType, // we mostly need exons
    pub start: i64,                // 1-based
    pub stop: i64,                 // 1-based, inclusive
    pub strand: Strand,
    pub gene_id: GeneId,
    pub transcript_id: TranscriptId,
    pub gene_name: GeneSymbol,
    pub gene_type: Biotype,
    pub transcript_type: Biotype,
}

/// parse a GTF line to a record
/// [gencode](https://www.gencodegenes.org/pages/data_format.html)
///
/// Attributes of the form `key "value";` are expected, but
/// `key=value;` (GFF3) works too.
pub fn parse_gff(words: Vec<Box<str>>) -> Option<GffRecord> {
    const SPLIT_SEP: char = ';';
    const NUM_FIELDS: usize = 9;

    if words.len() != NUM_FIELDS {
        return None;
    }

    let seqname = words[0].clone();
    let feature_type: FeatureType = words[2].as_ref().into();
    let start = words[3].trim().parse::<i64>().ok()?;
    let stop = words[4].trim().parse::<i64>().ok()?;
    let strand = Strand::parse(words[6].trim())?;

    let mut gene_id = GeneId::Missing;
    let mut transcript_id = TranscriptId::Missing;
    let mut gene_name = GeneSymbol::Missing;
    let mut gene_type = Biotype::Missing;
    let mut transcript_type = Biotype::Missing;

    fn unquote(s: &str) -> &str {
        let s = s.trim();
        let s = s.strip_prefix('"').unwrap_or(s);
        s.strip_suffix('"').unwrap_or(s)
    }

    for attr in words[8].split(SPLIT_SEP).map(|s| s.trim()) {
        let Some((key, value)) = attr.split_once([' ', '=']) else {
            continue;
        };
        let value = unquote(value);
        if value.is_empty() {
            continue;
        }

        match key.trim() {
            "gene_id" => {
                gene_id = GeneId::Id(value.into());
            }
            "transcript_id" => {
                transcript_id = TranscriptId::Id(value.into());
            }
            "gene_name" => {
                gene_name = GeneSymbol::Symbol(value.into());
            }
            // GENCODE's key wins over Ensembl's if both are present
            "gene_type" => {
                gene_type = Biotype::Type(value.into());
            }
            "gene_biotype" if gene_type == Biotype::Missing => {
                gene_type = Biotype::Type(value.into());
            }
            "transcript_type" => {
                transcript_type = Biotype::Type(value.into());
            }
            "transcript_biotype" if transcript_type == Biotype::Missing => {
                transcript_type = Biotype::Type(value.into());
            }
            _ => {}
        }
    }

    Some(GffRecord {
        seqname,
        feature_type,
        start,
        stop,
        strand,
        gene_id,
        transcript_id,
        gene_name,
        gene_type,
        transcript_type,
    })
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub enum BiotypeKind {
    Gene,
    Transcript,
}

impl std::fmt::Display for BiotypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BiotypeKind::Gene => write!(f, "gene"),
            BiotypeKind::Transcript => write!(f, "transcript"),
        }
    }
}

/// How many distinct genes and transcripts carry a biotype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiotypeCount {
    pub kind: BiotypeKind,
    pub biotype: Biotype,
    pub genes: usize,
    pub transcripts: usize,
}

impl std::fmt::Display for BiotypeCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.kind, self.biotype, self.genes, self.transcripts
        )
    }
}

/// Count distinct genes and transcripts for each gene biotype and
/// each transcript biotype. Sorted by kind, then by decreasing number
/// of genes.
pub fn count_biotypes(records: &[GffRecord]) -> Vec<BiotypeCount> {
    type Members = (HashSet<GeneId>, HashSet<TranscriptId>);
    let counts: HashMap<(BiotypeKind, Biotype), Members> = HashMap::new();

    records.par_iter().for_each(|rec| {
        for key in [
            (BiotypeKind::Gene, rec.gene_type.clone()),
            (BiotypeKind::Transcript, rec.transcript_type.clone()),
        ] {
            let members = counts.entry(key).or_default();
            if rec.gene_id != GeneId::Missing {
                members.0.insert(rec.gene_id.clone());
            }
            if rec.transcript_id != TranscriptId::Missing {
                members.1.insert(rec.transcript_id.clone());
            }
        }
    });

    let mut ret = counts
        .into_iter()
        .map(|((kind, biotype), (genes, transcripts))| BiotypeCount {
            kind,
            biotype,
            genes: genes.len(),
            transcripts: transcripts.len(),
        })
        .collect::<Vec<_>>();

    ret.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then(b.genes.cmp(&a.genes))
            .then(a.biotype.cmp(&b.biotype))
    });
    ret
}
