//! Transcript structure: gene -> transcript -> exons
//!
//! Parsing a whole GTF takes a while, so the structure can be stored
//! next to the annotation file as gzipped JSON and reused.

use crate::common_io::{open_buf_reader, open_buf_writer, read_lines_of_words_delim, strip_extension};
use crate::gff::*;
use crate::strand::Strand;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

const CACHE_FORMAT_VERSION: u32 = 1;
const CACHE_SUFFIX: &str = "structure.json.gz";

/// Exons of one transcript along with gene-level information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptModel {
    pub chrom: Box<str>,
    pub strand: Strand,
    pub gene_name: GeneSymbol,
    pub gene_type: Biotype,
    pub transcript_type: Biotype,
    /// 1-based, inclusive `(start, stop)`, sorted by start
    pub exons: Vec<(i64, i64)>,
}

impl TranscriptModel {
    fn new(rec: &GffRecord) -> Self {
        Self {
            chrom: rec.seqname.clone(),
            strand: rec.strand,
            gene_name: GeneSymbol::Missing,
            gene_type: Biotype::Missing,
            transcript_type: Biotype::Missing,
            exons: vec![],
        }
    }

    /// fill in whatever is still missing
    fn update_attributes(&mut self, rec: &GffRecord) {
        self.update_gene_attributes(rec);
        if self.transcript_type == Biotype::Missing {
            self.transcript_type = rec.transcript_type.clone();
        }
    }

    fn update_gene_attributes(&mut self, rec: &GffRecord) {
        if self.gene_name == GeneSymbol::Missing {
            self.gene_name = rec.gene_name.clone();
        }
        if self.gene_type == Biotype::Missing {
            self.gene_type = rec.gene_type.clone();
        }
    }

    /// gene name, or the gene id if the name is not annotated
    pub fn display_name(&self, gene_id: &str) -> Box<str> {
        match &self.gene_name {
            GeneSymbol::Symbol(x) => x.clone(),
            GeneSymbol::Missing => gene_id.into(),
        }
    }
}

/// `gene_id -> transcript_id -> TranscriptModel`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneStructure {
    pub genes: BTreeMap<Box<str>, BTreeMap<Box<str>, TranscriptModel>>,
}

#[derive(Serialize, Deserialize)]
struct CachedStructure {
    version: u32,
    structure: GeneStructure,
}

impl GeneStructure {
    /// Collect exons of each transcript. Records without gene or
    /// transcript IDs cannot be placed and are skipped. Gene name and
    /// biotypes come from any line of the transcript that carries them,
    /// then from the `gene` line.
    pub fn from_records(records: &[GffRecord]) -> Self {
        let mut genes: BTreeMap<Box<str>, BTreeMap<Box<str>, TranscriptModel>> = BTreeMap::new();
        let mut gene_lines: HashMap<&str, &GffRecord> = HashMap::new();

        for rec in records.iter() {
            if let (FeatureType::Gene, GeneId::Id(gid)) = (&rec.feature_type, &rec.gene_id) {
                gene_lines.entry(gid.as_ref()).or_insert(rec);
                continue;
            }

            let (GeneId::Id(gid), TranscriptId::Id(tid)) = (&rec.gene_id, &rec.transcript_id)
            else {
                continue;
            };

            match rec.feature_type {
                FeatureType::Exon | FeatureType::Transcript => {}
                _ => continue,
            }

            let model = genes
                .entry(gid.clone())
                .or_default()
                .entry(tid.clone())
                .or_insert_with(|| TranscriptModel::new(rec));

            model.update_attributes(rec);

            if rec.feature_type == FeatureType::Exon {
                model.exons.push((rec.start, rec.stop));
            }
        }

        // transcript lines without a single exon carry no structure
        genes.values_mut().for_each(|tx| tx.retain(|_, m| !m.exons.is_empty()));
        genes.retain(|_, tx| !tx.is_empty());

        genes.par_iter_mut().for_each(|(gid, tx)| {
            let gene_line = gene_lines.get(&**gid);
            for model in tx.values_mut() {
                if let Some(rec) = gene_line {
                    model.update_gene_attributes(rec);
                }
                model.exons.sort();
                model.exons.dedup();
            }
        });

        Self { genes }
    }

    /// Parse a GTF file and build the structure
    pub fn from_gtf(gtf_file: &str) -> anyhow::Result<Self> {
        let lines = read_lines_of_words_delim(gtf_file, &['\t'], -1)?.lines;
        let nlines = lines.len();
        let records = lines
            .into_par_iter()
            .filter_map(parse_gff)
            .collect::<Vec<_>>();

        if records.len() < nlines {
            warn!(
                "skipped {} malformed line(s) in {}",
                nlines - records.len(),
                gtf_file
            );
        }

        if records.is_empty() {
            return Err(anyhow::anyhow!("no GTF records found in {}", gtf_file));
        }

        info!("parsed {} records from {}", records.len(), gtf_file);
        Ok(Self::from_records(&records))
    }

    pub fn num_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn num_transcripts(&self) -> usize {
        self.genes.values().map(|tx| tx.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Visit every `(gene_id, transcript_id, model)`
    pub fn transcripts(&self) -> impl Iterator<Item = (&str, &str, &TranscriptModel)> {
        self.genes.iter().flat_map(|(gid, tx)| {
            tx.iter()
                .map(move |(tid, model)| (gid.as_ref(), tid.as_ref(), model))
        })
    }

    pub fn to_cache(&self, cache_file: &str) -> anyhow::Result<()> {
        let mut buf = open_buf_writer(cache_file)?;
        let cached = CachedStructure {
            version: CACHE_FORMAT_VERSION,
            structure: self.clone(),
        };
        serde_json::to_writer(&mut buf, &cached)?;
        buf.flush()?;
        Ok(())
    }

    pub fn from_cache(cache_file: &str) -> anyhow::Result<Self> {
        let buf = open_buf_reader(cache_file)?;
        let cached: CachedStructure = serde_json::from_reader(buf)?;
        if cached.version != CACHE_FORMAT_VERSION {
            return Err(anyhow::anyhow!(
                "cache format version {} != {}",
                cached.version,
                CACHE_FORMAT_VERSION
            ));
        }
        Ok(cached.structure)
    }

    /// Read the structure from `cache_file` if it is usable, otherwise
    /// parse `gtf_file` and try to refresh the cache.
    ///
    /// * `gtf_file` - gene annotation (gzipped or not)
    /// * `cache_file` - `None` disables caching
    /// * `rebuild` - ignore an existing cache
    pub fn load_or_build(
        gtf_file: &str,
        cache_file: Option<&str>,
        rebuild: bool,
    ) -> anyhow::Result<Self> {
        let Some(cache_file) = cache_file else {
            return Self::from_gtf(gtf_file);
        };

        if !rebuild && is_cache_fresh(gtf_file, cache_file) {
            match Self::from_cache(cache_file) {
                Ok(structure) => {
                    info!("read transcript structure from {}", cache_file);
                    return Ok(structure);
                }
                Err(e) => {
                    warn!("ignoring unreadable cache {}: {}", cache_file, e);
                }
            }
        }

        let structure = Self::from_gtf(gtf_file)?;

        match structure.to_cache(cache_file) {
            Ok(()) => info!("stored transcript structure in {}", cache_file),
            Err(e) => warn!("could not write cache {}: {}", cache_file, e),
        }

        Ok(structure)
    }
}

/// `genes.gtf.gz` -> `genes.gtf.structure.json.gz`,
/// `genes.gtf` -> `genes.structure.json.gz`
pub fn default_cache_file(gtf_file: &str) -> Box<str> {
    format!("{}.{}", strip_extension(gtf_file), CACHE_SUFFIX).into_boxed_str()
}

fn is_cache_fresh(gtf_file: &str, cache_file: &str) -> bool {
    let modified = |x: &str| std::fs::metadata(Path::new(x)).and_then(|m| m.modified());
    match (modified(gtf_file), modified(cache_file)) {
        (Ok(gtf_time), Ok(cache_time)) => cache_time >= gtf_time,
        (Err(_), Ok(_)) => true,
        _ => false,
    }
}
