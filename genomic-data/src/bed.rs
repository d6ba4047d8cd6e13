use crate::common_io::read_lines_of_words_delim;
use crate::strand::Strand;

use coitrees::{COITree, Interval, IntervalTree};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// BED6 record: 0-based `start`, exclusive `stop`
#[derive(Debug, Hash, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BedRecord {
    pub chr: Box<str>,
    pub start: i64,
    pub stop: i64,
    pub name: Box<str>,
    pub strand: Strand,
}

/// six tab-separated columns; score is always `.`
impl std::fmt::Display for BedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t.\t{}",
            self.chr, self.start, self.stop, self.name, self.strand
        )
    }
}

impl BedRecord {
    pub fn is_empty(&self) -> bool {
        self.stop <= self.start
    }

    /// number of distinct names packed in the name column
    pub fn num_names(&self, delim: char) -> usize {
        self.name
            .split(delim)
            .filter(|x| !x.is_empty())
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn same_interval(&self, other: &Self) -> bool {
        self.chr == other.chr
            && self.start == other.start
            && self.stop == other.stop
            && self.strand == other.strand
    }
}

/// parse a BED6 line; the score column is ignored
pub fn parse_bed(words: Vec<Box<str>>) -> Option<BedRecord> {
    const NUM_FIELDS: usize = 6;

    if words.len() < NUM_FIELDS {
        return None;
    }

    Some(BedRecord {
        chr: words[0].clone(),
        start: words[1].parse::<i64>().ok()?,
        stop: words[2].parse::<i64>().ok()?,
        name: words[3].clone(),
        strand: Strand::parse(words[5].as_ref())?,
    })
}

/// read BED6 records, skipping lines that do not parse
pub fn read_bed_record_vec(file_path: &str) -> anyhow::Result<Vec<BedRecord>> {
    let lines_of_words = read_lines_of_words_delim(file_path, &['\t'], -1)?.lines;

    Ok(lines_of_words
        .into_par_iter()
        .filter_map(parse_bed)
        .collect::<Vec<_>>())
}

/// sort by chromosome, start, stop and strand
pub fn sort_bed(records: &mut [BedRecord]) {
    let key = |x: &BedRecord| (x.chr.clone(), x.start, x.stop, x.strand);
    if records.len() > 100_000 {
        records.par_sort_by_cached_key(key);
    } else {
        records.sort_by_cached_key(key);
    }
}

fn join_distinct(names: BTreeSet<Box<str>>, delim: char) -> Box<str> {
    names
        .into_iter()
        .collect::<Vec<_>>()
        .join(&delim.to_string())
        .into_boxed_str()
}

/// Strand-aware merge of overlapping or nearby intervals
///
/// Within a chromosome and strand, a record joins the current cluster
/// if it starts no more than `max_distance` after the cluster ends.
/// The merged name lists the distinct member names, sorted, separated
/// by `delim`.
///
/// * `records` - BED records in any order
/// * `max_distance` - largest gap that still merges (`0`: overlapping
///   or adjacent records only)
/// * `delim` - separator of the merged names
pub fn merge_bed(records: &[BedRecord], max_distance: i64, delim: char) -> Vec<BedRecord> {
    let mut sorted = records
        .iter()
        .filter(|x| !x.is_empty())
        .collect::<Vec<_>>();
    sorted.sort_by(|a, b| {
        (&a.chr, a.strand, a.start, a.stop).cmp(&(&b.chr, b.strand, b.start, b.stop))
    });

    let mut ret = Vec::with_capacity(sorted.len());
    let mut current: Option<(BedRecord, BTreeSet<Box<str>>)> = None;

    for rec in sorted {
        let joins = matches!(&current, Some((cluster, _))
            if cluster.chr == rec.chr
                && cluster.strand == rec.strand
                && rec.start <= cluster.stop.saturating_add(max_distance));

        if joins {
            if let Some((cluster, names)) = current.as_mut() {
                cluster.stop = cluster.stop.max(rec.stop);
                names.extend(rec.name.split(delim).map(Box::from));
            }
        } else {
            if let Some((mut cluster, names)) = current.take() {
                cluster.name = join_distinct(names, delim);
                ret.push(cluster);
            }
            let names = rec.name.split(delim).map(Box::from).collect();
            current = Some((rec.clone(), names));
        }
    }

    if let Some((mut cluster, names)) = current {
        cluster.name = join_distinct(names, delim);
        ret.push(cluster);
    }

    sort_bed(&mut ret);
    ret
}

/// Collapse records sharing the same chromosome, start, stop and
/// strand into one, keeping the distinct names separated by `delim`
pub fn group_bed(records: &[BedRecord], delim: char) -> Vec<BedRecord> {
    let mut sorted = records.to_vec();
    sort_bed(&mut sorted);

    let mut ret: Vec<BedRecord> = Vec::with_capacity(sorted.len());
    let mut names: BTreeSet<Box<str>> = BTreeSet::new();

    for rec in sorted {
        match ret.last_mut() {
            Some(prev) if prev.same_interval(&rec) => {
                names.insert(rec.name);
            }
            Some(prev) => {
                prev.name = join_distinct(std::mem::take(&mut names), delim);
                names.insert(rec.name.clone());
                ret.push(rec);
            }
            None => {
                names.insert(rec.name.clone());
                ret.push(rec);
            }
        }
    }

    if let Some(prev) = ret.last_mut() {
        prev.name = join_distinct(names, delim);
    }

    ret
}

type MaskTrees = HashMap<(Box<str>, Strand), COITree<(), u32>>;

fn to_coord(x: i64) -> anyhow::Result<i32> {
    i32::try_from(x).map_err(|_| anyhow::anyhow!("coordinate {} out of range", x))
}

/// interval trees of the mask, one per chromosome and strand
fn build_mask_trees(mask: &[BedRecord]) -> anyhow::Result<MaskTrees> {
    let mut nodes: HashMap<(Box<str>, Strand), Vec<Interval<()>>> = HashMap::new();
    for m in mask.iter().filter(|x| !x.is_empty()) {
        // coitrees intervals are end-inclusive
        let node = Interval::new(to_coord(m.start)?, to_coord(m.stop - 1)?, ());
        nodes.entry((m.chr.clone(), m.strand)).or_default().push(node);
    }

    Ok(nodes
        .into_iter()
        .map(|(k, v)| (k, COITree::new(&v)))
        .collect())
}

/// Strand-aware removal of every part of `records` covered by `mask`.
/// A record overlapping the middle of a mask interval gets split; a
/// fully covered record disappears. Names are kept.
pub fn subtract_bed(records: &[BedRecord], mask: &[BedRecord]) -> anyhow::Result<Vec<BedRecord>> {
    let trees = build_mask_trees(mask)?;

    let pieces = records
        .par_iter()
        .filter(|x| !x.is_empty())
        .map(|rec| -> anyhow::Result<Vec<BedRecord>> {
            let Some(tree) = trees.get(&(rec.chr.clone(), rec.strand)) else {
                return Ok(vec![rec.clone()]);
            };

            let mut covered: Vec<(i64, i64)> = vec![];
            tree.query(to_coord(rec.start)?, to_coord(rec.stop - 1)?, |node| {
                covered.push((node.first as i64, node.last as i64 + 1));
            });

            if covered.is_empty() {
                return Ok(vec![rec.clone()]);
            }
            covered.sort();

            let mut ret = vec![];
            let mut cursor = rec.start;
            for (lb, ub) in covered {
                if lb > cursor {
                    ret.push(BedRecord {
                        start: cursor,
                        stop: lb.min(rec.stop),
                        ..rec.clone()
                    });
                }
                cursor = cursor.max(ub);
                if cursor >= rec.stop {
                    break;
                }
            }
            if cursor < rec.stop {
                ret.push(BedRecord {
                    start: cursor,
                    ..rec.clone()
                });
            }
            Ok(ret)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(pieces.into_iter().flatten().collect())
}
