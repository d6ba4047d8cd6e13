//! Genomic data structures and parsers
//!
//! This library provides reusable genomic data structures including:
//! - GTF/GFF parsing and transcript structures
//! - BED records and interval algebra
//! - 3'-terminal and intronic regions of transcripts

pub mod bed;
pub mod common_io;
pub mod gff;
pub mod regions;
pub mod strand;
pub mod transcript;
