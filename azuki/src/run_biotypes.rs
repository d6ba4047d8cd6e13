use crate::common::*;

use genomic_data::gff::*;

#[derive(Args, Debug)]
pub struct BiotypesArgs {
    /// Gene annotation (`GTF`) file, gzipped or not
    #[arg(short = 'g', long = "gtf", required = true)]
    gtf_file: Box<str>,

    /// output file (`stdout` to print)
    #[arg(short, long, default_value = "stdout")]
    output: Box<str>,
}

pub fn run_biotypes(args: &BiotypesArgs) -> anyhow::Result<()> {
    info!("parsing GTF file: {}", args.gtf_file);
    let records = read_gff_record_vec(&args.gtf_file)?;

    if records.is_empty() {
        return Err(anyhow::anyhow!("no GTF records in {}", args.gtf_file));
    }

    let counts = count_biotypes(&records);
    info!("found {} biotype entries", counts.len());

    let mut lines: Vec<Box<str>> = vec!["kind\tbiotype\tgenes\ttranscripts".into()];
    lines.extend(counts.iter().map(|x| x.to_string().into_boxed_str()));

    io::write_lines(&lines, &args.output)?;
    Ok(())
}
