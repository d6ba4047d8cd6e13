mod common;
mod run_biotypes;
mod run_prepare;

use crate::common::*;
use run_biotypes::*;
use run_prepare::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "AZUKI",
    long_about = "Prepare 3' UTR and intron regions from a GTF file\n\
		  for single-cell RNA-seq quantification.\n\
		  Set `RUST_LOG=info` to follow the progress.",
    term_width = 80
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Write 3' UTR and intron BED files",
        long_about = "Take the 3'-most exon and the introns of each selected transcript:\n\
		      (1) Extract transcript structures (cached next to the GTF)\n\
		      (2) Keep transcripts by biotype\n\
		      (3) Merge 3' regions per gene, drop regions shared by genes\n\
		      (4) Remove exonic parts of introns and collapse duplicates.\n"
    )]
    Prepare(PrepareArgs),

    #[command(
        about = "Count genes and transcripts per biotype",
        long_about = "Tabulate gene and transcript biotypes of a GTF file\n\
		      to help choose `--gene-types` of `prepare`.\n"
    )]
    Biotypes(BiotypesArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.commands {
        Commands::Prepare(args) => {
            run_prepare(args)?;
        }
        Commands::Biotypes(args) => {
            run_biotypes(args)?;
        }
    }

    Ok(())
}
