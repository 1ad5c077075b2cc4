use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the mgf and pout subdirectories (will over-write the config file)
    #[arg(short, long)]
    pub root_dir: Option<PathBuf>,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Name of the collection, used to name the output files
    #[arg(short, long)]
    pub name: Option<String>,

    /// Write a text plot of calibrated vs reference retention times
    #[arg(short, long)]
    pub plot: bool,
}
