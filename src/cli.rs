use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Reports gpsd position fixes to a UDP tracking endpoint", long_about = None)]
pub struct Cli {
    /// Stop after this many seconds instead of running until killed.
    #[arg(long)]
    pub duration: Option<u64>,

    #[arg(short, long, default_value_t = log::LevelFilter::Info)]
    pub logging_level: log::LevelFilter,

    #[arg(long)]
    pub config_file: std::path::PathBuf,
}
