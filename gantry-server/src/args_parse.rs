use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "gantry-server")]
#[command(about = "Gantry cluster resource manager", long_about = None)]
pub(crate) struct Args {
    /// Path to config file
    #[arg(long)]
    pub(crate) config_file: String,

    /// Prometheus Exporter http address, overrides the config file
    #[arg(long)]
    pub(crate) prom_exporter: Option<String>,
}
