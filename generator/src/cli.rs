use std::path::PathBuf;

use clap::Parser;

use crate::generators::Generator;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(value_parser, help = "The Candid (.did) source file or URL")]
    pub input: String,

    #[arg(
        long,
        help = "Name of the service; defaults to the name in the file or the file stem"
    )]
    pub service_name: Option<String>,

    #[arg(
        long,
        default_value = "bindings",
        help = "Base module (namespace) the generated artifacts live in"
    )]
    pub namespace: String,

    #[arg(
        long,
        default_value = "dt_candid_runtime",
        help = "Path of the runtime providing the agent and value codec"
    )]
    pub runtime: String,

    #[arg(long, value_enum, default_value_t = Generator::default())]
    pub generator: Generator,

    #[arg(
        long,
        help = "Write one file per artifact into this directory instead of printing to stdout"
    )]
    pub out_dir: Option<PathBuf>,

    #[arg(short, long, help = "Log every resolution step")]
    pub verbose: bool,
}
