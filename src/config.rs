use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use serfig::collectors::{from_file, from_self};
use serfig::parsers::Toml;

#[derive(Debug, Clone, Serialize, Deserialize, Parser, Default)]
#[clap(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Path to the configuration file
    #[arg(long, value_name = "FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Path to the sweep results CSV
    #[arg(long, value_name = "FILE", default_value = "results.csv")]
    pub results: PathBuf,

    /// Directory the chart images are written to
    #[arg(long, value_name = "DIR", default_value = "plots")]
    pub out_dir: PathBuf,
}

impl Config {
    pub fn load(arg_conf: Self) -> Result<Self, Box<dyn std::error::Error>> {
        let mut builder: serfig::Builder<Self> = serfig::Builder::default();

        if let Some(config_file) = &arg_conf.config_file {
            let path = config_file
                .to_str()
                .ok_or("config file path is not valid UTF-8")?;
            builder = builder.collect(from_file(Toml, path));
        }

        // Arguments override the file.
        builder = builder.collect(from_self(arg_conf));

        Ok(builder.build()?)
    }
}
