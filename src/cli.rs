use clap::Parser;
use log::LevelFilter;

use crate::process::Options;

#[derive(Parser, Debug)]
#[command(name = "shpbundle")]
#[command(version)]
#[command(about = "Find, validate and extract the Shapefile inside a ZIP archive", long_about = None)]
#[command(after_help = "Examples:\n  \
  shpbundle parcels.zip                     extract to the system temp directory\n  \
  shpbundle -n parcels.zip                  only check the bundle and list its parts\n  \
  shpbundle -s data/roads.shp export.zip    pick one of several shapefiles\n  \
  shpbundle -d /srv/in https://example.com/parcels.zip")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Create extraction directories under DIR (default: system temp dir)
    #[arg(short = 'd', value_name = "DIR")]
    pub tmp_dir: Option<String>,

    /// Exact entry name of the .shp to use when the archive has several
    #[arg(short = 's', long = "shapefile", value_name = "NAME")]
    pub shapefile: Option<String>,

    /// Validate only, do not extract
    #[arg(short = 'n', long = "no-extract")]
    pub no_extract: bool,

    /// Only report errors
    #[arg(short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log resolution and extraction details (-vv for trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn options(&self) -> Options {
        let mut options = Options::default().extract(!self.no_extract);
        if let Some(dir) = &self.tmp_dir {
            options = options.tmp_dir(dir);
        }
        if let Some(name) = &self.shapefile {
            options = options.primary_file_name(name);
        }
        options
    }

    pub fn log_level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Error,
            (false, 0) => LevelFilter::Warn,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        }
    }
}
