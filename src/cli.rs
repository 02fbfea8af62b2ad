use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Parcel layer compilation and ownership change tracking
#[derive(Parser, Debug)]
#[command(name = "landshift", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file; flags below override its values
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Working CRS (EPSG code) for area measurement
    #[arg(long, global = true)]
    pub work_crs: Option<u32>,

    /// Attribute holding the feature key
    #[arg(long, global = true)]
    pub key_field: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Flatten time-stamped polygons into a non-overlapping layer
    Compile(CompileArgs),

    /// Score how much of a prior layer survives in a current layer
    Compare(CompareArgs),

    /// Transfer an attribute from the best-overlapping reference polygon
    Join(JoinArgs),

    /// List parcels added and deleted between two snapshots
    Diff(DiffArgs),

    /// Download an ArcGIS REST feature layer
    #[cfg(feature = "download")]
    Download(DownloadArgs),
}

/// CRS of an input file; defaults to WGS84 for GeoJSON and the working CRS otherwise.
#[derive(Args, Debug, Clone, Default)]
pub struct InputCrs {
    /// EPSG code of the input layers
    #[arg(long)]
    pub input_crs: Option<u32>,
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Input layer (GeoJSON, Shapefile or CSV)
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output layer; format follows the extension
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Attribute that orders features, e.g. a last-update date
    #[arg(long)]
    pub precedence_field: Option<String>,

    /// Let older features win instead of newer ones
    #[arg(long)]
    pub oldest_first: bool,

    #[command(flatten)]
    pub crs: InputCrs,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Prior layer, one result record per feature
    #[arg(value_hint = ValueHint::FilePath)]
    pub prior: PathBuf,

    /// Current layer
    #[arg(value_hint = ValueHint::FilePath)]
    pub current: PathBuf,

    /// Output comparison layer
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Minimum scaled intersection area for a match
    #[arg(long)]
    pub area_tolerance: Option<f64>,

    /// Type weight as LABEL=WEIGHT; repeat to set several, replaces configured weights
    #[arg(long = "weight", value_parser = parse_weight)]
    pub weights: Vec<(String, f64)>,

    /// Ownership label variant; repeat to set several, replaces configured variants
    #[arg(long = "owner")]
    pub owners: Vec<String>,

    /// Treat every current feature as owned
    #[arg(long, conflicts_with = "owners")]
    pub any_owner: bool,

    /// Derive ownership percentages on the prior layer from this owned-area attribute
    #[arg(long)]
    pub owned_area_field: Option<String>,

    #[command(flatten)]
    pub crs: InputCrs,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct JoinArgs {
    /// Layer receiving the attribute
    #[arg(value_hint = ValueHint::FilePath)]
    pub layer: PathBuf,

    /// Layer the attribute is read from
    #[arg(value_hint = ValueHint::FilePath)]
    pub reference: PathBuf,

    /// Attribute to transfer
    #[arg(short, long)]
    pub attribute: String,

    /// Output layer
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    #[command(flatten)]
    pub crs: InputCrs,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Current snapshot
    #[arg(value_hint = ValueHint::FilePath)]
    pub current: PathBuf,

    /// Previous snapshot
    #[arg(value_hint = ValueHint::FilePath)]
    pub previous: PathBuf,

    /// Output directory for `added` and `deleted` layers
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Build keys from these attributes instead of the key field, e.g. --key-parts block --key-parts parcel
    #[arg(long)]
    pub key_parts: Vec<String>,

    /// Separator between composite key parts
    #[arg(long, default_value = "_")]
    pub separator: String,

    /// Output extension
    #[arg(long, default_value = "geojson")]
    pub format: String,

    #[command(flatten)]
    pub crs: InputCrs,

    /// Overwrite outputs if they exist
    #[arg(long)]
    pub force: bool,
}

#[cfg(feature = "download")]
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Service URL, e.g. https://host/arcgis/rest/services/Name/MapServer
    pub url: String,

    /// Layer id within the service
    pub layer_id: u32,

    /// Output layer
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Features per request
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,

    /// Attempts per request
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Accept TLS certificates that do not verify
    #[arg(long)]
    pub insecure: bool,

    /// Fail instead of writing a partial layer when pages are missing
    #[arg(long)]
    pub strict: bool,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub force: bool,
}

fn parse_weight(s: &str) -> Result<(String, f64), String> {
    let (label, weight) = s.split_once('=').ok_or_else(|| format!("expected LABEL=WEIGHT, got `{s}`"))?;
    let weight = weight.trim().parse::<f64>().map_err(|e| format!("bad weight in `{s}`: {e}"))?;
    Ok((label.trim().to_string(), weight))
}
