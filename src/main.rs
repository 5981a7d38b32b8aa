use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use kicad_spice::sexpr::to_kicad_string;
use kicad_spice::{Circuit, Config, Netlist, SExpr, Schema};

#[derive(Parser)]
#[command(name = "kicad_spice")]
#[command(about = "Writes a SPICE netlist for a KiCad schematic", long_about = None)]
#[command(version)]
struct Cli {
    /// KiCad 6 schematic
    #[arg(value_name = "SCHEMATIC")]
    input: PathBuf,

    /// Output file, stdout when missing
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Directory with .kicad_sym libraries, searched before KICAD6_SYMBOL_DIR
    #[arg(short = 'l', long = "lib", value_name = "LIBDIR")]
    symbol_paths: Vec<PathBuf>,

    /// Directory with SPICE models, searched before SPICE_LIB_DIR
    #[arg(short = 'm', long = "models", value_name = "MODELDIR")]
    model_paths: Vec<PathBuf>,

    /// Deck title, defaults to the title block or the file name
    #[arg(long)]
    title: Option<String>,

    /// Wrap the circuit into a subcircuit with this name
    #[arg(long, value_name = "NAME")]
    subckt: Option<String>,

    /// Net exported as a subcircuit port
    #[arg(long = "port", value_name = "NET", requires = "subckt")]
    ports: Vec<String>,

    /// Write the schematic back in KiCad's layout instead of a netlist
    #[arg(long)]
    format: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_log(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.try_init().ok();
}

fn title(cli: &Cli, schema: &Schema) -> String {
    if let Some(title) = &cli.title {
        return title.clone();
    }
    if !schema.title_block.title.is_empty() {
        return schema.title_block.title.clone();
    }
    cli.input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn netlist(cli: &Cli, input: &str) -> Result<String> {
    let schema = Schema::parse(input)
        .with_context(|| format!("Failed to parse schematic: {}", cli.input.display()))?;
    let config = Config::from_env().with_cli(&cli.symbol_paths, &cli.model_paths);
    let mut library = config.library();
    let mut registry = config.registry();

    let netlist = Netlist::new(&schema, &mut library).context("Failed to extract nets")?;
    let mut circuit = Circuit::from_netlist(
        &title(cli, &schema),
        &schema,
        &netlist,
        &mut library,
        &mut registry,
    )
    .context("Failed to generate the netlist")?;
    if let Some(name) = &cli.subckt {
        circuit = circuit.into_subcircuit(name.clone(), cli.ports.clone());
    }
    Ok(circuit.to_string())
}

fn write(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("Failed to write output: {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_log(cli.verbose);

    let input = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read schematic: {}", cli.input.display()))?;

    let text = if cli.format {
        let sexpr = SExpr::try_from(&input)
            .with_context(|| format!("Failed to parse schematic: {}", cli.input.display()))?;
        to_kicad_string(&sexpr)
    } else {
        netlist(&cli, &input)?
    };
    write(cli.output.as_deref(), &text)
}
