use clap::{value_parser, Arg, ArgAction, Command as ClapCommand};
use std::process;
use log::error;

use stormkit::utils::logger::Logger;
use stormkit::commands::{CommandFactory, StormkitCommandFactory};

fn main() {
    let matches = ClapCommand::new("StormKit")
        .version("0.1")
        .about("Storm water depth raster analysis and vectorization")
        .arg(
            Arg::new("input")
                .help("Input raster, folder (--merge) or points GeoJSON (--squares)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("polygons")
                .long("polygons")
                .help("Extract classified depth polygons as GeoJSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("points")
                .long("points")
                .help("Extract depth points as GeoJSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("merge")
                .long("merge")
                .help("Merge all GeoTIFF tiles in the input folder")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("render")
                .long("render")
                .help("Render the raster to a PNG image")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("squares")
                .long("squares")
                .help("Convert a points GeoJSON to cell-sized squares")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output file (derived from the input name when omitted)")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("epsg")
                .long("epsg")
                .help("EPSG code to assume when the raster declares none")
                .value_name("CODE")
                .value_parser(value_parser!(u32))
                .required(false),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .help("Depth threshold in meters for points and rendering (default 0.1)")
                .value_name("METERS")
                .value_parser(value_parser!(f64))
                .required(false),
        )
        .arg(
            Arg::new("bins")
                .long("bins")
                .help("TOML file with custom depth intervals for --polygons")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("saturation")
                .long("saturation")
                .help("Clamp depths above this value before rendering")
                .value_name("METERS")
                .value_parser(value_parser!(f64))
                .required(false),
        )
        .arg(
            Arg::new("size")
                .long("size")
                .help("Square side length for --squares (estimated when omitted)")
                .value_name("UNITS")
                .value_parser(value_parser!(f64))
                .required(false),
        )
        .arg(
            Arg::new("compression")
                .long("compression")
                .help("Compression for the mosaic output (none, deflate, zstd)")
                .value_name("NAME")
                .required(false),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let logger = match Logger::new("stormkit.log", verbose) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = Logger::init_global_logger("stormkit-global.log", verbose) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = StormkitCommandFactory::new();

    let command_result = factory.create_command(&matches, &logger);
    match command_result {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
