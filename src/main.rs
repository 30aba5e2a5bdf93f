use clap::{Arg, ArgAction, Command};
use malha_fundiaria::pipeline::LocalPipeline;
use malha_fundiaria::remote::RemoteClient;
use std::fs::File;
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let matches = Command::new("malha-fundiaria")
        .version("1.0")
        .about("Classifies cadastral parcels by fiscal-module bands and emits map-ready GeoJSON")
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .num_args(1)
                .default_value("data")
                .help("Directory holding the dataset exports and municipality GeoJSON"),
        )
        .arg(
            Arg::new("regiao")
                .short('r')
                .long("regiao")
                .num_args(1)
                .help("Administrative region to filter by; omit to list regions"),
        )
        .arg(
            Arg::new("municipio")
                .short('m')
                .long("municipio")
                .num_args(1)
                .help("Municipality to filter by; takes precedence over --regiao when both are given"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .num_args(1)
                .help("Write the GeoJSON here instead of stdout"),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .action(ArgAction::SetTrue)
                .help("Print the data-quality counters"),
        )
        .arg(
            Arg::new("remote")
                .long("remote")
                .num_args(1)
                .help("Base URL of the microservice; fetches pre-classified data instead of reading the CSV"),
        )
        .get_matches();

    let regiao = matches.get_one::<String>("regiao").cloned();
    let municipio = matches.get_one::<String>("municipio").cloned();
    let output = matches.get_one::<String>("output").map(PathBuf::from);

    let result = if let Some(base_url) = matches.get_one::<String>("remote") {
        run_remote(base_url, regiao, municipio, output)
    } else {
        let data_dir = PathBuf::from(matches.get_one::<String>("data-dir").unwrap());
        run_local(
            &data_dir,
            regiao,
            municipio,
            output,
            matches.get_flag("stats"),
        )
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_local(
    data_dir: &std::path::Path,
    regiao: Option<String>,
    municipio: Option<String>,
    output: Option<PathBuf>,
    stats: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = LocalPipeline::load(data_dir)?;

    if stats {
        let counts = pipeline.counts();
        println!("Rows loaded:              {}", counts.total_loaded);
        println!("Valid for classification: {}", counts.valid_for_classification);
        println!("Valid for interactive:    {}", counts.valid_for_interactive);
        println!("Valid for contextual:     {}", counts.valid_for_contextual);
        println!("Discarded:                {}", counts.discarded);
        println!("Geometries dropped:       {}", pipeline.prep_stats().dropped);
    }

    let collection = match (&regiao, &municipio) {
        (None, None) => {
            for r in pipeline.regioes() {
                println!("{r}");
            }
            return Ok(());
        }
        (_, Some(m)) => pipeline.geojson_por_municipio(m),
        (Some(r), None) => pipeline.geojson_por_regiao(r),
    };

    match collection {
        Some(collection) => write_geojson(&serde_json::to_value(&collection)?, output),
        None => {
            println!("No geometries matched the selected filter.");
            Ok(())
        }
    }
}

fn run_remote(
    base_url: &str,
    regiao: Option<String>,
    municipio: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = RemoteClient::new(base_url);

    let payload = match (&regiao, &municipio) {
        (None, None) => {
            for r in client.regioes()? {
                println!("{r}");
            }
            return Ok(());
        }
        (Some(r), None) => {
            for m in client.municipios(r)? {
                println!("{m}");
            }
            client.geojson_por_regiao(r)?
        }
        (_, Some(m)) => client.geojson_por_municipio(m)?,
    };

    match payload {
        Some(payload) => write_geojson(&payload, output),
        None => {
            println!("No geometries matched the selected filter.");
            Ok(())
        }
    }
}

fn write_geojson(
    payload: &serde_json::Value,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            let file = File::create(&path)?;
            serde_json::to_writer_pretty(file, payload)?;
            println!("Wrote {}", path.display());
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), payload)?;
            println!();
        }
    }
    Ok(())
}
