//! End-to-end run of the local pipeline over a scratch dataset directory.

use std::path::PathBuf;

use malha_fundiaria::pipeline::LocalPipeline;

const WKT_SQUARE: &str =
    "POLYGON ((550000 9580000, 551000 9580000, 551000 9581000, 550000 9581000, 550000 9580000))";

fn scratch_dataset(tag: &str, rows: &[String]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "malha-fundiaria-e2e-{}-{}",
        tag,
        std::process::id()
    ));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();

    let mut contents = String::from(
        "modulo_fiscal,area,geom,nome_municipio,regiao_administrativa,imovel\n",
    );
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    std::fs::write(
        dir.join("dataset-malha-fundiaria-idace_preprocessado-2024-06-01.csv"),
        contents,
    )
    .unwrap();
    dir
}

#[test]
fn one_small_parcel_filters_by_region() {
    let dir = scratch_dataset(
        "region",
        &[
            format!("10,5,\"{WKT_SQUARE}\",Fortaleza,X,Sítio Alegre"),
            // No geometry text: dropped before loading, invisible to counters.
            "10,5,,Fortaleza,X,sem-geometria".to_string(),
        ],
    );
    let pipeline = LocalPipeline::load(&dir).unwrap();

    let counts = pipeline.counts();
    assert_eq!(counts.total_loaded, 1);
    assert_eq!(counts.valid_for_classification, 1);
    assert_eq!(counts.valid_for_interactive, 1);
    assert_eq!(counts.discarded, 0);

    let collection = pipeline.geojson_por_regiao("X").expect("region X has data");
    assert_eq!(collection.features.len(), 1);
    let props = collection.features[0].properties.as_ref().unwrap();
    assert_eq!(props["categoria"], "Small Property < 1 Fiscal Module");
    assert_eq!(props["imovel"], "Sítio Alegre");
    assert!(!props.contains_key("geom"));

    assert!(pipeline.geojson_por_regiao("Y").is_none());
}

#[test]
fn municipality_filter_goes_through_the_normalized_key() {
    let dir = scratch_dataset(
        "muni",
        &[
            format!("10,50,\"{WKT_SQUARE}\",Maracanaú,X,A"),
            format!("10,50,\"{WKT_SQUARE}\",Sobral,X,B"),
        ],
    );
    let pipeline = LocalPipeline::load(&dir).unwrap();

    let collection = pipeline
        .geojson_por_municipio("MARACANAU")
        .expect("accent-insensitive match");
    assert_eq!(collection.features.len(), 1);
    let props = collection.features[0].properties.as_ref().unwrap();
    assert_eq!(props["nome_municipio"], "Maracanaú");
    assert_eq!(props["categoria"], "Medium Property");
}

#[test]
fn bad_rows_are_counted_not_fatal() {
    let dir = scratch_dataset(
        "quality",
        &[
            format!("10,5,\"{WKT_SQUARE}\",Fortaleza,X,ok"),
            "10,5,\"POLYGON ((broken\",Fortaleza,X,bad-wkt".to_string(),
            format!(",5,\"{WKT_SQUARE}\",Fortaleza,X,no-module"),
        ],
    );
    let pipeline = LocalPipeline::load(&dir).unwrap();

    let counts = pipeline.counts();
    assert_eq!(counts.total_loaded, 3);
    assert_eq!(counts.valid_for_classification, 2);
    assert_eq!(counts.valid_for_interactive, 1);
    assert_eq!(counts.discarded, 1);
    assert_eq!(
        counts.total_loaded,
        counts.valid_for_classification + counts.discarded
    );
    assert_eq!(pipeline.prep_stats().dropped, 1);

    // The unclassifiable row still maps, it just stays unclassified.
    let collection = pipeline.geojson_por_regiao("X").unwrap();
    assert_eq!(collection.features.len(), 2);
    let labels: Vec<_> = collection
        .features
        .iter()
        .map(|f| f.properties.as_ref().unwrap()["categoria"].clone())
        .collect();
    assert!(labels.contains(&serde_json::json!("Small Property < 1 Fiscal Module")));
    assert!(labels.contains(&serde_json::json!("Unclassified")));
}

#[test]
fn map_center_falls_inside_the_region() {
    let dir = scratch_dataset(
        "center",
        &[format!("10,5,\"{WKT_SQUARE}\",Fortaleza,X,ok")],
    );
    let pipeline = LocalPipeline::load(&dir).unwrap();

    let center = pipeline.map_center_por_regiao("X").unwrap();
    assert!(center.x() < -35.0 && center.x() > -42.0, "lon {}", center.x());
    assert!(center.y() < 0.0 && center.y() > -8.0, "lat {}", center.y());

    match pipeline.map_center_por_regiao("Y") {
        Err(malha_fundiaria::Error::EmptyGeometrySet) => {}
        other => panic!("expected EmptyGeometrySet, got {other:?}"),
    }
}
