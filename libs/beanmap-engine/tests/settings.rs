use std::fs;

use beanmap_api::{Bean, ErrorKind};
use beanmap_engine::{MapperBuilder, MapperConfig};
use tempfile::tempdir;

#[derive(Bean, Debug, Default, Clone)]
struct Sample {
    pub name: String,
    pub count: i32,
}

#[derive(Bean, Debug, Default, Clone, PartialEq)]
struct SampleView {
    pub name: String,
    pub count: i64,
}

#[test]
fn settings_file_configures_the_mapper() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mapper.toml");
    fs::write(
        &path,
        r#"
[any_by_convention]
flattening = false

[converters]
numbers = true
"#,
    )
    .unwrap();

    let config = MapperConfig::load(path.to_str().unwrap()).unwrap();
    assert!(config.converters.numbers);

    let mapper = MapperBuilder::new()
        .with_config(&config)
        .unwrap()
        .add_map::<Sample, SampleView, _>(|c| {
            c.bind("count", "count")?;
            Ok(())
        })
        .unwrap()
        .build_mapper();

    let sample = Sample {
        name: "n".into(),
        count: 5,
    };
    let view: SampleView = mapper.map(&sample).unwrap();
    assert_eq!(view.count, 5);
    assert_eq!(view.name, "", "declared map binds count only");

    let copy: Sample = mapper.map(&sample).unwrap();
    assert_eq!(copy.name, "n");
    assert_eq!(copy.count, 5);
}

#[test]
fn unsupported_options_in_file_fail_the_assembly() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mapper.toml");
    fs::write(&path, "[any_by_convention]\nflattening = true\n").unwrap();

    let config = MapperConfig::load(path.to_str().unwrap()).unwrap();
    let err = MapperBuilder::new().with_config(&config).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedConventionOption);
}

#[test]
fn unreadable_or_malformed_files_are_configuration_errors() {
    let dir = tempdir().unwrap();

    let missing = dir.path().join("absent.toml");
    let err = MapperConfig::load(missing.to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapConfiguration);
    assert!(err.message.contains("absent.toml"), "{}", err.message);

    let malformed = dir.path().join("bad.toml");
    fs::write(&malformed, "[converters]\nnumbers = \"yes\"\n").unwrap();
    let err = MapperConfig::load(malformed.to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapConfiguration);
    assert!(err.message.contains("bad.toml"), "{}", err.message);

    let unknown = dir.path().join("unknown.toml");
    fs::write(&unknown, "[any_by_convention]\nbogus = true\n").unwrap();
    let err = MapperConfig::load(unknown.to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapConfiguration);
}
