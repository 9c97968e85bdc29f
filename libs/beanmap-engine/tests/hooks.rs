use beanmap_api::{Bean, ErrorKind, MapperError};
use beanmap_engine::{MapConfig, Mapper, MapperBuilder};

#[derive(Bean, Debug, Default, Clone)]
struct Source {
    pub x: String,
    pub y: String,
}

#[derive(Bean, Debug, Default, Clone, PartialEq)]
struct Destination {
    pub a: String,
    pub b: String,
    pub c: String,
}

fn mapper(
    configure: impl FnOnce(&mut MapConfig<'_, Source, Destination>) -> Result<(), MapperError>,
) -> Result<Mapper, MapperError> {
    Ok(MapperBuilder::new()
        .add_map::<Source, Destination, _>(configure)?
        .build_mapper())
}

fn source() -> Source {
    Source {
        x: "a".into(),
        y: "b".into(),
    }
}

#[test]
fn before_hooks_see_the_original_destination() {
    let mapper = mapper(|c| {
        c.before_map(|_, d| d.c = format!("{}{}", d.a, d.b))?
            .bind("x", "a")?
            .bind("y", "b")?;
        Ok(())
    })
    .unwrap();

    let mut destination = Destination {
        a: "aorig".into(),
        b: "borig".into(),
        c: String::new(),
    };
    mapper.map_into(&source(), &mut destination).unwrap();

    assert_eq!(destination.a, "a");
    assert_eq!(destination.b, "b");
    assert_eq!(destination.c, "aorigborig");
}

#[test]
fn after_hooks_see_the_bound_values() {
    let mapper = mapper(|c| {
        c.bind("x", "a")?
            .bind("y", "b")?
            .after_map(|_, d| d.c = format!("{}{}", d.a, d.b))?;
        Ok(())
    })
    .unwrap();

    let source = Source {
        x: "abc".into(),
        y: "xyz".into(),
    };
    let destination: Destination = mapper.map(&source).unwrap();
    assert_eq!(destination.c, "abcxyz");
}

#[test]
fn hooks_receive_the_source() {
    let mapper = mapper(|c| {
        c.before_map(|s, d| d.c = s.y.clone())?
            .after_map(|s, d| d.c.push_str(&s.x))?;
        Ok(())
    })
    .unwrap();

    let destination: Destination = mapper.map(&source()).unwrap();
    assert_eq!(destination.c, "ba");
}

#[test]
fn out_of_order_calls_fail_the_assembly() {
    let err = mapper(|c| {
        c.bind("x", "a")?.before_map(|_, _| {})?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapConfiguration);
    assert!(
        err.message.ends_with("before_map cannot follow a binding"),
        "{}",
        err.message
    );

    let err = mapper(|c| {
        c.after_map(|_, _| {})?.bind("y", "b")?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapConfiguration);
    assert!(err.message.starts_with("map "), "{}", err.message);

    let err = mapper(|c| {
        c.after_map(|_, _| {})?.before_map(|_, _| {})?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapConfiguration);
    assert!(err.message.ends_with("before_map cannot follow after_map"));
}
