use std::thread;

use beanmap_api::Bean;
use beanmap_engine::{Mapper, MapperBuilder, NameBasedConvention};

#[derive(Bean, Debug, Default, Clone)]
struct Order {
    pub id: u64,
    pub customer: String,
}

#[derive(Bean, Debug, Default, Clone)]
struct PriorityOrder {
    #[bean(parent)]
    pub order: Order,
    pub level: u8,
}

#[derive(Bean, Debug, Default, Clone, PartialEq)]
struct OrderDto {
    pub id: u64,
    pub customer: String,
    pub source: String,
}

#[derive(Bean, Debug, Default, Clone, PartialEq)]
struct OrderSummary {
    pub id: u64,
    pub customer: String,
}

fn mapper() -> Mapper {
    MapperBuilder::new()
        .add_map::<Order, OrderDto, _>(|c| {
            c.bind("id", "id")?
                .bind("customer", "customer")?
                .bind_constant(String::from("order"), |d: &mut OrderDto, v| d.source = v)?;
            Ok(())
        })
        .unwrap()
        .add_map::<PriorityOrder, OrderDto, _>(|c| {
            c.bind_function(|s: &PriorityOrder| s.order.id, |d: &mut OrderDto, id| d.id = id)?
                .bind_function(
                    |s: &PriorityOrder| format!("priority {}", s.level),
                    |d: &mut OrderDto, v| d.source = v,
                )?;
            Ok(())
        })
        .unwrap()
        .add_map_any_by_convention(NameBasedConvention::strict_match())
        .unwrap()
        .build_mapper()
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Dto(OrderDto),
    Summary(OrderSummary),
}

fn run(mapper: &Mapper, i: u64) -> Outcome {
    let order = Order {
        id: i,
        customer: format!("c{i}"),
    };
    match i % 3 {
        0 => Outcome::Dto(mapper.map(&order).unwrap()),
        1 => Outcome::Dto(
            mapper
                .map(&PriorityOrder {
                    order,
                    level: (i % 5) as u8,
                })
                .unwrap(),
        ),
        _ => Outcome::Summary(mapper.map(&order).unwrap()),
    }
}

#[test]
fn concurrent_mapping_matches_sequential_results() {
    let expected: Vec<Outcome> = {
        let sequential = mapper();
        (0..300).map(|i| run(&sequential, i)).collect()
    };

    let shared = mapper();
    let shared = &shared;
    let results: Vec<Vec<Outcome>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(move || (0..300).map(|i| run(shared, i)).collect::<Vec<_>>()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for outcome in results {
        assert_eq!(outcome, expected);
    }
}

#[test]
fn selections_for_overlapping_pairs_are_consistent() {
    let shared = mapper();
    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for i in 0..100 {
                    let dto: OrderDto = shared
                        .map(&PriorityOrder {
                            order: Order::default(),
                            level: (i % 5) as u8,
                        })
                        .unwrap();
                    assert_eq!(dto.source, format!("priority {}", i % 5));

                    let dto: OrderDto = shared.map(&Order::default()).unwrap();
                    assert_eq!(dto.source, "order");
                }
            });
        }
    });
}
