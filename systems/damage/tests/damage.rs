use std::time::Duration;

use bridge_keeper_core::{Command, Event, GridProvider, LevelLayout, TileCoord};
use bridge_keeper_system_damage::{Config, Damage};
use bridge_keeper_world::{self as world, query, World};

fn run(seed: u64, ticks: usize) -> (World, Vec<TileCoord>) {
    let mut world = World::new();
    let mut damage = Damage::new(Config::new(Duration::from_millis(250), seed));
    let mut struck = Vec::new();

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::LoadLevel {
            layout: Box::new(LevelLayout::reference()),
        },
        &mut events,
    );

    for _ in 0..ticks {
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(250),
            },
            &mut events,
        );

        let mut commands = Vec::new();
        damage.handle(&events, query::grid(&world), &mut commands);
        events.clear();

        for command in commands {
            if let Command::DamageTile { tile } = command {
                struck.push(tile);
            }
            world::apply(&mut world, command, &mut events);
        }
    }

    (world, struck)
}

#[test]
fn every_firing_targets_a_bridge_tile() {
    let reference = world_with_reference();
    let (_, struck) = run(7, 40);

    assert_eq!(struck.len(), 40);
    for tile in struck {
        assert!(
            query::grid(&reference).tile(tile).is_bridge(),
            "{tile:?} is not a bridge tile"
        );
    }
}

#[test]
fn same_seed_replays_identically() {
    let (first_world, first) = run(0x5eed, 60);
    let (second_world, second) = run(0x5eed, 60);

    assert_eq!(first, second);
    assert_eq!(query::grid(&first_world), query::grid(&second_world));
}

#[test]
fn damage_eventually_breaks_tiles() {
    let (_, struck) = run(3, 200);
    let (world, _) = run(3, 200);

    let broken = struck
        .iter()
        .filter(|tile| !query::grid(&world).tile(**tile).is_bridge())
        .count();
    assert!(broken > 0, "two hits on one base tile should break it");
}

fn world_with_reference() -> World {
    let mut world = World::new();
    let mut events: Vec<Event> = Vec::new();
    world::apply(
        &mut world,
        Command::LoadLevel {
            layout: Box::new(LevelLayout::reference()),
        },
        &mut events,
    );
    world
}
