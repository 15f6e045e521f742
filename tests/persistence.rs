use cactus_claims::{
    Actor, DataManager, Direction, Flag, FlagValue, Point, Settings, TrustLevel,
};
use uuid::Uuid;

const WORLD: &str = "world";

#[test]
fn test_claims_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        data_directory: dir.path().to_path_buf(),
        starting_claim_blocks: 1000,
        ..Settings::default()
    };

    let owner = Actor::player(Uuid::new_v4());
    let friend = Uuid::new_v4();
    let (claim, child, spawn) = {
        let manager = DataManager::new(settings.clone());
        manager.player_join(owner.id);
        let claim = manager
            .create_claim(WORLD, Point::new(0, 0, 0), Point::new(19, 0, 19), &owner)
            .unwrap();
        manager
            .expand(WORLD, claim, Direction::South, 5, &owner)
            .unwrap();
        let child = manager
            .create_subdivision(WORLD, claim, Point::new(2, 0, 2), Point::new(8, 0, 8), &owner)
            .unwrap();
        manager.trust(WORLD, claim, friend, TrustLevel::Container).unwrap();
        manager
            .set_flag(WORLD, child, Flag::Greeting, FlagValue::Text("Workshop".into()))
            .unwrap();

        let pending = manager.create_admin_region(
            "world_nether",
            Point::new(-30, 0, -30),
            Point::new(30, 0, 30),
            None,
        );
        let spawn = manager
            .register_region(pending, "spawn", 10, None, false, None)
            .unwrap();
        manager
            .set_global_flag("world_nether", Flag::Pvp, FlagValue::Boolean(false))
            .unwrap();

        manager.shutdown().unwrap();
        (claim, child, spawn)
    };

    let reloaded = DataManager::load(settings);
    assert_eq!(reloaded.world_names(), vec!["world", "world_nether"]);
    assert_eq!(reloaded.claim_blocks(owner.id), 1000 - 20 * 25);

    let region = reloaded.region(WORLD, claim).unwrap();
    assert_eq!(region.bounds().area(), 500);
    assert_eq!(region.children(), &[child]);
    assert_eq!(
        reloaded.trust_level_at(WORLD, Point::new(15, 0, 15), &Actor::player(friend)),
        TrustLevel::Container
    );

    let inside_child = Point::new(5, 0, 5);
    assert_eq!(
        reloaded.highest_priority_region_at(WORLD, inside_child).unwrap().id(),
        child
    );
    let flags = reloaded.flags_at(WORLD, inside_child).unwrap();
    assert_eq!(
        flags.get(Flag::Greeting),
        Some(&FlagValue::Text("Workshop".into()))
    );

    assert_eq!(
        reloaded.region_by_name("world_nether", "spawn").unwrap().id(),
        spawn
    );
    assert_eq!(
        reloaded.global_flags("world_nether").unwrap().get(Flag::Pvp),
        Some(&FlagValue::Boolean(false))
    );

    let next = reloaded
        .create_claim(WORLD, Point::new(100, 0, 100), Point::new(109, 0, 109), &owner)
        .unwrap();
    assert!(next > child);
}
