//! Payload layout of world and player files.

use std::collections::{BTreeSet, HashMap};

use chrono::DateTime;
use log::warn;
use uuid::Uuid;

use super::data_types::{CodecError, DataType, ErrorReason};
use super::record::{RecordBuilder, RecordReader};
use crate::config::Settings;
use crate::flags::{Flag, FlagContainer, FlagKind, FlagValue, Location, Owner, TrustLevel, TrustTable};
use crate::geometry::{Bounds, Point};
use crate::player::{PlayerData, PlayerId};
use crate::region::{Region, RegionId};
use crate::world::WorldData;

fn invalid(data_type: &'static str, reason: impl Into<String>) -> CodecError {
    CodecError::Decoding(
        DataType::Other(data_type),
        ErrorReason::InvalidFormat(reason.into()),
    )
}

fn kind_id(kind: FlagKind) -> u8 {
    match kind {
        FlagKind::Boolean => 0,
        FlagKind::Trust => 1,
        FlagKind::Text => 2,
        FlagKind::Command => 3,
        FlagKind::Filter => 4,
        FlagKind::Location => 5,
    }
}

fn write_point(builder: &mut RecordBuilder, p: Point) -> Result<(), CodecError> {
    builder
        .append_varint(p.x)?
        .append_varint(p.y)?
        .append_varint(p.z)?;
    Ok(())
}

fn read_point(reader: &mut RecordReader<'_>) -> Result<Point, CodecError> {
    Ok(Point::new(
        reader.read_varint()?,
        reader.read_varint()?,
        reader.read_varint()?,
    ))
}

fn write_value(builder: &mut RecordBuilder, value: &FlagValue) -> Result<(), CodecError> {
    builder.append(&kind_id(value.kind()))?;
    match value {
        FlagValue::Boolean(allowed) => {
            builder.append(allowed)?;
        }
        FlagValue::Trust(table) => {
            builder
                .append(&table.public.id())?
                .append_len(table.players.len())?;
            for (player, level) in &table.players {
                builder.append_uuid(player)?.append(&level.id())?;
            }
        }
        FlagValue::Text(text) | FlagValue::Command(text) => {
            builder.append(text)?;
        }
        FlagValue::Filter(entries) => {
            builder.append_len(entries.len())?;
            for entry in entries {
                builder.append(entry)?;
            }
        }
        FlagValue::Location(location) => {
            builder.append(&location.is_some())?;
            if let Some(location) = location {
                builder.append(&location.world)?;
                write_point(builder, location.point)?;
            }
        }
    }
    Ok(())
}

fn read_trust_level(reader: &mut RecordReader<'_>) -> Result<TrustLevel, CodecError> {
    let id: u8 = reader.read()?;
    TrustLevel::from_id(id).ok_or_else(|| invalid("TrustLevel", format!("unknown level {id}")))
}

fn read_value(reader: &mut RecordReader<'_>) -> Result<FlagValue, CodecError> {
    let kind: u8 = reader.read()?;
    let value = match kind {
        0 => FlagValue::Boolean(reader.read()?),
        1 => {
            let public = read_trust_level(reader)?;
            let mut table = TrustTable {
                public,
                ..Default::default()
            };
            for _ in 0..reader.read_len()? {
                let player: Uuid = reader.read()?;
                table.players.insert(player, read_trust_level(reader)?);
            }
            FlagValue::Trust(table)
        }
        2 => FlagValue::Text(reader.read()?),
        3 => FlagValue::Command(reader.read()?),
        4 => {
            let mut entries = BTreeSet::new();
            for _ in 0..reader.read_len()? {
                entries.insert(reader.read::<String>()?);
            }
            FlagValue::Filter(entries)
        }
        5 => {
            let location = if reader.read::<bool>()? {
                Some(Location {
                    world: reader.read()?,
                    point: read_point(reader)?,
                })
            } else {
                None
            };
            FlagValue::Location(location)
        }
        other => return Err(invalid("FlagValue", format!("unknown kind {other}"))),
    };
    Ok(value)
}

pub(super) fn write_container(
    builder: &mut RecordBuilder,
    container: &FlagContainer,
) -> Result<(), CodecError> {
    match container.owner() {
        Owner::Admin => {
            builder.append(&false)?;
        }
        Owner::Player(id) => {
            builder.append(&true)?.append_uuid(&id)?;
        }
    }

    builder.append_len(container.co_owners().len())?;
    for co_owner in container.co_owners() {
        builder.append_uuid(co_owner)?;
    }

    let flags: Vec<(Flag, &FlagValue)> = container.iter().collect();
    builder.append_len(flags.len())?;
    for (flag, value) in flags {
        builder.append_str(flag.name())?;
        write_value(builder, value)?;
    }
    Ok(())
}

/// Flags this server no longer knows, or whose kind changed, are dropped with a warning.
pub(super) fn read_container(reader: &mut RecordReader<'_>) -> Result<FlagContainer, CodecError> {
    let owner = if reader.read::<bool>()? {
        Owner::Player(reader.read()?)
    } else {
        Owner::Admin
    };
    let mut container = FlagContainer::new(owner);

    for _ in 0..reader.read_len()? {
        container.add_co_owner(reader.read()?);
    }

    for _ in 0..reader.read_len()? {
        let name: String = reader.read()?;
        let value = read_value(reader)?;
        match Flag::from_name(&name) {
            Some(flag) => {
                if let Err(e) = container.set(flag, value) {
                    warn!("Dropping stored flag '{name}': {e}");
                }
            }
            None => warn!("Skipping unknown flag '{name}'"),
        }
    }
    Ok(container)
}

fn write_region(builder: &mut RecordBuilder, region: &Region) -> Result<(), CodecError> {
    builder.append_varlong(region.id().0 as i64)?;
    builder.append(&region.name().is_some())?;
    if let Some(name) = region.name() {
        builder.append_str(name)?;
    }
    builder.append(&region.priority())?;
    write_point(builder, region.bounds().min)?;
    write_point(builder, region.bounds().max)?;
    builder.append(&region.parent().is_some())?;
    if let Some(parent) = region.parent() {
        builder.append_varlong(parent.0 as i64)?;
    }
    builder.append(&region.recently_stolen())?;
    write_container(builder, region.flags())
}

fn read_region(reader: &mut RecordReader<'_>, world: &str) -> Result<Region, CodecError> {
    let id = RegionId(reader.read_varlong()? as u64);
    let name = if reader.read::<bool>()? {
        Some(reader.read::<String>()?)
    } else {
        None
    };
    let priority: u8 = reader.read()?;
    let bounds = Bounds::from_corners(read_point(reader)?, read_point(reader)?);
    let parent = if reader.read::<bool>()? {
        Some(RegionId(reader.read_varlong()? as u64))
    } else {
        None
    };
    let recently_stolen: bool = reader.read()?;
    let flags = read_container(reader)?;

    let mut region = Region::new(id, world, bounds, flags);
    region.set_name(name);
    region.set_priority(priority);
    region.set_parent(parent);
    region.set_recently_stolen(recently_stolen);
    Ok(region)
}

/// Regions are written top-level first, each followed by its subdivisions, so parents always
/// precede their children.
pub(super) fn write_world(builder: &mut RecordBuilder, world: &WorldData) -> Result<(), CodecError> {
    let mut ordered: Vec<&Region> = Vec::with_capacity(world.regions().len());
    for top in world.top_level() {
        ordered.extend(world.region(*top));
        ordered.extend(
            world
                .descendants(*top)
                .into_iter()
                .filter_map(|child| world.region(child)),
        );
    }

    builder
        .append_str(world.name())?
        .append_varlong(world.next_id().0 as i64)?;
    write_container(builder, world.global())?;
    builder.append_len(ordered.len())?;
    for region in ordered {
        write_region(builder, region)?;
    }
    Ok(())
}

/// Rebuilds a world, hierarchy and lookup table included.
pub(super) fn read_world(
    reader: &mut RecordReader<'_>,
    settings: &Settings,
) -> Result<WorldData, CodecError> {
    let name: String = reader.read()?;
    let next_id = RegionId(reader.read_varlong()? as u64);
    let mut world = WorldData::new(&name, settings);
    *world.global_mut() = read_container(reader)?;

    for _ in 0..reader.read_len()? {
        let region = read_region(reader, &name)?;
        let id = region.id();
        if world.region(id).is_some() {
            return Err(invalid("Region", format!("duplicate region {id}")));
        }
        if let Some(parent) = region.parent() {
            let parent = world
                .region_mut(parent)
                .ok_or_else(|| invalid("Region", format!("{id} precedes its parent {parent}")))?;
            parent.children_mut().push(id);
        }
        world.insert(region);
    }

    world.reserve_ids(next_id);
    world.rebuild_lookup();
    Ok(world)
}

pub(super) fn write_players(
    builder: &mut RecordBuilder,
    players: &HashMap<PlayerId, PlayerData>,
) -> Result<(), CodecError> {
    let mut ordered: Vec<&PlayerData> = players.values().collect();
    ordered.sort_by_key(|data| data.id);

    builder.append_len(ordered.len())?;
    for data in ordered {
        builder
            .append_uuid(&data.id)?
            .append_varlong(data.claim_blocks)?
            .append(&data.last_login.is_some())?;
        if let Some(last_login) = data.last_login {
            builder.append_varlong(last_login.timestamp_millis())?;
        }
    }
    Ok(())
}

pub(super) fn read_players(
    reader: &mut RecordReader<'_>,
) -> Result<HashMap<PlayerId, PlayerData>, CodecError> {
    let mut players = HashMap::new();
    for _ in 0..reader.read_len()? {
        let id: Uuid = reader.read()?;
        let mut data = PlayerData::new(id, reader.read_varlong()?);
        if reader.read::<bool>()? {
            let millis = reader.read_varlong()?;
            data.last_login = Some(
                DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| invalid("Timestamp", format!("{millis} is out of range")))?,
            );
        }
        players.insert(id, data);
    }
    Ok(players)
}
