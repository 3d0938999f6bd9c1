//! Vehicle profile catalog
//!
//! A fixed set of routing profiles, resolvable by name or through the aggregate
//! names `all` and `motorvehicle(s)`. Each profile turns OSM way tags into
//! access and speed for that vehicle.

use std::fmt;

use crate::osm::tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vehicle {
    Bicycle,
    BigTruck,
    Bus,
    Car,
    Moped,
    MotorCycle,
    Pedestrian,
    SmallTruck,
}

/// Every profile in the catalog
pub const ALL: [Vehicle; 8] = [
    Vehicle::Bicycle,
    Vehicle::BigTruck,
    Vehicle::Bus,
    Vehicle::Car,
    Vehicle::Moped,
    Vehicle::MotorCycle,
    Vehicle::Pedestrian,
    Vehicle::SmallTruck,
];

/// The motorized subset
pub const MOTOR_VEHICLES: [Vehicle; 5] = [
    Vehicle::BigTruck,
    Vehicle::Bus,
    Vehicle::Car,
    Vehicle::MotorCycle,
    Vehicle::SmallTruck,
];

/// Aggregate names and what they expand to
pub const AGGREGATES: &[(&str, &[Vehicle])] = &[
    ("all", &ALL),
    ("motorvehicle", &MOTOR_VEHICLES),
    ("motorvehicles", &MOTOR_VEHICLES),
];

/// Result of evaluating a way for one vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayAccess {
    /// Can traverse along the way direction
    pub forward: bool,
    /// Can traverse against the way direction
    pub backward: bool,
    pub speed_kmh: f64,
}

impl Vehicle {
    pub fn name(&self) -> &'static str {
        match self {
            Vehicle::Bicycle => "bicycle",
            Vehicle::BigTruck => "bigtruck",
            Vehicle::Bus => "bus",
            Vehicle::Car => "car",
            Vehicle::Moped => "moped",
            Vehicle::MotorCycle => "motorcycle",
            Vehicle::Pedestrian => "pedestrian",
            Vehicle::SmallTruck => "smalltruck",
        }
    }

    pub fn from_name(name: &str) -> Option<Vehicle> {
        ALL.iter().copied().find(|v| v.name() == name)
    }

    pub fn is_motorized(&self) -> bool {
        MOTOR_VEHICLES.contains(self)
    }

    /// Access-tag keys from least to most specific. The most specific tag present wins.
    fn access_keys(&self) -> &'static [&'static str] {
        match self {
            Vehicle::Bicycle => &["access", "vehicle", "bicycle"],
            Vehicle::Pedestrian => &["access", "foot"],
            Vehicle::Car => &["access", "vehicle", "motor_vehicle", "motorcar"],
            Vehicle::Moped => &["access", "vehicle", "motor_vehicle", "moped"],
            Vehicle::MotorCycle => &["access", "vehicle", "motor_vehicle", "motorcycle"],
            Vehicle::Bus => &["access", "vehicle", "motor_vehicle", "psv", "bus"],
            Vehicle::SmallTruck => &["access", "vehicle", "motor_vehicle", "goods"],
            Vehicle::BigTruck => &["access", "vehicle", "motor_vehicle", "hgv"],
        }
    }

    /// Default speed for a highway class, `None` when the class is off-limits.
    fn highway_speed(&self, highway: &str) -> Option<f64> {
        match self {
            Vehicle::Pedestrian => match highway {
                "motorway" | "motorway_link" | "trunk" | "trunk_link" | "construction" => None,
                "primary" | "primary_link" | "secondary" | "secondary_link" | "tertiary"
                | "tertiary_link" | "unclassified" | "residential" | "service"
                | "living_street" | "road" | "track" | "path" | "footway" | "pedestrian"
                | "steps" | "cycleway" | "bridleway" => Some(5.0),
                _ => None,
            },
            Vehicle::Bicycle => match highway {
                "cycleway" => Some(18.0),
                "primary" | "primary_link" | "secondary" | "secondary_link" | "tertiary"
                | "tertiary_link" | "unclassified" | "residential" | "road" => Some(15.0),
                "service" | "living_street" | "track" | "path" => Some(12.0),
                "footway" | "pedestrian" => Some(6.0),
                _ => None,
            },
            _ => {
                let base = motor_speed(highway)?;
                let cap = match self {
                    Vehicle::Moped => {
                        if matches!(highway, "motorway" | "motorway_link" | "trunk" | "trunk_link") {
                            return None;
                        }
                        45.0
                    }
                    Vehicle::BigTruck => 80.0,
                    Vehicle::SmallTruck | Vehicle::Bus => 90.0,
                    _ => f64::MAX,
                };
                Some(base.min(cap))
            }
        }
    }

    /// Evaluate a way's tags. `None` means the way is not routable for this vehicle.
    pub fn evaluate(&self, tags: &[(String, String)]) -> Option<WayAccess> {
        let highway = tag(tags, "highway")?;
        let mut speed = self.highway_speed(highway)?;

        let mut allowed = true;
        for key in self.access_keys() {
            if let Some(value) = tag(tags, key) {
                allowed = !matches!(value, "no" | "private");
            }
        }
        if !allowed {
            return None;
        }

        if self.is_motorized() {
            if let Some(maxspeed) = tag(tags, "maxspeed").and_then(|v| v.trim().parse::<f64>().ok()) {
                if maxspeed > 0.0 {
                    speed = speed.min(maxspeed);
                }
            }
        }

        let (forward, backward) = self.direction(highway, tags);
        if !forward && !backward {
            return None;
        }

        Some(WayAccess {
            forward,
            backward,
            speed_kmh: speed,
        })
    }

    fn direction(&self, highway: &str, tags: &[(String, String)]) -> (bool, bool) {
        if *self == Vehicle::Pedestrian {
            return (true, true);
        }
        if *self == Vehicle::Bicycle && tag(tags, "oneway:bicycle") == Some("no") {
            return (true, true);
        }

        match tag(tags, "oneway") {
            Some("yes" | "true" | "1") => (true, false),
            Some("-1" | "reverse") => (false, true),
            Some("no") => (true, true),
            _ => {
                let implicit = matches!(highway, "motorway" | "motorway_link")
                    || tag(tags, "junction") == Some("roundabout");
                (true, !implicit)
            }
        }
    }
}

fn motor_speed(highway: &str) -> Option<f64> {
    match highway {
        "motorway" => Some(120.0),
        "motorway_link" | "trunk_link" | "primary_link" => Some(70.0),
        "trunk" | "primary" => Some(90.0),
        "secondary" | "tertiary" => Some(70.0),
        "secondary_link" | "tertiary_link" | "unclassified" => Some(50.0),
        "residential" | "service" | "road" => Some(30.0),
        "living_street" => Some(5.0),
        _ => None,
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of resolving one element of a vehicle list
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    One(Vehicle),
    Many(&'static [Vehicle]),
}

/// Resolve a single lower-case name against the catalog and the aggregate table.
pub fn resolve(name: &str) -> Option<Resolved> {
    if let Some(vehicle) = Vehicle::from_name(name) {
        return Some(Resolved::One(vehicle));
    }
    AGGREGATES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, members)| Resolved::Many(*members))
}

/// Resolve a comma-separated vehicle list.
///
/// Elements are lower-cased and trimmed, empty elements skipped and duplicates
/// dropped (first occurrence wins). On failure returns the offending element.
pub fn resolve_list(value: &str) -> std::result::Result<Vec<Vehicle>, String> {
    fn push(v: Vehicle, out: &mut Vec<Vehicle>) {
        if !out.contains(&v) {
            out.push(v);
        }
    }

    let lowered = value.to_lowercase();
    let mut vehicles = Vec::new();

    for element in lowered.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match resolve(element) {
            Some(Resolved::One(v)) => push(v, &mut vehicles),
            Some(Resolved::Many(members)) => {
                for v in members {
                    push(*v, &mut vehicles);
                }
            }
            None => return Err(element.to_string()),
        }
    }

    Ok(vehicles)
}
