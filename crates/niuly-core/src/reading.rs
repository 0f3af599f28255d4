// ── Readings ──
//
// One reading per monitored telemetry field. A reading stores nothing but
// its identity: the value is projected from the coordinator cache each time
// it is asked for, and availability mirrors the last refresh outcome.

use serde::Serialize;
use serde_json::Value;
use strum::IntoEnumIterator;
use tokio::sync::watch;

use niuly_api::Telemetry;

use crate::coordinator::{Coordinator, CoordinatorState};

pub const MANUFACTURER: &str = "Niu Technologies";

// ── Classification ───────────────────────────────────────────────

/// Semantic class of a reading, as understood by home-automation hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    Battery,
    Distance,
    Speed,
    Temperature,
}

/// How successive values of a reading relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// Every reading is a diagnostic of the vehicle rather than a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityCategory {
    Diagnostic,
}

/// The monitored telemetry fields.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReadingKind {
    BatteryLevel,
    Range,
    Speed,
    Mileage,
    Temperature,
}

impl ReadingKind {
    /// Stable field key, also the suffix of the reading's unique id.
    pub fn key(self) -> String {
        self.to_string()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BatteryLevel => "Battery Level",
            Self::Range => "Range",
            Self::Speed => "Current Speed",
            Self::Mileage => "Total Mileage",
            Self::Temperature => "Temperature",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::BatteryLevel => "%",
            Self::Range | Self::Mileage => "km",
            Self::Speed => "km/h",
            Self::Temperature => "°C",
        }
    }

    pub fn device_class(self) -> DeviceClass {
        match self {
            Self::BatteryLevel => DeviceClass::Battery,
            Self::Range | Self::Mileage => DeviceClass::Distance,
            Self::Speed => DeviceClass::Speed,
            Self::Temperature => DeviceClass::Temperature,
        }
    }

    pub fn state_class(self) -> StateClass {
        match self {
            Self::Mileage => StateClass::TotalIncreasing,
            _ => StateClass::Measurement,
        }
    }

    /// Extract this field from a raw payload.
    ///
    /// Never fails: a missing payload, a missing field, or a field of the
    /// wrong shape all yield `None`.
    pub fn project(self, payload: Option<&Telemetry>) -> Option<f64> {
        let payload = payload?;
        let raw = match self {
            Self::BatteryLevel => payload.get("battery")?.get("level")?,
            Self::Range => payload.get("range")?,
            Self::Speed => payload.get("speed")?,
            Self::Mileage => payload.get("mileage")?,
            Self::Temperature => payload.get("temperature")?,
        };
        scalar(raw)
    }
}

/// Numbers pass through; numeric strings are parsed; everything else is absent.
fn scalar(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

// ── Device ───────────────────────────────────────────────────────

/// The physical vehicle all readings of one entry attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
}

impl DeviceInfo {
    pub fn for_vehicle(vehicle_id: &str) -> Self {
        Self {
            identifier: vehicle_id.to_owned(),
            name: format!("Niu Vehicle {vehicle_id}"),
            manufacturer: MANUFACTURER,
        }
    }
}

// ── Reading ──────────────────────────────────────────────────────

/// A typed view of one field of the coordinator cache.
#[derive(Clone)]
pub struct Reading {
    coordinator: Coordinator,
    kind: ReadingKind,
    unique_id: String,
}

impl Reading {
    pub fn new(coordinator: Coordinator, kind: ReadingKind) -> Self {
        let unique_id = format!("{}_{}", coordinator.vehicle_id(), kind);
        Self {
            coordinator,
            kind,
            unique_id,
        }
    }

    pub fn kind(&self) -> ReadingKind {
        self.kind
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }

    pub fn device_class(&self) -> DeviceClass {
        self.kind.device_class()
    }

    pub fn state_class(&self) -> StateClass {
        self.kind.state_class()
    }

    pub fn entity_category(&self) -> EntityCategory {
        EntityCategory::Diagnostic
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_vehicle(self.coordinator.vehicle_id())
    }

    /// Current value, re-derived from the cache. Stale after a failed refresh.
    pub fn value(&self) -> Option<f64> {
        self.kind.project(self.coordinator.data().as_deref())
    }

    /// `true` iff the coordinator's last refresh succeeded.
    pub fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }

    /// Fires after every completed refresh; re-read [`value()`](Self::value) then.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.coordinator.subscribe()
    }

    /// Host update hook: ask the coordinator for fresh data.
    pub async fn update(&self) {
        self.coordinator.request_refresh().await;
    }

    /// Everything a host needs to render this reading right now.
    pub fn snapshot(&self) -> ReadingSnapshot {
        let state = self.coordinator.state();
        ReadingSnapshot {
            unique_id: self.unique_id.clone(),
            key: self.kind,
            name: self.name(),
            value: self.kind.project(state.data.as_deref()),
            unit: self.unit(),
            device_class: self.device_class(),
            state_class: self.state_class(),
            available: state.last_update_success,
        }
    }
}

impl std::fmt::Debug for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reading")
            .field("unique_id", &self.unique_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Point-in-time rendering of a [`Reading`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingSnapshot {
    pub unique_id: String,
    pub key: ReadingKind,
    pub name: &'static str,
    pub value: Option<f64>,
    pub unit: &'static str,
    pub device_class: DeviceClass,
    pub state_class: StateClass,
    pub available: bool,
}

/// One reading per [`ReadingKind`], all backed by `coordinator`.
pub fn readings_for(coordinator: &Coordinator) -> Vec<Reading> {
    ReadingKind::iter()
        .map(|kind| Reading::new(coordinator.clone(), kind))
        .collect()
}
