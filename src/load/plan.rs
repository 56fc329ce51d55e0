//! Declarative description of the simulated-load cascade.
//!
//! A [`LoadPlan`] is an ordered list of stages, each guarded by a [`Gate`].
//! Evaluating a plan against a [`RideContext`] is pure: it decides which
//! stages run and for how many units, but never touches a clock.

use serde::Serialize;
use strum::Display;

use crate::domain::{SearchRadius, VehicleKind};

/// Everything a gate may look at when deciding whether a stage runs
#[derive(Debug, Clone, Copy)]
pub struct RideContext<'a> {
    pub vehicle: VehicleKind,
    pub radius: SearchRadius,
    /// Minute of the hour, 0..=59
    pub minute: u32,
    pub region: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageKind {
    /// Searching for the nearest vehicle
    FindNearestVehicle,
    /// Confirming a driver is free; cars only
    CheckDriverAvailability,
    /// The injected slow path
    RegionSlowdown,
}

/// Predicate deciding whether a stage runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Always,
    VehicleIs(VehicleKind),
    EvenMinute,
    RegionIs(String),
    All(Vec<Gate>),
}

impl Gate {
    pub fn allows(&self, ctx: &RideContext<'_>) -> bool {
        match self {
            Gate::Always => true,
            Gate::VehicleIs(kind) => ctx.vehicle == *kind,
            Gate::EvenMinute => ctx.minute % 2 == 0,
            Gate::RegionIs(region) => ctx.region == region.as_str(),
            Gate::All(gates) => gates.iter().all(|g| g.allows(ctx)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub kind: StageKind,
    /// Scales the ride's search radius; the stage waits `radius * multiplier` units
    pub multiplier: u32,
    pub gate: Gate,
}

/// A stage selected for execution, with its wait resolved to unit counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveStage {
    pub kind: StageKind,
    pub units: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    stages: Vec<Stage>,
}

impl LoadPlan {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// The ride-sharing cascade: find a vehicle, check the driver for cars,
    /// and slow `slow_region` down by `slow_multiplier` on even minutes.
    pub fn rideshare(slow_region: impl Into<String>, slow_multiplier: u32) -> Self {
        Self::new(vec![
            Stage {
                kind: StageKind::FindNearestVehicle,
                multiplier: 1,
                gate: Gate::Always,
            },
            Stage {
                kind: StageKind::CheckDriverAvailability,
                multiplier: 1,
                gate: Gate::VehicleIs(VehicleKind::Car),
            },
            Stage {
                kind: StageKind::RegionSlowdown,
                multiplier: slow_multiplier,
                gate: Gate::All(vec![
                    Gate::VehicleIs(VehicleKind::Car),
                    Gate::EvenMinute,
                    Gate::RegionIs(slow_region.into()),
                ]),
            },
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages that run for `ctx`, in plan order
    pub fn active_stages(&self, ctx: &RideContext<'_>) -> Vec<ActiveStage> {
        self.stages
            .iter()
            .filter(|s| s.gate.allows(ctx))
            .map(|s| ActiveStage {
                kind: s.kind,
                units: ctx.radius.get().saturating_mul(s.multiplier),
            })
            .collect()
    }

    /// Total number of units `ctx` will wait for
    pub fn total_units(&self, ctx: &RideContext<'_>) -> u64 {
        self.active_stages(ctx)
            .iter()
            .map(|s| u64::from(s.units))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx(vehicle: VehicleKind, radius: u32, minute: u32, region: &str) -> RideContext<'_> {
        RideContext {
            vehicle,
            radius: SearchRadius::new(radius).unwrap(),
            minute,
            region,
        }
    }

    fn kinds(stages: &[ActiveStage]) -> Vec<StageKind> {
        stages.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_bike_runs_primary_only() {
        let plan = LoadPlan::rideshare("us-west-1", 30);
        let active = plan.active_stages(&ctx(VehicleKind::Bike, 1, 10, "us-west-1"));
        assert_eq!(
            active,
            vec![ActiveStage { kind: StageKind::FindNearestVehicle, units: 1 }]
        );
    }

    #[test]
    fn test_car_adds_driver_check() {
        let plan = LoadPlan::rideshare("us-west-1", 30);
        let active = plan.active_stages(&ctx(VehicleKind::Car, 3, 11, "us-west-1"));
        assert_eq!(
            kinds(&active),
            vec![StageKind::FindNearestVehicle, StageKind::CheckDriverAvailability]
        );
        assert_eq!(active[1].units, 3);
    }

    #[test]
    fn test_slow_region_on_even_minute() {
        let plan = LoadPlan::rideshare("us-west-1", 30);
        let c = ctx(VehicleKind::Car, 3, 12, "us-west-1");
        let active = plan.active_stages(&c);
        assert_eq!(
            kinds(&active),
            vec![
                StageKind::FindNearestVehicle,
                StageKind::CheckDriverAvailability,
                StageKind::RegionSlowdown,
            ]
        );
        assert_eq!(active[2].units, 90);
        assert_eq!(plan.total_units(&c), 96);
    }

    #[test]
    fn test_other_region_never_slowed() {
        let plan = LoadPlan::rideshare("us-west-1", 30);
        let active = plan.active_stages(&ctx(VehicleKind::Car, 3, 12, "eu-north-1"));
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn test_slow_region_skipped_for_scooter() {
        let plan = LoadPlan::rideshare("us-west-1", 30);
        let active = plan.active_stages(&ctx(VehicleKind::Scooter, 2, 0, "us-west-1"));
        assert_eq!(kinds(&active), vec![StageKind::FindNearestVehicle]);
    }

    #[test]
    fn test_gate_all_empty_is_true() {
        let c = ctx(VehicleKind::Bike, 1, 1, "");
        assert!(Gate::All(vec![]).allows(&c));
        assert!(!Gate::EvenMinute.allows(&c));
    }

    #[test]
    fn test_stage_kind_names() {
        assert_eq!(StageKind::FindNearestVehicle.to_string(), "find_nearest_vehicle");
        assert_eq!(StageKind::RegionSlowdown.to_string(), "region_slowdown");
    }

    fn any_vehicle() -> impl Strategy<Value = VehicleKind> {
        prop_oneof![
            Just(VehicleKind::Bike),
            Just(VehicleKind::Scooter),
            Just(VehicleKind::Car),
        ]
    }

    proptest! {
        #[test]
        fn prop_primary_matches_radius(radius in 1u32..10_000, minute in 0u32..60, vehicle in any_vehicle()) {
            let plan = LoadPlan::rideshare("us-west-1", 30);
            let active = plan.active_stages(&ctx(vehicle, radius, minute, "us-west-1"));
            prop_assert_eq!(active[0].kind, StageKind::FindNearestVehicle);
            prop_assert_eq!(active[0].units, radius);
        }

        #[test]
        fn prop_slowdown_is_thirty_times_radius(radius in 1u32..10_000, half in 0u32..30) {
            let plan = LoadPlan::rideshare("us-west-1", 30);
            let active = plan.active_stages(&ctx(VehicleKind::Car, radius, half * 2, "us-west-1"));
            prop_assert_eq!(active.len(), 3);
            prop_assert_eq!(active[2].units, radius * 30);
        }

        #[test]
        fn prop_plan_is_deterministic(radius in 1u32..100, minute in 0u32..60, vehicle in any_vehicle()) {
            let plan = LoadPlan::rideshare("us-west-1", 30);
            let c = ctx(vehicle, radius, minute, "us-west-1");
            prop_assert_eq!(plan.active_stages(&c), plan.active_stages(&c));
        }
    }
}
