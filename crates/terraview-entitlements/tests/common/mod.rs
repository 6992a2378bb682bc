//! Shared fixtures: a fixed clock, fixture metadata and a scripted render service.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use terraview_core::errors::{EntitlementResult, RenderError};
use terraview_core::models::HierarchyEntry;
use terraview_core::traits::{
    ArtifactRequest, FixedClock, IEntitlementStorage, IMetadataSource, IRenderService,
};
use terraview_core::EntitlementConfig;
use terraview_entitlements::hierarchy::{HierarchyIndex, StaticMetadataSource};
use terraview_entitlements::storage::SqliteEntitlementStorage;
use terraview_entitlements::EntitlementEngine;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
}

fn entry(district: (&str, &str), taluka: (&str, &str), village: (&str, &str)) -> HierarchyEntry {
    HierarchyEntry {
        state: "maharashtra".to_string(),
        district_code: district.0.to_string(),
        district_name: district.1.to_string(),
        taluka_code: taluka.0.to_string(),
        taluka_name: taluka.1.to_string(),
        village_code: village.0.to_string(),
        village_name: village.1.to_string(),
    }
}

/// Jalgaon → {Parola → {Mohadi, Anturli}, Amalner → {Dhar, Marwad}},
/// Nashik → {Niphad → {Ozar, Lasalgaon}}.
pub fn fixture_entries() -> Vec<HierarchyEntry> {
    let jalgaon = ("19", "Jalgaon");
    let nashik = ("20", "Nashik");
    vec![
        entry(jalgaon, ("1901", "Parola"), ("190102", "Mohadi")),
        entry(jalgaon, ("1901", "Parola"), ("190101", "Anturli")),
        entry(jalgaon, ("1902", "Amalner"), ("190201", "Dhar")),
        entry(jalgaon, ("1902", "Amalner"), ("190202", "Marwad")),
        entry(nashik, ("2001", "Niphad"), ("200101", "Ozar")),
        entry(nashik, ("2001", "Niphad"), ("200102", "Lasalgaon")),
    ]
}

pub fn fixture_index() -> HierarchyIndex {
    HierarchyIndex::build(fixture_entries())
}

/// Fixture rows that a test can edit between hierarchy rebuilds.
pub struct EditableSource {
    pub rows: Mutex<Vec<HierarchyEntry>>,
}

impl EditableSource {
    pub fn fixture() -> Self {
        Self {
            rows: Mutex::new(fixture_entries()),
        }
    }

    pub fn remove_village(&self, village: &str) {
        self.rows
            .lock()
            .unwrap()
            .retain(|e| !e.village_name.eq_ignore_ascii_case(village));
    }
}

impl IMetadataSource for EditableSource {
    fn fetch_entries(&self, _state: &str) -> EntitlementResult<Vec<HierarchyEntry>> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

/// Render service returning the request's identity as bytes, or failing on demand.
#[derive(Default)]
pub struct ScriptedRender {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedRender {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl IRenderService for ScriptedRender {
    fn artifact_by_identity(&self, request: &ArtifactRequest) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::NotFound {
                identity: format!("{}/{}", request.village, request.identifier),
            });
        }
        Ok(format!("{}:{}:{}", request.taluka, request.village, request.identifier).into_bytes())
    }
}

pub struct Harness {
    pub engine: EntitlementEngine,
    pub clock: Arc<FixedClock>,
    pub render: Arc<ScriptedRender>,
}

pub fn harness() -> Harness {
    harness_with(EntitlementConfig::default())
}

pub fn harness_with(config: EntitlementConfig) -> Harness {
    let storage: Arc<dyn IEntitlementStorage> =
        Arc::new(SqliteEntitlementStorage::open_in_memory().unwrap());
    harness_over(config, storage)
}

pub fn harness_over(config: EntitlementConfig, storage: Arc<dyn IEntitlementStorage>) -> Harness {
    harness_from(
        config,
        storage,
        Arc::new(StaticMetadataSource::new(fixture_entries())),
    )
}

pub fn harness_from(
    config: EntitlementConfig,
    storage: Arc<dyn IEntitlementStorage>,
    metadata: Arc<dyn IMetadataSource>,
) -> Harness {
    let clock = Arc::new(FixedClock::new(t0()));
    let render = Arc::new(ScriptedRender::default());
    let engine = EntitlementEngine::with_parts(
        config,
        storage,
        metadata,
        render.clone(),
        clock.clone(),
    )
    .unwrap();
    Harness {
        engine,
        clock,
        render,
    }
}
