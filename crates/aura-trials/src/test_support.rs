//! Scripted gateway and record builders shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use aura_core::{
    NewTrialRequest, ProductId, ProductSnapshot, TrialEvent, TrialFilter, TrialId, TrialRequest,
    TrialStats, TrialStatus,
};
use aura_gateway::{GatewayError, TrialGateway};

pub(crate) fn snapshot(id: &str, name: &str) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::from(id),
        name: name.to_owned(),
        price: Decimal::new(12800, 0),
        category: None,
    }
}

pub(crate) fn record(id: &str, status: TrialStatus, product: &str) -> TrialRequest {
    let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    let mut r = NewTrialRequest::for_products(vec![snapshot(id, product)])
        .into_record(TrialId::from(id), created);
    r.status = status;
    r
}

fn unavailable() -> GatewayError {
    GatewayError::UnexpectedStatus {
        status: 503,
        url: "http://backend.test/".to_owned(),
        body: String::new(),
    }
}

/// An in-memory backend that can be switched offline.
#[derive(Default)]
pub(crate) struct StubGateway {
    records: Mutex<Vec<TrialRequest>>,
    offline: AtomicBool,
    next_id: AtomicUsize,
    calls: AtomicUsize,
}

impl StubGateway {
    pub(crate) fn online() -> Self {
        Self::default()
    }

    pub(crate) fn offline() -> Self {
        let stub = Self::default();
        stub.set_offline(true);
        stub
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn seed(&self, record: TrialRequest) {
        self.records.lock().unwrap().push(record);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TrialGateway for StubGateway {
    async fn create_trial(&self, request: &NewTrialRequest) -> Result<TrialRequest, GatewayError> {
        self.enter()?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 100;
        let created = Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap()
            + Duration::minutes(i64::try_from(n).unwrap());
        let record = request
            .clone()
            .into_record(TrialId(n.to_string()), created);
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_trials(&self, filter: &TrialFilter) -> Result<Vec<TrialRequest>, GatewayError> {
        self.enter()?;
        Ok(filter.apply(self.records.lock().unwrap().clone()))
    }

    async fn update_trial_status(
        &self,
        id: &TrialId,
        status: TrialStatus,
        staff_notes: Option<&str>,
    ) -> Result<TrialRequest, GatewayError> {
        self.enter()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| GatewayError::NotFound { url: id.to_string() })?;
        let event = [
            TrialEvent::Approve,
            TrialEvent::Reject,
            TrialEvent::Start,
            TrialEvent::Complete,
            TrialEvent::Cancel,
        ]
        .into_iter()
        .find(|e| e.target() == status)
        .unwrap();
        let now = record.updated_at + Duration::minutes(5);
        record
            .apply(event, staff_notes.map(str::to_owned), now)
            .map_err(|e| GatewayError::Rejected {
                status: 409,
                message: e.to_string(),
            })?;
        Ok(record.clone())
    }

    async fn delete_trial(&self, id: &TrialId) -> Result<(), GatewayError> {
        self.enter()?;
        self.records.lock().unwrap().retain(|r| &r.id != id);
        Ok(())
    }

    async fn trial_stats(&self) -> Result<TrialStats, GatewayError> {
        self.enter()?;
        Ok(TrialStats::from_requests(self.records.lock().unwrap().iter()))
    }
}
