//! Delivery orchestration.
//!
//! Creation and update run the admission check, pricing and the write inside
//! one store transaction that has locked the truck and driver, so the monthly
//! quotas hold under concurrent requests.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::RulesConfig;
use crate::error::EngineResult;
use crate::models::{Delivery, DeliveryDetails, DeliveryId, DeliveryInput};
use crate::rules::{AdmissionRequest, PricingMode, PricingResult, check_admission, price_delivery};
use crate::store::EntityStore;

/// Creates, reads, updates and deletes deliveries.
#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn EntityStore>,
    rules: RulesConfig,
}

impl DeliveryService {
    /// Creates a service over `store` enforcing `rules`.
    pub fn new(store: Arc<dyn EntityStore>, rules: RulesConfig) -> Self {
        Self { store, rules }
    }

    /// Admits, prices and stores a new delivery.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the input is malformed
    /// - `ReferentialViolation` if the truck or driver does not exist
    /// - `AdmissionRejected` listing every violated quota
    /// - `UnknownFailure` on store errors
    pub async fn create(&self, input: DeliveryInput) -> EngineResult<Delivery> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        tx.lock_assignment(input.truck_id, input.driver_id).await?;

        let request = AdmissionRequest::for_input(&input);
        check_admission(&mut *tx, &request, self.rules.admission()).await?;

        let priced = price_delivery(&input, PricingMode::Creation, self.rules.pricing())?;
        log_applied_rules(&priced);

        let delivery = tx.insert_delivery(priced.delivery).await?;
        tx.commit().await?;

        info!(
            delivery_id = %delivery.id,
            truck_id = %delivery.truck_id,
            driver_id = %delivery.driver_id,
            value = %delivery.value,
            "Delivery created"
        );
        Ok(delivery)
    }

    /// Fetches a delivery with its truck and driver; `None` when absent.
    pub async fn read(&self, id: DeliveryId) -> EngineResult<Option<DeliveryDetails>> {
        Ok(self.store.find_delivery(id).await?)
    }

    /// Fetches every delivery with its truck and driver.
    pub async fn read_all(&self) -> EngineResult<Vec<DeliveryDetails>> {
        Ok(self.store.list_deliveries().await?)
    }

    /// Re-admits and replaces an existing delivery.
    ///
    /// The delivery itself is left out of the quota counts. The submitted
    /// value is stored as is: the destination surcharge was applied when the
    /// delivery was created and is not applied again. For the same reason the
    /// valuable threshold is not re-checked; the stored flag is kept.
    ///
    /// # Errors
    ///
    /// Everything [`create`](Self::create) can fail with, plus `NotFound`
    /// when `id` does not exist.
    pub async fn update(&self, id: DeliveryId, input: DeliveryInput) -> EngineResult<Delivery> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let stored = tx.lock_delivery(id).await?;
        tx.lock_assignment(input.truck_id, input.driver_id).await?;

        let request = AdmissionRequest::for_input(&input).excluding(id);
        check_admission(&mut *tx, &request, self.rules.admission()).await?;

        let mode = PricingMode::Update {
            stored_valuable: stored.valuable,
        };
        let priced = price_delivery(&input, mode, self.rules.pricing())?;
        log_applied_rules(&priced);

        let delivery = tx.update_delivery(id, priced.delivery).await?;
        tx.commit().await?;

        info!(delivery_id = %delivery.id, value = %delivery.value, "Delivery updated");
        Ok(delivery)
    }

    /// Deletes a delivery; `NotFound` when absent.
    pub async fn delete(&self, id: DeliveryId) -> EngineResult<()> {
        self.store.delete_delivery(id).await?;
        info!(delivery_id = %id, "Delivery deleted");
        Ok(())
    }
}

fn log_applied_rules(priced: &PricingResult) {
    for rule in &priced.applied_rules {
        debug!(rule_id = rule.rule_id, reasoning = %rule.reasoning, "Pricing rule applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, ReferenceFailure};
    use crate::models::{
        CargoType, Destination, DriverId, DriverInput, EntityKind, TruckId, TruckInput,
    };
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn setup(trucks: usize, drivers: usize) -> (DeliveryService, MemoryStore) {
        let store = MemoryStore::new();
        for i in 0..trucks {
            store
                .create_truck(&TruckInput {
                    license_plate: format!("TRK{:04}", i),
                    model: None,
                })
                .await
                .unwrap();
        }
        for i in 0..drivers {
            store
                .create_driver(&DriverInput {
                    name: format!("Driver {}", char::from(b'A' + i as u8)),
                    license: format!("{:011}", i + 1),
                })
                .await
                .unwrap();
        }
        let service = DeliveryService::new(Arc::new(store.clone()), RulesConfig::default());
        (service, store)
    }

    fn input(truck: i64, driver: i64, destination: Destination, at: &str) -> DeliveryInput {
        DeliveryInput {
            cargo_type: CargoType::Standard,
            value: dec("10000"),
            destination,
            delivery_time: at.parse().unwrap(),
            truck_id: TruckId(truck),
            driver_id: DriverId(driver),
            insurance: None,
            dangerous: None,
            valuable: None,
        }
    }

    fn rejection_codes(result: EngineResult<Delivery>) -> Vec<String> {
        match result {
            Err(EngineError::AdmissionRejected { violations }) => {
                violations.iter().map(|v| v.code()).collect()
            }
            other => panic!("Expected AdmissionRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_prices_and_stores() {
        let (service, _) = setup(1, 1).await;

        let delivery = service
            .create(input(1, 1, Destination::Northeast, "2026-10-05T10:00:00Z"))
            .await
            .unwrap();

        assert_eq!(delivery.value, dec("12000"));
        let stored = service.read(delivery.id).await.unwrap().unwrap();
        assert_eq!(stored.delivery, delivery);
        assert_eq!(stored.truck.license_plate, "TRK0000");
    }

    #[tokio::test]
    async fn test_fifth_truck_delivery_rejected() {
        let (service, _) = setup(1, 3).await;
        let slots = [
            (1, "2026-10-01T08:00:00Z"),
            (1, "2026-10-02T08:00:00Z"),
            (2, "2026-10-03T08:00:00Z"),
            (2, "2026-10-04T08:00:00Z"),
        ];
        for (driver, at) in slots {
            service
                .create(input(1, driver, Destination::Other, at))
                .await
                .unwrap();
        }

        let result = service
            .create(input(1, 3, Destination::Argentina, "2026-10-20T08:00:00Z"))
            .await;
        assert_eq!(rejection_codes(result), vec!["truck_quota"]);
    }

    #[tokio::test]
    async fn test_third_driver_delivery_rejected() {
        let (service, _) = setup(3, 1).await;
        service
            .create(input(1, 1, Destination::Other, "2026-10-01T08:00:00Z"))
            .await
            .unwrap();
        service
            .create(input(2, 1, Destination::Amazon, "2026-10-02T08:00:00Z"))
            .await
            .unwrap();

        let result = service
            .create(input(3, 1, Destination::Other, "2026-10-03T08:00:00Z"))
            .await;
        assert_eq!(rejection_codes(result), vec!["driver_quota"]);
    }

    #[tokio::test]
    async fn test_quota_resets_in_next_month() {
        let (service, _) = setup(3, 1).await;
        service
            .create(input(1, 1, Destination::Other, "2026-10-01T08:00:00Z"))
            .await
            .unwrap();
        service
            .create(input(2, 1, Destination::Other, "2026-10-31T23:59:59Z"))
            .await
            .unwrap();

        assert!(service
            .create(input(3, 1, Destination::Other, "2026-11-01T00:00:00Z"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_second_northeast_rejected_but_other_destination_allowed() {
        let (service, _) = setup(3, 1).await;
        service
            .create(input(1, 1, Destination::Northeast, "2026-10-01T08:00:00Z"))
            .await
            .unwrap();

        let result = service
            .create(input(2, 1, Destination::Northeast, "2026-10-02T08:00:00Z"))
            .await;
        assert_eq!(rejection_codes(result), vec!["northeast_repeat"]);

        assert!(service
            .create(input(3, 1, Destination::Amazon, "2026-10-02T08:00:00Z"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_truck_is_missing_reference() {
        let (service, _) = setup(0, 1).await;

        let result = service
            .create(input(7, 1, Destination::Other, "2026-10-01T08:00:00Z"))
            .await;
        assert!(matches!(
            result,
            Err(EngineError::ReferentialViolation {
                entity: EntityKind::Truck,
                id: 7,
                failure: ReferenceFailure::Missing,
            })
        ));
    }

    #[tokio::test]
    async fn test_update_is_not_counted_against_itself() {
        let (service, _) = setup(1, 1).await;
        service
            .create(input(1, 1, Destination::Other, "2026-10-01T08:00:00Z"))
            .await
            .unwrap();
        let second = service
            .create(input(1, 1, Destination::Northeast, "2026-10-02T08:00:00Z"))
            .await
            .unwrap();

        let mut changed = input(1, 1, Destination::Northeast, "2026-10-03T08:00:00Z");
        changed.value = second.value;
        changed.insurance = Some(true);

        let updated = service.update(second.id, changed).await.unwrap();
        assert_eq!(updated.value, dec("12000"));
        assert!(updated.insurance);
    }

    #[tokio::test]
    async fn test_update_does_not_turn_surcharged_value_valuable() {
        let (service, _) = setup(1, 1).await;
        let mut declared = input(1, 1, Destination::Amazon, "2026-10-01T08:00:00Z");
        declared.value = dec("25000");
        let created = service.create(declared).await.unwrap();
        assert_eq!(created.value, dec("32500"));
        assert!(!created.valuable);

        let mut changed = input(1, 1, Destination::Amazon, "2026-10-01T08:00:00Z");
        changed.value = created.value;
        changed.insurance = Some(true);

        let updated = service.update(created.id, changed).await.unwrap();
        assert_eq!(updated.value, dec("32500"));
        assert!(!updated.valuable);
        assert!(updated.insurance);
    }

    #[tokio::test]
    async fn test_update_keeps_valuable_flag_set_at_creation() {
        let (service, _) = setup(1, 1).await;
        let mut declared = input(1, 1, Destination::Other, "2026-10-01T08:00:00Z");
        declared.value = dec("40000");
        let created = service.create(declared).await.unwrap();
        assert!(created.valuable);

        let mut changed = input(1, 1, Destination::Other, "2026-10-01T08:00:00Z");
        changed.value = dec("20000");

        let updated = service.update(created.id, changed).await.unwrap();
        assert!(updated.valuable);
    }

    #[tokio::test]
    async fn test_oversized_value_is_rejected_before_write() {
        let (service, _) = setup(1, 1).await;
        let mut huge = input(1, 1, Destination::Northeast, "2026-10-01T08:00:00Z");
        huge.value = Decimal::MAX;

        assert!(matches!(
            service.create(huge).await,
            Err(EngineError::InvalidInput { ref field, .. }) if field == "value"
        ));
        assert!(service.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_of_missing_delivery_is_not_found() {
        let (service, _) = setup(1, 1).await;

        let result = service
            .update(
                DeliveryId(42),
                input(1, 1, Destination::Other, "2026-10-01T08:00:00Z"),
            )
            .await;
        assert!(matches!(
            result,
            Err(EngineError::NotFound {
                entity: EntityKind::Delivery,
                id: 42,
            })
        ));
    }

    #[tokio::test]
    async fn test_delete_then_read_is_none() {
        let (service, _) = setup(1, 1).await;
        let delivery = service
            .create(input(1, 1, Destination::Other, "2026-10-01T08:00:00Z"))
            .await
            .unwrap();

        service.delete(delivery.id).await.unwrap();
        assert!(service.read(delivery.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete(delivery.id).await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_creates_respect_driver_quota() {
        let (service, _) = setup(4, 1).await;
        service
            .create(input(1, 1, Destination::Other, "2026-10-01T08:00:00Z"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for truck in 2..=4 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create(input(truck, 1, Destination::Other, "2026-10-05T08:00:00Z"))
                    .await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(service.read_all().await.unwrap().len(), 2);
    }
}
