//! Postgres entity store backed by `sqlx`.
//!
//! Admission-checked writes run in a SERIALIZABLE transaction that first
//! locks the truck and driver rows `FOR UPDATE`, so two concurrent requests
//! for the same pair cannot both pass the quota reads.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use crate::models::{
    Delivery, DeliveryDetails, DeliveryId, Destination, Driver, DriverDetails, DriverId,
    DriverInput, EntityKind, NewDelivery, Truck, TruckDetails, TruckId, TruckInput,
};
use crate::rules::MonthWindow;

use super::{DeliveryQueries, EntityStore, StoreError, StoreResult, StoreTransaction};

const TRUCK_FKEY: &str = "deliveries_truck_id_fkey";

const DELIVERY_COLUMNS: &str = "id, cargo_type, value, destination, delivery_time, \
     truck_id, driver_id, insurance, dangerous, valuable";

const DETAILS_QUERY: &str = "SELECT d.id, d.cargo_type, d.value, d.destination, \
     d.delivery_time, d.truck_id, d.driver_id, d.insurance, d.dangerous, d.valuable, \
     t.license_plate, t.model, dr.name AS driver_name, dr.license AS driver_license \
     FROM deliveries d \
     JOIN trucks t ON t.id = d.truck_id \
     JOIN drivers dr ON dr.id = d.driver_id";

#[derive(sqlx::FromRow)]
struct TruckRow {
    id: i64,
    license_plate: String,
    model: Option<String>,
}

impl From<TruckRow> for Truck {
    fn from(row: TruckRow) -> Self {
        Truck {
            id: TruckId(row.id),
            license_plate: row.license_plate,
            model: row.model,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DriverRow {
    id: i64,
    name: String,
    license: String,
}

impl From<DriverRow> for Driver {
    fn from(row: DriverRow) -> Self {
        Driver {
            id: DriverId(row.id),
            name: row.name,
            license: row.license,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: i64,
    cargo_type: String,
    value: Decimal,
    destination: String,
    delivery_time: DateTime<Utc>,
    truck_id: i64,
    driver_id: i64,
    insurance: bool,
    dangerous: bool,
    valuable: bool,
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = StoreError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        Ok(Delivery {
            id: DeliveryId(row.id),
            cargo_type: row
                .cargo_type
                .parse()
                .map_err(|e| StoreError::Backend(format!("delivery {}: {}", row.id, e)))?,
            value: row.value,
            destination: row
                .destination
                .parse()
                .map_err(|e| StoreError::Backend(format!("delivery {}: {}", row.id, e)))?,
            delivery_time: row.delivery_time,
            truck_id: TruckId(row.truck_id),
            driver_id: DriverId(row.driver_id),
            insurance: row.insurance,
            dangerous: row.dangerous,
            valuable: row.valuable,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryDetailsRow {
    #[sqlx(flatten)]
    delivery: DeliveryRow,
    license_plate: String,
    model: Option<String>,
    driver_name: String,
    driver_license: String,
}

impl TryFrom<DeliveryDetailsRow> for DeliveryDetails {
    type Error = StoreError;

    fn try_from(row: DeliveryDetailsRow) -> Result<Self, Self::Error> {
        let delivery = Delivery::try_from(row.delivery)?;
        Ok(DeliveryDetails {
            truck: Truck {
                id: delivery.truck_id,
                license_plate: row.license_plate,
                model: row.model,
            },
            driver: Driver {
                id: delivery.driver_id,
                name: row.driver_name,
                license: row.driver_license,
            },
            delivery,
        })
    }
}

fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Returns the violated constraint name for a foreign-key violation.
fn foreign_key_constraint(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Maps an insert/update failure against the deliveries table.
fn classify_delivery_write(error: sqlx::Error, delivery: &NewDelivery) -> StoreError {
    match foreign_key_constraint(&error) {
        Some(constraint) if constraint == TRUCK_FKEY => StoreError::ForeignKey {
            entity: EntityKind::Truck,
            id: delivery.truck_id.0,
        },
        Some(_) => StoreError::ForeignKey {
            entity: EntityKind::Driver,
            id: delivery.driver_id.0,
        },
        None => backend(error),
    }
}

fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn into_deliveries(rows: Vec<DeliveryRow>) -> StoreResult<Vec<Delivery>> {
    rows.into_iter().map(Delivery::try_from).collect()
}

/// An entity store in a Postgres database.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a small pool to `url`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await
            .map_err(backend)?;

        Ok(Self { pool })
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        info!("Migrations completed");
        Ok(())
    }

    async fn deliveries_where(&self, column: &str, id: i64) -> StoreResult<Vec<Delivery>> {
        let sql = format!(
            "SELECT {} FROM deliveries WHERE {} = $1 ORDER BY id",
            DELIVERY_COLUMNS, column
        );
        let rows = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        into_deliveries(rows)
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn create_truck(&self, input: &TruckInput) -> StoreResult<Truck> {
        sqlx::query_as::<_, TruckRow>(
            "INSERT INTO trucks (license_plate, model) VALUES ($1, $2) \
             RETURNING id, license_plate, model",
        )
        .bind(&input.license_plate)
        .bind(&input.model)
        .fetch_one(&self.pool)
        .await
        .map(Truck::from)
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::UniqueViolation {
                    entity: EntityKind::Truck,
                    field: "license_plate".to_string(),
                    value: input.license_plate.clone(),
                }
            } else {
                backend(e)
            }
        })
    }

    async fn find_truck(&self, id: TruckId) -> StoreResult<Option<TruckDetails>> {
        let row = sqlx::query_as::<_, TruckRow>(
            "SELECT id, license_plate, model FROM trucks WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => Ok(Some(TruckDetails {
                truck: row.into(),
                deliveries: self.deliveries_where("truck_id", id.0).await?,
            })),
            None => Ok(None),
        }
    }

    async fn find_truck_by_plate(&self, license_plate: &str) -> StoreResult<Option<Truck>> {
        sqlx::query_as::<_, TruckRow>(
            "SELECT id, license_plate, model FROM trucks WHERE license_plate = $1",
        )
        .bind(license_plate)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(Truck::from))
        .map_err(backend)
    }

    async fn list_trucks(&self) -> StoreResult<Vec<Truck>> {
        let rows = sqlx::query_as::<_, TruckRow>(
            "SELECT id, license_plate, model FROM trucks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(Truck::from).collect())
    }

    async fn update_truck(&self, id: TruckId, input: &TruckInput) -> StoreResult<Truck> {
        let row = sqlx::query_as::<_, TruckRow>(
            "UPDATE trucks SET license_plate = $1, model = $2 WHERE id = $3 \
             RETURNING id, license_plate, model",
        )
        .bind(&input.license_plate)
        .bind(&input.model)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::UniqueViolation {
                    entity: EntityKind::Truck,
                    field: "license_plate".to_string(),
                    value: input.license_plate.clone(),
                }
            } else {
                backend(e)
            }
        })?;

        row.map(Truck::from).ok_or(StoreError::NotFound {
            entity: EntityKind::Truck,
            id: id.0,
        })
    }

    async fn delete_truck(&self, id: TruckId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM trucks WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| match foreign_key_constraint(&e) {
                Some(_) => StoreError::StillReferenced {
                    entity: EntityKind::Truck,
                    id: id.0,
                },
                None => backend(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: EntityKind::Truck,
                id: id.0,
            });
        }
        Ok(())
    }

    async fn create_driver(&self, input: &DriverInput) -> StoreResult<Driver> {
        sqlx::query_as::<_, DriverRow>(
            "INSERT INTO drivers (name, license) VALUES ($1, $2) RETURNING id, name, license",
        )
        .bind(&input.name)
        .bind(&input.license)
        .fetch_one(&self.pool)
        .await
        .map(Driver::from)
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::UniqueViolation {
                    entity: EntityKind::Driver,
                    field: "license".to_string(),
                    value: input.license.clone(),
                }
            } else {
                backend(e)
            }
        })
    }

    async fn find_driver(&self, id: DriverId) -> StoreResult<Option<DriverDetails>> {
        let row =
            sqlx::query_as::<_, DriverRow>("SELECT id, name, license FROM drivers WHERE id = $1")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        match row {
            Some(row) => Ok(Some(DriverDetails {
                driver: row.into(),
                deliveries: self.deliveries_where("driver_id", id.0).await?,
            })),
            None => Ok(None),
        }
    }

    async fn find_driver_by_license(&self, license: &str) -> StoreResult<Option<Driver>> {
        sqlx::query_as::<_, DriverRow>("SELECT id, name, license FROM drivers WHERE license = $1")
            .bind(license)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Driver::from))
            .map_err(backend)
    }

    async fn list_drivers(&self) -> StoreResult<Vec<Driver>> {
        let rows =
            sqlx::query_as::<_, DriverRow>("SELECT id, name, license FROM drivers ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
        Ok(rows.into_iter().map(Driver::from).collect())
    }

    async fn update_driver(&self, id: DriverId, input: &DriverInput) -> StoreResult<Driver> {
        let row = sqlx::query_as::<_, DriverRow>(
            "UPDATE drivers SET name = $1, license = $2 WHERE id = $3 \
             RETURNING id, name, license",
        )
        .bind(&input.name)
        .bind(&input.license)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::UniqueViolation {
                    entity: EntityKind::Driver,
                    field: "license".to_string(),
                    value: input.license.clone(),
                }
            } else {
                backend(e)
            }
        })?;

        row.map(Driver::from).ok_or(StoreError::NotFound {
            entity: EntityKind::Driver,
            id: id.0,
        })
    }

    async fn delete_driver(&self, id: DriverId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM drivers WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| match foreign_key_constraint(&e) {
                Some(_) => StoreError::StillReferenced {
                    entity: EntityKind::Driver,
                    id: id.0,
                },
                None => backend(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: EntityKind::Driver,
                id: id.0,
            });
        }
        Ok(())
    }

    async fn find_delivery(&self, id: DeliveryId) -> StoreResult<Option<DeliveryDetails>> {
        let sql = format!("{} WHERE d.id = $1", DETAILS_QUERY);
        let row = sqlx::query_as::<_, DeliveryDetailsRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(DeliveryDetails::try_from).transpose()
    }

    async fn list_deliveries(&self) -> StoreResult<Vec<DeliveryDetails>> {
        let sql = format!("{} ORDER BY d.id", DETAILS_QUERY);
        let rows = sqlx::query_as::<_, DeliveryDetailsRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(DeliveryDetails::try_from).collect()
    }

    async fn delete_delivery(&self, id: DeliveryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM deliveries WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: EntityKind::Delivery,
                id: id.0,
            });
        }
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        Ok(Box::new(PgTransaction { tx }))
    }
}

/// A serializable Postgres transaction; rolls back when dropped uncommitted.
struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DeliveryQueries for PgTransaction {
    async fn count_truck_deliveries(
        &mut self,
        truck_id: TruckId,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deliveries \
             WHERE truck_id = $1 AND delivery_time >= $2 AND delivery_time < $3 \
             AND ($4::BIGINT IS NULL OR id <> $4)",
        )
        .bind(truck_id.0)
        .bind(window.start())
        .bind(window.next_start())
        .bind(exclude.map(|id| id.0))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(backend)?;

        Ok(to_count(count))
    }

    async fn count_driver_deliveries(
        &mut self,
        driver_id: DriverId,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deliveries \
             WHERE driver_id = $1 AND delivery_time >= $2 AND delivery_time < $3 \
             AND ($4::BIGINT IS NULL OR id <> $4)",
        )
        .bind(driver_id.0)
        .bind(window.start())
        .bind(window.next_start())
        .bind(exclude.map(|id| id.0))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(backend)?;

        Ok(to_count(count))
    }

    async fn count_driver_destination_deliveries(
        &mut self,
        driver_id: DriverId,
        destination: Destination,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deliveries \
             WHERE driver_id = $1 AND destination = $2 \
             AND delivery_time >= $3 AND delivery_time < $4 \
             AND ($5::BIGINT IS NULL OR id <> $5)",
        )
        .bind(driver_id.0)
        .bind(destination.as_str())
        .bind(window.start())
        .bind(window.next_start())
        .bind(exclude.map(|id| id.0))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(backend)?;

        Ok(to_count(count))
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_assignment(
        &mut self,
        truck_id: TruckId,
        driver_id: DriverId,
    ) -> StoreResult<()> {
        let truck: Option<i64> =
            sqlx::query_scalar("SELECT id FROM trucks WHERE id = $1 FOR UPDATE")
                .bind(truck_id.0)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(backend)?;
        if truck.is_none() {
            return Err(StoreError::ForeignKey {
                entity: EntityKind::Truck,
                id: truck_id.0,
            });
        }

        let driver: Option<i64> =
            sqlx::query_scalar("SELECT id FROM drivers WHERE id = $1 FOR UPDATE")
                .bind(driver_id.0)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(backend)?;
        if driver.is_none() {
            return Err(StoreError::ForeignKey {
                entity: EntityKind::Driver,
                id: driver_id.0,
            });
        }

        Ok(())
    }

    async fn lock_delivery(&mut self, id: DeliveryId) -> StoreResult<Delivery> {
        let sql = format!(
            "SELECT {} FROM deliveries WHERE id = $1 FOR UPDATE",
            DELIVERY_COLUMNS
        );
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => Delivery::try_from(row),
            None => Err(StoreError::NotFound {
                entity: EntityKind::Delivery,
                id: id.0,
            }),
        }
    }

    async fn insert_delivery(&mut self, delivery: NewDelivery) -> StoreResult<Delivery> {
        let sql = format!(
            "INSERT INTO deliveries (cargo_type, value, destination, delivery_time, \
             truck_id, driver_id, insurance, dangerous, valuable) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            DELIVERY_COLUMNS
        );
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(delivery.cargo_type.as_str())
            .bind(delivery.value)
            .bind(delivery.destination.as_str())
            .bind(delivery.delivery_time)
            .bind(delivery.truck_id.0)
            .bind(delivery.driver_id.0)
            .bind(delivery.insurance)
            .bind(delivery.dangerous)
            .bind(delivery.valuable)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| classify_delivery_write(e, &delivery))?;

        Delivery::try_from(row)
    }

    async fn update_delivery(
        &mut self,
        id: DeliveryId,
        delivery: NewDelivery,
    ) -> StoreResult<Delivery> {
        let sql = format!(
            "UPDATE deliveries SET cargo_type = $1, value = $2, destination = $3, \
             delivery_time = $4, truck_id = $5, driver_id = $6, insurance = $7, \
             dangerous = $8, valuable = $9 WHERE id = $10 RETURNING {}",
            DELIVERY_COLUMNS
        );
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(delivery.cargo_type.as_str())
            .bind(delivery.value)
            .bind(delivery.destination.as_str())
            .bind(delivery.delivery_time)
            .bind(delivery.truck_id.0)
            .bind(delivery.driver_id.0)
            .bind(delivery.insurance)
            .bind(delivery.dangerous)
            .bind(delivery.valuable)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| classify_delivery_write(e, &delivery))?;

        match row {
            Some(row) => Delivery::try_from(row),
            None => Err(StoreError::NotFound {
                entity: EntityKind::Delivery,
                id: id.0,
            }),
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(backend)
    }
}
