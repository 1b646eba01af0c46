//! Object data source: vehicles and player-placed deployables.
//!
//! Vehicles live in the vehicle table keyed by an integer `id`;
//! deployables live in the deployable table keyed by a 64-bit `unique_id`.
//! The two id ranges overlap, so every call names its table explicitly
//! with an [`ObjectTable`].

use std::collections::VecDeque;
use std::sync::Arc;

use hive_sqf::Value;

use crate::config::{ObjectConfig, WorldBounds};
use crate::database::{Database, Field, Row, SqlParam};
use crate::error::DataSourceError;
use crate::response::Status;
use crate::source::SqlDataSource;
use crate::worldspace::fix_out_of_bounds;

/// Records produced by a bulk object load, in load order.
pub type ObjectQueue = VecDeque<Value>;

/// Which object table an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectTable {
    /// Vehicle table, keyed by `id`.
    Vehicle,
    /// Deployable table, keyed by `unique_id`.
    Deployable,
}

impl ObjectTable {
    /// Map the game's `byUID` flag: set means a deployable.
    pub const fn from_by_uid(by_uid: bool) -> Self {
        if by_uid { Self::Deployable } else { Self::Vehicle }
    }

    const fn key_column(self) -> &'static str {
        match self {
            Self::Vehicle => "id",
            Self::Deployable => "unique_id",
        }
    }
}

/// A deployable to place in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObject {
    /// Class name, resolved against the `deployable` catalog.
    pub class_name: String,
    /// Damage, 0 to 1.
    pub damage: f64,
    /// Character that placed the object.
    pub owner_id: i32,
    /// Placement worldspace.
    pub worldspace: Value,
    /// Initial inventory.
    pub inventory: Value,
    /// Initial hitpoints.
    pub hitpoints: Value,
    /// Fuel, 0 to 1.
    pub fuel: f64,
    /// Unique id chosen by the game.
    pub unique_id: i64,
    /// Assembly this object belongs to, 0 for none.
    pub combination_id: i32,
}

/// World object persistence.
#[derive(Debug)]
pub struct ObjectDataSource<D> {
    source: SqlDataSource<D>,
    vehicle_table: String,
    deployable_table: String,
    reset_oob: bool,
    bounds: WorldBounds,
}

impl<D: Database> ObjectDataSource<D> {
    /// Create the data source over `db`.
    pub fn new(db: Arc<D>, config: &ObjectConfig, strict: bool) -> Self {
        let vehicle_table = db.quote_identifier(&config.vehicle_table);
        let deployable_table = db.quote_identifier(&config.deployable_table);
        Self {
            source: SqlDataSource::new(db, strict),
            vehicle_table,
            deployable_table,
            reset_oob: config.reset_oob,
            bounds: config.bounds,
        }
    }

    /// Shared plumbing, for inspection.
    pub const fn source(&self) -> &SqlDataSource<D> {
        &self.source
    }

    fn table(&self, table: ObjectTable) -> &str {
        match table {
            ObjectTable::Vehicle => &self.vehicle_table,
            ObjectTable::Deployable => &self.deployable_table,
        }
    }

    /// Stream every vehicle and deployable of an instance into `queue` as
    /// `["OBJ", id, class, owner, worldspace, inventory, hitpoints, fuel, damage]`.
    ///
    /// Rows with unreadable data are logged and skipped. Returns the number
    /// of records queued.
    pub async fn populate_objects(
        &self,
        server_id: i32,
        queue: &mut ObjectQueue,
    ) -> Result<u64, DataSourceError> {
        let sql = format!(
            "SELECT v.id::TEXT, c.class_name, '0', v.worldspace, v.inventory, v.parts, v.fuel, v.damage \
             FROM {vehicles} v \
             JOIN world_vehicle wv ON v.world_vehicle_id = wv.id \
             JOIN vehicle c ON wv.vehicle_id = c.id \
             WHERE v.instance_id = $1 \
             UNION ALL \
             SELECT d.unique_id::TEXT, c.class_name, COALESCE(d.owner_id, 0)::TEXT, d.worldspace, \
             d.inventory, d.hitpoints, d.fuel, d.damage \
             FROM {deployables} d \
             JOIN deployable c ON d.deployable_id = c.id \
             WHERE d.instance_id = $1",
            vehicles = self.vehicle_table,
            deployables = self.deployable_table,
        );

        let mut queued: u64 = 0;
        let streamed = self
            .source
            .stream("populate_objects", &sql, &[SqlParam::Int32(server_id)], |row| {
                if let Some(record) = self.object_record(&row) {
                    queue.push_back(record);
                    queued = queued.saturating_add(1);
                }
            })
            .await?;

        tracing::info!(server_id, streamed, queued, "Loaded world objects");
        Ok(queued)
    }

    fn object_record(&self, row: &Row) -> Option<Value> {
        let record = self.parse_object(row);
        if record.is_none() {
            tracing::error!(
                object_id = row.field(0).text(),
                class_name = row.field(1).text(),
                row = ?row.fields(),
                "Skipping object load because of invalid data in db"
            );
        }
        record
    }

    fn parse_object(&self, row: &Row) -> Option<Value> {
        let object_id = row.field(0).text();
        let class_name = row.field(1).text();
        let mut worldspace = hive_sqf::parse(row.field(3).as_str()?).ok()?;
        let inventory = sqf_or_empty(row.field(4))?;
        let hitpoints = sqf_or_empty(row.field(5))?;
        let fuel = number_or_zero(row.field(6))?;
        let damage = number_or_zero(row.field(7))?;

        if self.reset_oob
            && let Some(position) = fix_out_of_bounds(&mut worldspace, self.bounds)
        {
            tracing::warn!(
                object_id,
                class_name,
                position = %position,
                "Reset object position out of bounds"
            );
        }

        Some(Value::Array(vec![
            Status::Obj.into(),
            Value::string(object_id),
            Value::string(class_name),
            Value::string(row.field(2).text()),
            worldspace,
            inventory,
            hitpoints,
            Value::Double(fuel),
            Value::Double(damage),
        ]))
    }

    /// Replace an object's inventory.
    pub async fn update_object_inventory(
        &self,
        server_id: i32,
        object_id: i64,
        table: ObjectTable,
        inventory: &Value,
    ) -> Result<(), DataSourceError> {
        let key = match table {
            ObjectTable::Vehicle => "update_vehicle_inventory",
            ObjectTable::Deployable => "update_deployable_inventory",
        };
        self.source
            .write(
                key,
                || {
                    format!(
                        "UPDATE {} SET inventory = $1 WHERE {} = $2 AND instance_id = $3",
                        self.table(table),
                        table.key_column()
                    )
                },
                vec![
                    SqlParam::text(inventory.to_string()),
                    SqlParam::Int64(object_id),
                    SqlParam::Int32(server_id),
                ],
            )
            .await
    }

    /// Remove an object.
    pub async fn delete_object(
        &self,
        server_id: i32,
        object_id: i64,
        table: ObjectTable,
    ) -> Result<(), DataSourceError> {
        let key = match table {
            ObjectTable::Vehicle => "delete_vehicle",
            ObjectTable::Deployable => "delete_deployable",
        };
        self.source
            .write(
                key,
                || {
                    format!(
                        "DELETE FROM {} WHERE {} = $1 AND instance_id = $2",
                        self.table(table),
                        table.key_column()
                    )
                },
                vec![SqlParam::Int64(object_id), SqlParam::Int32(server_id)],
            )
            .await
    }

    /// Store a vehicle's position and fuel.
    pub async fn update_vehicle_movement(
        &self,
        server_id: i32,
        object_id: i64,
        worldspace: &Value,
        fuel: f64,
    ) -> Result<(), DataSourceError> {
        self.source
            .write(
                "update_vehicle_movement",
                || {
                    format!(
                        "UPDATE {} SET worldspace = $1, fuel = $2 WHERE id = $3 AND instance_id = $4",
                        self.vehicle_table
                    )
                },
                vec![
                    SqlParam::text(worldspace.to_string()),
                    SqlParam::Double(fuel),
                    SqlParam::Int64(object_id),
                    SqlParam::Int32(server_id),
                ],
            )
            .await
    }

    /// Store a vehicle's damaged parts and overall damage.
    pub async fn update_vehicle_status(
        &self,
        server_id: i32,
        object_id: i64,
        parts: &Value,
        damage: f64,
    ) -> Result<(), DataSourceError> {
        self.source
            .write(
                "update_vehicle_status",
                || {
                    format!(
                        "UPDATE {} SET parts = $1, damage = $2 WHERE id = $3 AND instance_id = $4",
                        self.vehicle_table
                    )
                },
                vec![
                    SqlParam::text(parts.to_string()),
                    SqlParam::Double(damage),
                    SqlParam::Int64(object_id),
                    SqlParam::Int32(server_id),
                ],
            )
            .await
    }

    /// Place a deployable. Returns `false` when the class name is not in
    /// the catalog, in which case nothing is inserted.
    pub async fn create_object(&self, server_id: i32, object: &NewObject) -> Result<bool, DataSourceError> {
        let inserted = self
            .source
            .write_sync(
                "create_object",
                || {
                    format!(
                        "INSERT INTO {} (unique_id, deployable_id, owner_id, instance_id, worldspace, \
                         inventory, damage, hitpoints, fuel, created, combination) \
                         SELECT $1, d.id, $2, $3, $4, $5, $6, $7, $8, NOW(), $9 \
                         FROM deployable d WHERE d.class_name = $10",
                        self.deployable_table
                    )
                },
                vec![
                    SqlParam::Int64(object.unique_id),
                    SqlParam::Int32(object.owner_id),
                    SqlParam::Int32(server_id),
                    SqlParam::text(object.worldspace.to_string()),
                    SqlParam::text(object.inventory.to_string()),
                    SqlParam::Double(object.damage),
                    SqlParam::text(object.hitpoints.to_string()),
                    SqlParam::Double(object.fuel),
                    SqlParam::Int32(object.combination_id),
                    SqlParam::text(object.class_name.as_str()),
                ],
            )
            .await?;

        if inserted == 0 {
            tracing::warn!(
                server_id,
                unique_id = object.unique_id,
                class_name = %object.class_name,
                "Not creating object of unknown class"
            );
        }
        Ok(inserted > 0)
    }
}

/// Parse a nullable SQF column; `NULL` reads as `[]`.
fn sqf_or_empty(field: &Field) -> Option<Value> {
    field
        .as_str()
        .map_or(Some(Value::empty_array()), |text| hive_sqf::parse(text).ok())
}

/// Parse a nullable numeric column; `NULL` reads as 0.
fn number_or_zero(field: &Field) -> Option<f64> {
    if field.is_null() { Some(0.0) } else { field.get_f64() }
}
