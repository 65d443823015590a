//! SQLite-backed resource store.
//!
//! # Responsibility
//! - Implement `ResourceStore` over the schema in `db/migrations`.
//! - Emit `ChangeEvent`s for parent instance writes on an optional channel.
//! - Provide upstream seeding APIs (services, slices, images, tenants) used
//!   by tenancy tooling and tests.
//!
//! # Invariants
//! - Timestamps are epoch milliseconds; forced bumps use
//!   `MAX(updated_at + 1, now)` so the value strictly advances even within
//!   the same millisecond.
//! - Change events are sent only after the write statement succeeded.
//! - Deleting a workload removes its mounts and the artifacts they bind in
//!   one transaction.

use super::resource_store::{
    persisted_id, ChangeEvent, ChangeKind, ResourceKind, ResourceStore, SaveOptions, StoreError,
    StoreResult,
};
use crate::model::artifact::{ConfigArtifact, ConfigMount, SecretArtifact, SecretMount};
use crate::model::compute::{
    ComputeService, Image, InstanceClass, Slice, TrustDomain, WorkloadInstance,
};
use crate::model::instance::{Color, EmbeddedImage, ExampleService, ServiceInstance};
use crate::model::ResourceId;
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Params, Row};
use std::sync::mpsc::{self, Receiver, Sender};

const NOW_MS_SQL: &str = "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)";

const SERVICE_INSTANCE_SELECT_SQL: &str = "SELECT
    id,
    name,
    owner_id,
    tenant_message,
    tenant_secret,
    foreground_color_id,
    background_color_id,
    compute_instance_id,
    is_deleted,
    updated_at
FROM service_instances";

const WORKLOAD_SELECT_SQL: &str = "SELECT
    id,
    name,
    owner_id,
    slice_id,
    image_id,
    class,
    no_sync,
    updated_at
FROM compute_instances";

const SLICE_SELECT_SQL: &str =
    "SELECT id, name, service_id, trust_domain_id, default_image_id FROM slices";

/// SQLite resource store borrowing one connection.
#[derive(Clone)]
pub struct SqliteResourceStore<'conn> {
    conn: &'conn Connection,
    changes: Option<Sender<ChangeEvent>>,
}

impl<'conn> SqliteResourceStore<'conn> {
    /// Creates a store without change notifications.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            changes: None,
        }
    }

    /// Creates a store whose parent-instance writes are published on the
    /// returned receiver.
    pub fn with_change_feed(conn: &'conn Connection) -> (Self, Receiver<ChangeEvent>) {
        let (sender, receiver) = mpsc::channel();
        let store = Self {
            conn,
            changes: Some(sender),
        };
        (store, receiver)
    }

    /// Registers an owning service.
    pub fn create_example_service(&self, service: &mut ExampleService) -> StoreResult<ResourceId> {
        service.validate()?;
        self.conn.execute(
            "INSERT INTO example_services (name, service_message, service_secret)
             VALUES (?1, ?2, ?3);",
            params![
                service.name.as_str(),
                service.service_message.as_str(),
                service.service_secret.as_str(),
            ],
        )?;
        Ok(assign_id(&mut service.id, self.conn.last_insert_rowid()))
    }

    /// Registers a compute provider.
    pub fn create_compute_service(&self, service: &mut ComputeService) -> StoreResult<ResourceId> {
        service.validate()?;
        self.conn.execute(
            "INSERT INTO compute_services (name, instance_class) VALUES (?1, ?2);",
            params![
                service.name.as_str(),
                service.instance_class.map(instance_class_to_db),
            ],
        )?;
        Ok(assign_id(&mut service.id, self.conn.last_insert_rowid()))
    }

    pub fn create_trust_domain(&self, domain: &mut TrustDomain) -> StoreResult<ResourceId> {
        domain.validate()?;
        self.conn.execute(
            "INSERT INTO trust_domains (name, owner_id) VALUES (?1, ?2);",
            params![domain.name.as_str(), domain.owner_id],
        )?;
        Ok(assign_id(&mut domain.id, self.conn.last_insert_rowid()))
    }

    pub fn create_image(&self, image: &mut Image) -> StoreResult<ResourceId> {
        image.validate()?;
        self.conn.execute(
            "INSERT INTO images (name, tag, kind) VALUES (?1, ?2, ?3);",
            params![image.name.as_str(), image.tag.as_str(), image.kind.as_str()],
        )?;
        Ok(assign_id(&mut image.id, self.conn.last_insert_rowid()))
    }

    pub fn create_slice(&self, slice: &mut Slice) -> StoreResult<ResourceId> {
        slice.validate()?;
        self.conn.execute(
            "INSERT INTO slices (name, service_id, trust_domain_id, default_image_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                slice.name.as_str(),
                slice.service_id,
                slice.trust_domain_id,
                slice.default_image_id,
            ],
        )?;
        Ok(assign_id(&mut slice.id, self.conn.last_insert_rowid()))
    }

    pub fn create_color(&self, color: &mut Color) -> StoreResult<ResourceId> {
        color.validate()?;
        self.conn.execute(
            "INSERT INTO colors (name, html_code) VALUES (?1, ?2);",
            params![color.name.as_str(), color.html_code.as_str()],
        )?;
        Ok(assign_id(&mut color.id, self.conn.last_insert_rowid()))
    }

    pub fn create_embedded_image(&self, image: &mut EmbeddedImage) -> StoreResult<ResourceId> {
        image.validate()?;
        self.conn.execute(
            "INSERT INTO embedded_images (name, url) VALUES (?1, ?2);",
            params![image.name.as_str(), image.url.as_str()],
        )?;
        Ok(assign_id(&mut image.id, self.conn.last_insert_rowid()))
    }

    /// Links an embedded image to a parent at a display position.
    pub fn attach_embedded_image(
        &self,
        instance_id: ResourceId,
        image_id: ResourceId,
        position: i64,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO service_instance_images (service_instance_id, embedded_image_id, position)
             VALUES (?1, ?2, ?3);",
            params![instance_id, image_id, position],
        )?;
        Ok(())
    }

    /// Creates a parent instance and publishes `ChangeKind::Created`.
    pub fn create_service_instance(
        &self,
        instance: &mut ServiceInstance,
    ) -> StoreResult<ResourceId> {
        instance.validate()?;
        self.conn.execute(
            &format!(
                "INSERT INTO service_instances (
                    name,
                    owner_id,
                    tenant_message,
                    tenant_secret,
                    foreground_color_id,
                    background_color_id,
                    compute_instance_id,
                    is_deleted,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, {NOW_MS_SQL});"
            ),
            params![
                instance.name.as_str(),
                instance.owner_id,
                instance.tenant_message.as_str(),
                instance.tenant_secret.as_str(),
                instance.foreground_color_id,
                instance.background_color_id,
                instance.compute_instance_id,
                bool_to_int(instance.is_deleted),
            ],
        )?;
        let id = assign_id(&mut instance.id, self.conn.last_insert_rowid());
        instance.updated_at = self.read_updated_at("service_instances", id)?;
        self.notify(ChangeKind::Created, id);
        Ok(id)
    }

    /// Tombstones a parent instance and publishes `ChangeKind::Deleted`.
    ///
    /// The row stays readable with `include_deleted` until the delete policy
    /// ran and the caller purges it.
    pub fn mark_service_instance_deleted(&self, id: ResourceId) -> StoreResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE service_instances
                 SET is_deleted = 1, updated_at = MAX(updated_at + 1, {NOW_MS_SQL})
                 WHERE id = ?1;"
            ),
            [id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: ResourceKind::ServiceInstance,
                id,
            });
        }
        self.notify(ChangeKind::Deleted, id);
        Ok(())
    }

    fn notify(&self, kind: ChangeKind, instance_id: ResourceId) {
        let Some(sender) = &self.changes else {
            return;
        };
        if sender.send(ChangeEvent { kind, instance_id }).is_err() {
            warn!(
                "event=change_publish module=store status=dropped kind={} instance_id={}",
                kind.as_str(),
                instance_id
            );
        }
    }

    fn read_updated_at(&self, table: &'static str, id: ResourceId) -> StoreResult<i64> {
        let value = self.conn.query_row(
            &format!("SELECT updated_at FROM {table} WHERE id = ?1;"),
            [id],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(value)
    }

    fn query_optional<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        parse: impl Fn(&Row<'_>) -> StoreResult<T>,
    ) -> StoreResult<Option<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(parse(row)?)),
            None => Ok(None),
        }
    }

    fn query_all<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        parse: impl Fn(&Row<'_>) -> StoreResult<T>,
    ) -> StoreResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse(row)?);
        }
        Ok(items)
    }

    /// Writes the selected subset of `columns` for one row.
    fn update_columns(
        &self,
        kind: ResourceKind,
        table: &'static str,
        id: ResourceId,
        columns: Vec<(&'static str, Value)>,
        options: &SaveOptions,
        timestamped: bool,
    ) -> StoreResult<()> {
        if let Some(fields) = &options.update_fields {
            if let Some(unknown) = fields
                .iter()
                .find(|field| !columns.iter().any(|(name, _)| name == *field))
            {
                return Err(StoreError::UnknownField {
                    kind,
                    field: unknown.to_string(),
                });
            }
        }

        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (name, value) in columns {
            if options.includes(name) {
                values.push(value);
                assignments.push(format!("{name} = ?{}", values.len()));
            }
        }
        if timestamped && options.bumps_timestamp() {
            assignments.push(format!("updated_at = MAX(updated_at + 1, {NOW_MS_SQL})"));
        }
        if assignments.is_empty() {
            // Empty subset still checks that the row exists.
            assignments.push("id = id".to_string());
        }

        values.push(Value::Integer(id));
        let sql = format!(
            "UPDATE {table} SET {} WHERE id = ?{};",
            assignments.join(", "),
            values.len()
        );
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(StoreError::NotFound { kind, id });
        }

        debug!(
            "event=store_save module=store kind={} id={} touched={}",
            kind.as_str(),
            id,
            timestamped && options.bumps_timestamp()
        );
        Ok(())
    }
}

impl ResourceStore for SqliteResourceStore<'_> {
    fn find_service_instances(&self, name: &str) -> StoreResult<Vec<ServiceInstance>> {
        self.query_all(
            &format!(
                "{SERVICE_INSTANCE_SELECT_SQL}
                 WHERE name = ?1 AND is_deleted = 0
                 ORDER BY id ASC;"
            ),
            [name],
            parse_service_instance_row,
        )
    }

    fn get_service_instance(
        &self,
        id: ResourceId,
        include_deleted: bool,
    ) -> StoreResult<Option<ServiceInstance>> {
        self.query_optional(
            &format!(
                "{SERVICE_INSTANCE_SELECT_SQL}
                 WHERE id = ?1
                   AND (?2 = 1 OR is_deleted = 0);"
            ),
            params![id, bool_to_int(include_deleted)],
            parse_service_instance_row,
        )
    }

    fn list_service_instances(&self, include_deleted: bool) -> StoreResult<Vec<ServiceInstance>> {
        self.query_all(
            &format!(
                "{SERVICE_INSTANCE_SELECT_SQL}
                 WHERE ?1 = 1 OR is_deleted = 0
                 ORDER BY id ASC;"
            ),
            [bool_to_int(include_deleted)],
            parse_service_instance_row,
        )
    }

    fn get_example_service(&self, id: ResourceId) -> StoreResult<Option<ExampleService>> {
        self.query_optional(
            "SELECT id, name, service_message, service_secret
             FROM example_services
             WHERE id = ?1;",
            [id],
            |row| {
                Ok(ExampleService {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    service_message: row.get("service_message")?,
                    service_secret: row.get("service_secret")?,
                })
            },
        )
    }

    fn first_compute_service(&self) -> StoreResult<Option<ComputeService>> {
        self.query_optional(
            "SELECT id, name, instance_class
             FROM compute_services
             ORDER BY id ASC
             LIMIT 1;",
            params![],
            |row| {
                let instance_class = match row.get::<_, Option<String>>("instance_class")? {
                    Some(value) => Some(parse_instance_class(&value)?),
                    None => None,
                };
                Ok(ComputeService {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    instance_class,
                })
            },
        )
    }

    fn service_instance_class(
        &self,
        service_id: ResourceId,
    ) -> StoreResult<Option<InstanceClass>> {
        let class = self.query_optional(
            "SELECT instance_class FROM compute_services WHERE id = ?1;",
            [service_id],
            |row| match row.get::<_, Option<String>>("instance_class")? {
                Some(value) => Ok(Some(parse_instance_class(&value)?)),
                None => Ok(None),
            },
        )?;
        Ok(class.flatten())
    }

    fn slices_of(&self, service_id: ResourceId) -> StoreResult<Vec<Slice>> {
        self.query_all(
            &format!("{SLICE_SELECT_SQL} WHERE service_id = ?1 ORDER BY id ASC;"),
            [service_id],
            |row| {
                Ok(Slice {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    service_id: row.get("service_id")?,
                    trust_domain_id: row.get("trust_domain_id")?,
                    default_image_id: row.get("default_image_id")?,
                })
            },
        )
    }

    fn get_image(&self, id: ResourceId) -> StoreResult<Option<Image>> {
        self.query_optional(
            "SELECT id, name, tag, kind FROM images WHERE id = ?1;",
            [id],
            |row| {
                Ok(Image {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    tag: row.get("tag")?,
                    kind: row.get("kind")?,
                })
            },
        )
    }

    fn get_color(&self, id: ResourceId) -> StoreResult<Option<Color>> {
        self.query_optional(
            "SELECT id, name, html_code FROM colors WHERE id = ?1;",
            [id],
            |row| {
                Ok(Color {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    html_code: row.get("html_code")?,
                })
            },
        )
    }

    fn embedded_images(&self, instance_id: ResourceId) -> StoreResult<Vec<EmbeddedImage>> {
        self.query_all(
            "SELECT e.id, e.name, e.url
             FROM embedded_images e
             JOIN service_instance_images l ON l.embedded_image_id = e.id
             WHERE l.service_instance_id = ?1
             ORDER BY l.position ASC, e.id ASC;",
            [instance_id],
            |row| {
                Ok(EmbeddedImage {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    url: row.get("url")?,
                })
            },
        )
    }

    fn get_workload(&self, id: ResourceId) -> StoreResult<Option<WorkloadInstance>> {
        self.query_optional(
            &format!("{WORKLOAD_SELECT_SQL} WHERE id = ?1;"),
            [id],
            parse_workload_row,
        )
    }

    fn config_mounts(&self, workload_id: ResourceId) -> StoreResult<Vec<ConfigMount>> {
        self.query_all(
            "SELECT id, config_id, compute_instance_id, mount_path
             FROM config_mounts
             WHERE compute_instance_id = ?1
             ORDER BY id ASC;",
            [workload_id],
            |row| {
                Ok(ConfigMount {
                    id: Some(row.get("id")?),
                    config_id: row.get("config_id")?,
                    workload_id: row.get("compute_instance_id")?,
                    mount_path: row.get("mount_path")?,
                })
            },
        )
    }

    fn secret_mounts(&self, workload_id: ResourceId) -> StoreResult<Vec<SecretMount>> {
        self.query_all(
            "SELECT id, secret_id, compute_instance_id, mount_path
             FROM secret_mounts
             WHERE compute_instance_id = ?1
             ORDER BY id ASC;",
            [workload_id],
            |row| {
                Ok(SecretMount {
                    id: Some(row.get("id")?),
                    secret_id: row.get("secret_id")?,
                    workload_id: row.get("compute_instance_id")?,
                    mount_path: row.get("mount_path")?,
                })
            },
        )
    }

    fn get_config_artifact(&self, id: ResourceId) -> StoreResult<Option<ConfigArtifact>> {
        self.query_optional(
            "SELECT id, name, trust_domain_id, data, updated_at
             FROM config_artifacts
             WHERE id = ?1;",
            [id],
            |row| {
                Ok(ConfigArtifact {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    trust_domain_id: row.get("trust_domain_id")?,
                    data: row.get("data")?,
                    updated_at: row.get("updated_at")?,
                })
            },
        )
    }

    fn get_secret_artifact(&self, id: ResourceId) -> StoreResult<Option<SecretArtifact>> {
        self.query_optional(
            "SELECT id, name, trust_domain_id, data FROM secret_artifacts WHERE id = ?1;",
            [id],
            |row| {
                Ok(SecretArtifact {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    trust_domain_id: row.get("trust_domain_id")?,
                    data: row.get("data")?,
                })
            },
        )
    }

    fn save_service_instance(
        &self,
        instance: &ServiceInstance,
        options: &SaveOptions,
    ) -> StoreResult<()> {
        instance.validate()?;
        let id = persisted_id(ResourceKind::ServiceInstance, instance.id)?;
        self.update_columns(
            ResourceKind::ServiceInstance,
            "service_instances",
            id,
            vec![
                ("name", Value::Text(instance.name.clone())),
                ("owner_id", Value::Integer(instance.owner_id)),
                (
                    ServiceInstance::FIELD_TENANT_MESSAGE,
                    Value::Text(instance.tenant_message.clone()),
                ),
                ("tenant_secret", Value::Text(instance.tenant_secret.clone())),
                ("foreground_color_id", optional_id(instance.foreground_color_id)),
                ("background_color_id", optional_id(instance.background_color_id)),
                (
                    ServiceInstance::FIELD_COMPUTE_INSTANCE,
                    optional_id(instance.compute_instance_id),
                ),
                ("is_deleted", Value::Integer(bool_to_int(instance.is_deleted))),
            ],
            options,
            true,
        )?;
        self.notify(ChangeKind::Updated, id);
        Ok(())
    }

    fn purge_service_instance(&self, id: ResourceId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM service_instances WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: ResourceKind::ServiceInstance,
                id,
            });
        }
        debug!("event=store_purge module=store kind=service_instance id={id}");
        Ok(())
    }

    fn create_workload(&self, workload: &mut WorkloadInstance) -> StoreResult<ResourceId> {
        workload.validate()?;
        self.conn.execute(
            &format!(
                "INSERT INTO compute_instances (
                    name,
                    owner_id,
                    slice_id,
                    image_id,
                    class,
                    no_sync,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, {NOW_MS_SQL});"
            ),
            params![
                workload.name.as_str(),
                workload.owner_id,
                workload.slice_id,
                workload.image_id,
                instance_class_to_db(workload.class),
                bool_to_int(workload.no_sync),
            ],
        )?;
        let id = assign_id(&mut workload.id, self.conn.last_insert_rowid());
        workload.updated_at = self.read_updated_at("compute_instances", id)?;
        Ok(id)
    }

    fn save_workload(
        &self,
        workload: &WorkloadInstance,
        options: &SaveOptions,
    ) -> StoreResult<()> {
        workload.validate()?;
        let id = persisted_id(ResourceKind::WorkloadInstance, workload.id)?;
        self.update_columns(
            ResourceKind::WorkloadInstance,
            "compute_instances",
            id,
            vec![
                ("name", Value::Text(workload.name.clone())),
                ("owner_id", Value::Integer(workload.owner_id)),
                ("slice_id", Value::Integer(workload.slice_id)),
                ("image_id", Value::Integer(workload.image_id)),
                (
                    "class",
                    Value::Text(instance_class_to_db(workload.class).to_string()),
                ),
                (
                    WorkloadInstance::FIELD_NO_SYNC,
                    Value::Integer(bool_to_int(workload.no_sync)),
                ),
            ],
            options,
            true,
        )
    }

    fn delete_workload(&self, id: ResourceId) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM config_artifacts
             WHERE id IN (SELECT config_id FROM config_mounts WHERE compute_instance_id = ?1);",
            [id],
        )?;
        tx.execute(
            "DELETE FROM secret_artifacts
             WHERE id IN (SELECT secret_id FROM secret_mounts WHERE compute_instance_id = ?1);",
            [id],
        )?;
        let changed = tx.execute("DELETE FROM compute_instances WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: ResourceKind::WorkloadInstance,
                id,
            });
        }
        tx.commit()?;
        debug!("event=store_delete module=store kind=workload_instance id={id}");
        Ok(())
    }

    fn create_config_artifact(&self, artifact: &mut ConfigArtifact) -> StoreResult<ResourceId> {
        artifact.validate()?;
        self.conn.execute(
            &format!(
                "INSERT INTO config_artifacts (name, trust_domain_id, data, updated_at)
                 VALUES (?1, ?2, ?3, {NOW_MS_SQL});"
            ),
            params![
                artifact.name.as_str(),
                artifact.trust_domain_id,
                artifact.data.as_str(),
            ],
        )?;
        let id = assign_id(&mut artifact.id, self.conn.last_insert_rowid());
        artifact.updated_at = self.read_updated_at("config_artifacts", id)?;
        Ok(id)
    }

    fn save_config_artifact(
        &self,
        artifact: &ConfigArtifact,
        options: &SaveOptions,
    ) -> StoreResult<()> {
        artifact.validate()?;
        let id = persisted_id(ResourceKind::ConfigArtifact, artifact.id)?;
        self.update_columns(
            ResourceKind::ConfigArtifact,
            "config_artifacts",
            id,
            vec![
                ("name", Value::Text(artifact.name.clone())),
                ("trust_domain_id", Value::Integer(artifact.trust_domain_id)),
                ("data", Value::Text(artifact.data.clone())),
            ],
            options,
            true,
        )
    }

    fn create_config_mount(&self, mount: &mut ConfigMount) -> StoreResult<ResourceId> {
        mount.validate()?;
        self.conn.execute(
            "INSERT INTO config_mounts (config_id, compute_instance_id, mount_path)
             VALUES (?1, ?2, ?3);",
            params![mount.config_id, mount.workload_id, mount.mount_path.as_str()],
        )?;
        Ok(assign_id(&mut mount.id, self.conn.last_insert_rowid()))
    }

    fn create_secret_artifact(&self, artifact: &mut SecretArtifact) -> StoreResult<ResourceId> {
        artifact.validate()?;
        self.conn.execute(
            "INSERT INTO secret_artifacts (name, trust_domain_id, data) VALUES (?1, ?2, ?3);",
            params![
                artifact.name.as_str(),
                artifact.trust_domain_id,
                artifact.data.as_str(),
            ],
        )?;
        Ok(assign_id(&mut artifact.id, self.conn.last_insert_rowid()))
    }

    fn create_secret_mount(&self, mount: &mut SecretMount) -> StoreResult<ResourceId> {
        mount.validate()?;
        self.conn.execute(
            "INSERT INTO secret_mounts (secret_id, compute_instance_id, mount_path)
             VALUES (?1, ?2, ?3);",
            params![mount.secret_id, mount.workload_id, mount.mount_path.as_str()],
        )?;
        Ok(assign_id(&mut mount.id, self.conn.last_insert_rowid()))
    }
}

fn parse_service_instance_row(row: &Row<'_>) -> StoreResult<ServiceInstance> {
    let instance = ServiceInstance {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        owner_id: row.get("owner_id")?,
        tenant_message: row.get("tenant_message")?,
        tenant_secret: row.get("tenant_secret")?,
        foreground_color_id: row.get("foreground_color_id")?,
        background_color_id: row.get("background_color_id")?,
        compute_instance_id: row.get("compute_instance_id")?,
        is_deleted: parse_flag(row, "is_deleted", "service_instances.is_deleted")?,
        updated_at: row.get("updated_at")?,
    };
    instance.validate()?;
    Ok(instance)
}

fn parse_workload_row(row: &Row<'_>) -> StoreResult<WorkloadInstance> {
    let class_text: String = row.get("class")?;
    Ok(WorkloadInstance {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        owner_id: row.get("owner_id")?,
        slice_id: row.get("slice_id")?,
        image_id: row.get("image_id")?,
        class: parse_instance_class(&class_text)?,
        no_sync: parse_flag(row, "no_sync", "compute_instances.no_sync")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_flag(row: &Row<'_>, column: &str, qualified: &str) -> StoreResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid flag value `{other}` in {qualified}"
        ))),
    }
}

fn instance_class_to_db(class: InstanceClass) -> &'static str {
    match class {
        InstanceClass::KubernetesServiceInstance => "kubernetes_service_instance",
    }
}

fn parse_instance_class(value: &str) -> StoreResult<InstanceClass> {
    match value {
        "kubernetes_service_instance" => Ok(InstanceClass::KubernetesServiceInstance),
        other => Err(StoreError::InvalidData(format!(
            "invalid instance class `{other}`"
        ))),
    }
}

fn assign_id(slot: &mut Option<ResourceId>, id: ResourceId) -> ResourceId {
    *slot = Some(id);
    id
}

fn optional_id(id: Option<ResourceId>) -> Value {
    match id {
        Some(value) => Value::Integer(value),
        None => Value::Null,
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
