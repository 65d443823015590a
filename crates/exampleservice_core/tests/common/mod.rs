#![allow(dead_code)]

use exampleservice_core::{
    Color, ComputeService, ConfigArtifact, ConfigMount, EmbeddedImage, ExampleService, Image,
    InstanceClass, ResourceId, ResourceStore, SaveOptions, SecretArtifact, SecretMount,
    ServiceInstance, Slice, SqliteResourceStore, StoreError, StoreResult, TrustDomain,
    WorkloadInstance,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Ids of the shared topology every instance provisions into.
#[derive(Debug, Clone, Copy)]
pub struct Topology {
    pub service_id: ResourceId,
    pub compute_service_id: ResourceId,
    pub trust_domain_id: ResourceId,
    pub image_id: ResourceId,
    pub slice_id: ResourceId,
}

/// Seeds owning service, compute provider, trust domain, image and slice.
pub fn seed_topology(store: &SqliteResourceStore<'_>) -> Topology {
    let mut service = ExampleService::new("exampleservice", "hello", "servicesecret");
    let service_id = store.create_example_service(&mut service).unwrap();
    let compute_service_id =
        seed_compute_service(store, Some(InstanceClass::KubernetesServiceInstance));
    let trust_domain_id = store
        .create_trust_domain(&mut TrustDomain::new("default", compute_service_id))
        .unwrap();
    let image_id = store
        .create_image(&mut Image::new("httpd", "2.4", "container"))
        .unwrap();
    let slice_id = store
        .create_slice(&mut Slice::new(
            "exampleservice-slice",
            service_id,
            trust_domain_id,
            Some(image_id),
        ))
        .unwrap();

    Topology {
        service_id,
        compute_service_id,
        trust_domain_id,
        image_id,
        slice_id,
    }
}

pub fn seed_compute_service(
    store: &SqliteResourceStore<'_>,
    class: Option<InstanceClass>,
) -> ResourceId {
    store
        .create_compute_service(&mut ComputeService::new("kubernetes", class))
        .unwrap()
}

/// Creates a parent instance owned by the seeded service.
pub fn seed_instance(
    store: &SqliteResourceStore<'_>,
    topology: &Topology,
    name: &str,
    message: &str,
) -> ServiceInstance {
    let mut instance = ServiceInstance::new(name, topology.service_id, message, "tenantsecret");
    store.create_service_instance(&mut instance).unwrap();
    instance
}

pub fn seed_color(store: &SqliteResourceStore<'_>, name: &str, code: &str) -> ResourceId {
    store.create_color(&mut Color::new(name, code)).unwrap()
}

pub fn seed_embedded_image(
    store: &SqliteResourceStore<'_>,
    instance_id: ResourceId,
    name: &str,
    url: &str,
    position: i64,
) -> ResourceId {
    let image_id = store
        .create_embedded_image(&mut EmbeddedImage::new(name, url))
        .unwrap();
    store
        .attach_embedded_image(instance_id, image_id, position)
        .unwrap();
    image_id
}

/// One write observed by `RecordingStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    SaveServiceInstance {
        id: ResourceId,
        options: SaveOptions,
    },
    PurgeServiceInstance(ResourceId),
    CreateWorkload {
        no_sync: bool,
    },
    SaveWorkload {
        id: ResourceId,
        no_sync: bool,
        options: SaveOptions,
    },
    DeleteWorkload(ResourceId),
    CreateConfigArtifact,
    SaveConfigArtifact {
        id: ResourceId,
        options: SaveOptions,
    },
    CreateConfigMount,
    CreateSecretArtifact,
    CreateSecretMount,
}

pub type WriteLog = Rc<RefCell<Vec<Write>>>;

/// Store wrapper that records every write before delegating.
///
/// Built with `failing_at`, it refuses the matching write after recording it.
pub struct RecordingStore<S: ResourceStore> {
    inner: S,
    log: WriteLog,
    fail_at: Option<Write>,
}

impl<S: ResourceStore> RecordingStore<S> {
    pub fn new(inner: S) -> (Self, WriteLog) {
        Self::build(inner, None)
    }

    pub fn failing_at(inner: S, write: Write) -> (Self, WriteLog) {
        Self::build(inner, Some(write))
    }

    fn build(inner: S, fail_at: Option<Write>) -> (Self, WriteLog) {
        let log = WriteLog::default();
        (
            Self {
                inner,
                log: Rc::clone(&log),
                fail_at,
            },
            log,
        )
    }

    fn record(&self, write: Write) -> StoreResult<()> {
        let refused = self.fail_at.as_ref() == Some(&write);
        self.log.borrow_mut().push(write);
        if refused {
            return Err(StoreError::InvalidData("write refused".to_string()));
        }
        Ok(())
    }
}

impl<S: ResourceStore> ResourceStore for RecordingStore<S> {
    fn find_service_instances(&self, name: &str) -> StoreResult<Vec<ServiceInstance>> {
        self.inner.find_service_instances(name)
    }

    fn get_service_instance(
        &self,
        id: ResourceId,
        include_deleted: bool,
    ) -> StoreResult<Option<ServiceInstance>> {
        self.inner.get_service_instance(id, include_deleted)
    }

    fn list_service_instances(&self, include_deleted: bool) -> StoreResult<Vec<ServiceInstance>> {
        self.inner.list_service_instances(include_deleted)
    }

    fn get_example_service(&self, id: ResourceId) -> StoreResult<Option<ExampleService>> {
        self.inner.get_example_service(id)
    }

    fn first_compute_service(&self) -> StoreResult<Option<ComputeService>> {
        self.inner.first_compute_service()
    }

    fn service_instance_class(
        &self,
        service_id: ResourceId,
    ) -> StoreResult<Option<InstanceClass>> {
        self.inner.service_instance_class(service_id)
    }

    fn slices_of(&self, service_id: ResourceId) -> StoreResult<Vec<Slice>> {
        self.inner.slices_of(service_id)
    }

    fn get_image(&self, id: ResourceId) -> StoreResult<Option<Image>> {
        self.inner.get_image(id)
    }

    fn get_color(&self, id: ResourceId) -> StoreResult<Option<Color>> {
        self.inner.get_color(id)
    }

    fn embedded_images(&self, instance_id: ResourceId) -> StoreResult<Vec<EmbeddedImage>> {
        self.inner.embedded_images(instance_id)
    }

    fn get_workload(&self, id: ResourceId) -> StoreResult<Option<WorkloadInstance>> {
        self.inner.get_workload(id)
    }

    fn config_mounts(&self, workload_id: ResourceId) -> StoreResult<Vec<ConfigMount>> {
        self.inner.config_mounts(workload_id)
    }

    fn secret_mounts(&self, workload_id: ResourceId) -> StoreResult<Vec<SecretMount>> {
        self.inner.secret_mounts(workload_id)
    }

    fn get_config_artifact(&self, id: ResourceId) -> StoreResult<Option<ConfigArtifact>> {
        self.inner.get_config_artifact(id)
    }

    fn get_secret_artifact(&self, id: ResourceId) -> StoreResult<Option<SecretArtifact>> {
        self.inner.get_secret_artifact(id)
    }

    fn save_service_instance(
        &self,
        instance: &ServiceInstance,
        options: &SaveOptions,
    ) -> StoreResult<()> {
        self.record(Write::SaveServiceInstance {
            id: instance.id.unwrap_or_default(),
            options: options.clone(),
        })?;
        self.inner.save_service_instance(instance, options)
    }

    fn purge_service_instance(&self, id: ResourceId) -> StoreResult<()> {
        self.record(Write::PurgeServiceInstance(id))?;
        self.inner.purge_service_instance(id)
    }

    fn create_workload(&self, workload: &mut WorkloadInstance) -> StoreResult<ResourceId> {
        self.record(Write::CreateWorkload {
            no_sync: workload.no_sync,
        })?;
        self.inner.create_workload(workload)
    }

    fn save_workload(
        &self,
        workload: &WorkloadInstance,
        options: &SaveOptions,
    ) -> StoreResult<()> {
        self.record(Write::SaveWorkload {
            id: workload.id.unwrap_or_default(),
            no_sync: workload.no_sync,
            options: options.clone(),
        })?;
        self.inner.save_workload(workload, options)
    }

    fn delete_workload(&self, id: ResourceId) -> StoreResult<()> {
        self.record(Write::DeleteWorkload(id))?;
        self.inner.delete_workload(id)
    }

    fn create_config_artifact(&self, artifact: &mut ConfigArtifact) -> StoreResult<ResourceId> {
        self.record(Write::CreateConfigArtifact)?;
        self.inner.create_config_artifact(artifact)
    }

    fn save_config_artifact(
        &self,
        artifact: &ConfigArtifact,
        options: &SaveOptions,
    ) -> StoreResult<()> {
        self.record(Write::SaveConfigArtifact {
            id: artifact.id.unwrap_or_default(),
            options: options.clone(),
        })?;
        self.inner.save_config_artifact(artifact, options)
    }

    fn create_config_mount(&self, mount: &mut ConfigMount) -> StoreResult<ResourceId> {
        self.record(Write::CreateConfigMount)?;
        self.inner.create_config_mount(mount)
    }

    fn create_secret_artifact(&self, artifact: &mut SecretArtifact) -> StoreResult<ResourceId> {
        self.record(Write::CreateSecretArtifact)?;
        self.inner.create_secret_artifact(artifact)
    }

    fn create_secret_mount(&self, mount: &mut SecretMount) -> StoreResult<ResourceId> {
        self.record(Write::CreateSecretMount)?;
        self.inner.create_secret_mount(mount)
    }
}
