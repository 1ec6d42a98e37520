// ABOUTME: One concrete container of a service: name, run arguments, fingerprint.
// ABOUTME: Pairs the declared form with whatever the runtime reported for it.

use super::labels;
use super::project::ProjectId;
use super::service::ServiceDefinition;
use crate::state::ObservedState;
use crate::types::{Color, ImageRef, RunFingerprint, ServiceName};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Concrete container name of each service's first instance, used to
/// resolve links and volumes-from.
pub type LinkTargets = BTreeMap<ServiceName, String>;

/// A single declared (or retired) container.
///
/// The run-argument vector and its fingerprint are recomputed whenever the
/// name changes, so they always describe exactly what `run` would launch.
#[derive(Debug, Clone)]
pub struct ContainerInstance {
    project: ProjectId,
    service: Arc<ServiceDefinition>,
    number: u32,
    color: Option<Color>,
    name: String,
    links: Vec<String>,
    volumes_from: Vec<String>,
    run_args: Vec<String>,
    fingerprint: RunFingerprint,
    observed: Option<ObservedState>,
}

impl ContainerInstance {
    /// Instance `number` of a service as declared. Blue-green services start
    /// out blue.
    pub fn declare(
        project: &ProjectId,
        service: Arc<ServiceDefinition>,
        number: u32,
        targets: &LinkTargets,
    ) -> Self {
        let color = service.blue_green.then_some(Color::Blue);
        let mut instance = Self {
            project: project.clone(),
            service,
            number,
            color,
            name: String::new(),
            links: Vec::new(),
            volumes_from: Vec::new(),
            run_args: Vec::new(),
            fingerprint: RunFingerprint::of::<&str>(&[]),
            observed: None,
        };
        instance.resolve(targets);
        instance
    }

    /// A live container that is no longer wanted. It keeps the runtime's name
    /// so teardown addresses the right container.
    pub fn retired(project: &ProjectId, service: Arc<ServiceDefinition>, observed: ObservedState) -> Self {
        let mut instance = Self::declare(project, service, observed.instance_number, &LinkTargets::new());
        if instance.service.blue_green {
            instance.color = Some(observed.color);
        }
        instance.name = observed.name.clone();
        instance.observed = Some(observed);
        instance
    }

    /// Attach the runtime's view of this instance. Blue-green services adopt
    /// the observed color, which can change the name and arguments.
    pub fn observe(&mut self, observed: ObservedState) {
        if self.service.blue_green {
            self.color = Some(observed.color);
            self.rebuild();
        }
        self.observed = Some(observed);
    }

    /// Resolve links and volumes-from against the given targets, falling
    /// back to the uncolored name of the target's first instance.
    pub fn resolve(&mut self, targets: &LinkTargets) {
        let target = |service: &ServiceName| {
            targets
                .get(service)
                .cloned()
                .unwrap_or_else(|| self.project.instance_name(service, None, 1))
        };
        self.links = self
            .service
            .links
            .iter()
            .map(|link| match &link.alias {
                Some(alias) => format!("{}:{alias}", target(&link.service)),
                None => target(&link.service),
            })
            .collect();
        self.volumes_from = self.service.volumes_from.iter().map(target).collect();
        self.rebuild();
    }

    /// A fresh copy of this instance under another color, with no observed
    /// state. Used for the incoming side of a blue-green swap.
    pub fn recolored(&self, color: Color) -> Self {
        let mut next = self.clone();
        next.color = Some(color);
        next.observed = None;
        next.rebuild();
        next
    }

    fn rebuild(&mut self) {
        self.name = self
            .project
            .instance_name(&self.service.name, self.color, self.number);
        self.run_args = self.build_run_args();
        self.fingerprint = RunFingerprint::of(&self.run_args);
    }

    fn labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![
            (labels::PROJECT, self.project.name().to_string()),
            (labels::SERVICE, self.service_name()),
            (labels::SERVICE_TYPE, self.service.name.to_string()),
            (labels::INSTANCE, self.number.to_string()),
        ];
        if let Some(color) = self.color {
            labels.push((labels::COLOR, color.to_string()));
        }
        labels
    }

    fn build_run_args(&self) -> Vec<String> {
        let mut args = vec!["--name".to_string(), self.name.clone()];
        for (key, value) in self.labels() {
            args.push("--label".to_string());
            args.push(format!("{key}={value}"));
        }
        args.extend(self.service.create_args.iter().cloned());
        for link in &self.links {
            args.push("--link".to_string());
            args.push(link.clone());
        }
        for source in &self.volumes_from {
            args.push("--volumes-from".to_string());
            args.push(source.clone());
        }
        args.push(self.service.image.to_string());
        args.extend(self.service.command.iter().cloned());
        args
    }

    /// Run arguments plus the fingerprint label, as handed to `run`/`create`.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.run_args.len() + 2);
        args.push("--label".to_string());
        args.push(format!("{}={}", labels::FINGERPRINT, self.fingerprint));
        args.extend(self.run_args.iter().cloned());
        args
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn service(&self) -> &Arc<ServiceDefinition> {
        &self.service
    }

    pub fn service_type(&self) -> &ServiceName {
        &self.service.name
    }

    pub fn service_name(&self) -> String {
        self.project.service_name(&self.service.name)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Name this instance is launched under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the live container to act on: the observed name when one
    /// exists, otherwise the declared name.
    pub fn target_name(&self) -> &str {
        self.observed
            .as_ref()
            .map(|observed| observed.name.as_str())
            .unwrap_or(&self.name)
    }

    pub fn image(&self) -> &ImageRef {
        &self.service.image
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn run_args(&self) -> &[String] {
        &self.run_args
    }

    pub fn fingerprint(&self) -> &RunFingerprint {
        &self.fingerprint
    }

    pub fn observed(&self) -> Option<&ObservedState> {
        self.observed.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.observed.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.observed.as_ref().is_some_and(|o| o.running)
    }

    /// Startup order key: placement, then instance number.
    pub fn sort_key(&self) -> (usize, u32) {
        (self.service.placement, self.number)
    }
}
